use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static BITCOIN_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(bc1|[13])[a-zA-HJ-NP-Z0-9]{25,39}$").expect("bitcoin address pattern")
});

static ETHEREUM_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("ethereum address pattern"));

/// Chain family of an address, derived from its lexical shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    #[serde(rename = "BTC")]
    Bitcoin,
    #[serde(rename = "ETH")]
    Ethereum,
    #[serde(rename = "NONE")]
    Invalid,
}

impl AddressType {
    pub fn label(self) -> &'static str {
        match self {
            AddressType::Bitcoin => "BTC",
            AddressType::Ethereum => "ETH",
            AddressType::Invalid => "NONE",
        }
    }

    pub fn is_valid(self) -> bool {
        self != AddressType::Invalid
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify an address string. Surrounding whitespace is not tolerated.
pub fn classify(address: &str) -> AddressType {
    if ETHEREUM_ADDRESS.is_match(address) {
        return AddressType::Ethereum;
    }
    if BITCOIN_ADDRESS.is_match(address) {
        return AddressType::Bitcoin;
    }
    AddressType::Invalid
}

#[cfg(test)]
mod tests {
    use super::{classify, AddressType};

    #[test]
    fn recognises_each_bitcoin_prefix() {
        assert_eq!(
            classify("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"),
            AddressType::Bitcoin
        );
        assert_eq!(
            classify("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"),
            AddressType::Bitcoin
        );
        assert_eq!(
            classify("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
            AddressType::Bitcoin
        );
    }

    #[test]
    fn bitcoin_charset_excludes_ambiguous_characters() {
        // Uppercase 'O' and 'I' are outside the base58 alphabet.
        assert_eq!(
            classify("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfN0O"),
            AddressType::Invalid
        );
        assert_eq!(classify("1short"), AddressType::Invalid);
    }

    #[test]
    fn ethereum_requires_forty_hex_digits() {
        assert_eq!(
            classify("0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe"),
            AddressType::Ethereum
        );
        assert_eq!(classify("0x1234"), AddressType::Invalid);
        assert_eq!(
            classify("0xzz0B295669a9FD93d5F28D9Ec85E40f4cb697BAe"),
            AddressType::Invalid
        );
    }

    #[test]
    fn labels_match_wire_names() {
        assert_eq!(AddressType::Bitcoin.to_string(), "BTC");
        assert_eq!(AddressType::Ethereum.to_string(), "ETH");
        assert_eq!(
            serde_json::to_string(&AddressType::Invalid).unwrap(),
            "\"NONE\""
        );
    }
}
