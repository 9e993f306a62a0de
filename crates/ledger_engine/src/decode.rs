use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::{FailureKind, FetchError};

/// Decode a response body to UTF-8: BOM, then Content-Type charset, then
/// chardetng detection.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<String, FetchError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<String, FetchError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(FetchError::new(
            FailureKind::Extraction,
            format!("body is not valid {}", enc.name()),
        ));
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::decode_page;

    #[test]
    fn honours_charset_parameter() {
        let latin1 = [b'B', 0xe4, b'r'];
        let text = decode_page(&latin1, Some("text/html; Charset=\"ISO-8859-1\"")).unwrap();
        assert_eq!(text, "Bär");
    }

    #[test]
    fn bom_wins_over_header() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice("Bär".as_bytes());
        let text = decode_page(&bytes, Some("text/html; charset=iso-8859-1")).unwrap();
        assert_eq!(text, "Bär");
    }
}
