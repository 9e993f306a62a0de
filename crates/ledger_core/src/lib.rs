//! Ledger core: canonical records, chain normalizers, the dedup/quota/date
//! engine and the pure pagination state machine.
mod address;
mod clean;
mod dates;
mod dedup;
mod effect;
mod error;
mod msg;
mod normalize;
mod record;
mod request;
mod state;
mod update;

pub use address::{classify, AddressType};
pub use clean::{is_clean_numeric, normalize_date, strip_non_numeric};
pub use dates::{parse_instant, resolve_bound, DateRange};
pub use dedup::{composite_identity, DedupEngine, Quota, StateSnapshot, DEFAULT_QUOTA};
pub use effect::{DoneReason, Effect};
pub use error::{ConfigError, DataShapeError};
pub use msg::Msg;
pub use normalize::{
    collapse_self, empty_history, normalize, normalize_bitcoin, normalize_ethereum,
};
pub use record::{
    AddressInfo, BaseSnapshot, BitcoinTransaction, CanonicalOutput, EthereumTransaction,
    RawTransaction, WeightedParty,
};
pub use request::{CrawlCursor, CrawlRequest, ExplorerUrls, PageSignal, BLOCKCHAIN_COM, ETHERSCAN};
pub use state::{AddressPhase, CrawlBook};
pub use update::update;
