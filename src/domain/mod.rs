mod fingerprint;
mod record;

pub use fingerprint::{fingerprint_of, is_canonical, FingerprintError};
pub use record::{
    initial_status, ChainClaim, ClaimError, DecideAction, FileMeta, InitialDecision, Record,
    RecordStatus,
};
