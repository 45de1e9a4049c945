pub mod application;
pub mod domain;
pub mod handlers;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{DecideUseCase, SubmitUseCase, VerificationReport, VerifyUseCase};
pub use domain::{fingerprint_of, Record, RecordStatus};
pub use infrastructure::database::{RecordStore, SqliteStore};
