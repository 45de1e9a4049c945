mod decide;
mod submit;
mod types;
mod verify;

pub use decide::{DecideError, DecideUseCase};
pub use submit::{FilePayload, RecordSubmission, SubmitError, SubmitUseCase};
pub use types::{
    DecideRequest, DecideResponse, ErrorBody, FileUpload, RecordList, SubmitRequest,
    SubmitResponse,
};
pub use verify::{OnChainCheck, VerificationReport, VerifyError, VerifyUseCase};
