pub mod error;
pub mod proto;
pub mod transfer;

pub use error::{Error, Result};
pub use proto::{TransferVerificationRequest, TransferVerificationResponse};
pub use transfer::{PaymentTerms, TransferDetails, VerificationInput};
