pub mod data_uri;
pub mod otp_sweeper;
pub mod public_id;
pub mod upload;

pub use crate::domain::model::{
    DeleteOutcome, FilePart, OtpRecord, ProfileRecord, StoredAsset, UploadForm, UploadRequest,
};
pub use crate::domain::ports::{MediaHost, OtpRepository, ProfileRepository};
pub use crate::utils::error::Result;
