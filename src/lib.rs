pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::cloudinary::CloudinaryClient;
pub use api::{router, AppState};
pub use config::ServiceConfig;
pub use core::{otp_sweeper::OtpSweeper, upload::ProfileImageService};
pub use utils::error::{Result, ServiceError};
