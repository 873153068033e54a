//! Depot API Library
//!
//! HTTP surface of the chunked-upload pipeline: handlers, the upload
//! service, application state, and setup.

pub mod api_doc;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use services::assembly::AssemblyContext;
pub use services::upload::{CompleteUpload, UploadService};
pub use state::AppState;
