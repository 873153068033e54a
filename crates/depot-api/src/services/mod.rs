pub mod assembly;
pub mod upload;
