pub mod assembly;
pub mod file;
pub mod task;

pub use assembly::AssembleArgs;
pub use file::{credential_query_params, FileRecord, MetaMap, NewFileRecord};
pub use task::TaskState;
