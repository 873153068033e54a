//! Depot Worker Library
//!
//! In-process task backend for assembly work: a bounded worker pool over an
//! in-memory task table. Satisfies the capability interface the upload
//! pipeline needs from any asynchronous executor: submit work and get a task
//! id back synchronously, query lifecycle state, read back the original
//! submission arguments, and re-submit under the same task id.

pub mod context;
pub mod queue;

pub use context::TaskHandlerContext;
pub use queue::{TaskQueue, TaskQueueConfig};
