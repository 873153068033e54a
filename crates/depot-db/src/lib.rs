//! Depot DB Library
//!
//! Record store for file records: the `FileRepository` capability trait, the
//! Postgres implementation, and an in-memory implementation used for tests
//! and database-less deployments.
//!
//! The `upload_id` uniqueness invariant (at most one record per upload
//! session) is enforced here: by a unique constraint in Postgres and by an
//! explicit check in the in-memory store.

pub mod files;
pub mod memory;
pub mod postgres;

pub use files::FileRepository;
pub use memory::InMemoryFileRepository;
pub use postgres::PgFileRepository;
