pub mod files;
pub mod objects;
pub mod uploads;
