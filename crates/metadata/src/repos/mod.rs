//! Repository traits for metadata operations.

pub mod file_info;
pub mod locations;

pub use file_info::FileInfoRepo;
pub use locations::LocationRepo;
