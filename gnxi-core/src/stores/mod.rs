//! Store adapters behind the [`crate::ports`] traits.

pub mod fs_file_store;
pub mod json_config_store;

pub use fs_file_store::FsFileStore;
pub use json_config_store::JsonConfigStore;
