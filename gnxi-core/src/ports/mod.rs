pub mod config_store;
pub mod file_store;
pub mod test_engine;
