pub mod app_state;
pub mod errors;
pub mod extract;
pub mod run_control;
pub mod startup;
