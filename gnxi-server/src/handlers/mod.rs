pub mod files;
pub mod health;
pub mod prompts;
pub mod run;
pub mod targets;
pub mod tests;
