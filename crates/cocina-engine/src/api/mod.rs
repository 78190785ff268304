pub mod app;
pub mod config;
pub mod loader;
pub mod types;
