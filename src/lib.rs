pub mod config;
pub mod constants;
pub mod engine;
pub mod logging;
pub mod quiz;
pub mod services;
pub mod store;
pub mod terminal;
