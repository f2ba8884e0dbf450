pub mod backlog;
pub mod client;
pub mod config;
pub mod dead_letter;
pub mod device;
pub mod errors;
pub mod generator;
pub mod model;
pub mod prompt;
pub mod scheduler;
