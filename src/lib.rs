pub mod cli;
pub mod error;
pub mod extract;
pub mod models;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

pub use cli::{Cli, Commands};
pub use models::Config;
pub use services::RetrievalService;
