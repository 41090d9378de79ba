pub mod cli;
pub mod config;
pub mod currency;
pub mod inflight;
pub mod manager;
pub mod render;
pub mod storage;
pub mod weather;

pub use config::ClientConfig;
pub use manager::CountryManager;
