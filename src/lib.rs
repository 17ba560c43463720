pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod images;
pub mod meals;
pub mod provider;
pub mod state;
pub mod storage;
