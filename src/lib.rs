pub mod config;
pub mod engine;
pub mod storage;
pub mod terminal;
