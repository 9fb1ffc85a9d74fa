pub mod analysis;
pub mod config;
pub mod core;
pub mod db;
pub mod fetcher;
pub mod models;
pub mod report;
