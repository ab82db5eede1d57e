pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod import;
pub mod models;
pub mod pipeline;
pub mod schedule;
pub mod transcript;
