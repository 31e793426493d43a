pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod language;
pub mod metrics;
pub mod notify;
pub mod sync;
pub mod wows;
