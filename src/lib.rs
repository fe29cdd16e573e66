pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod service;

pub use crate::config::AppConfig;
pub use db::create_pool;
pub use service::{MatchPolicy, ReconciliationView, SessionStore};
