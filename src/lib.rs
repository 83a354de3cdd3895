pub mod analytics;
pub mod cache;
pub mod clicks;
pub mod config;
pub mod models;
pub mod ratelimit;
pub mod redirect;
pub mod resolver;
pub mod ring;
pub mod storage;
