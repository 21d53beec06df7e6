pub mod center;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod postgres;
pub mod roster;
pub mod session;
pub mod share;
pub mod store;
pub mod types;
pub mod utils;
pub mod web;
