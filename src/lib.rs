pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod state;
pub mod verification;
