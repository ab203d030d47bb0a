pub mod aggregate;
pub mod annual;
pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod duration;
pub mod error;
pub mod oauth;
pub mod paginate;
pub mod pipeline;
pub mod snapshot;
pub mod stats;
