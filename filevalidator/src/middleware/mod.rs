//! Middleware components for the HTTP server

pub mod logging;

pub use logging::logging_layer;
