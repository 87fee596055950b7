//! HTTP handlers around the file validator

pub mod files;
pub mod health;
pub mod routes;
