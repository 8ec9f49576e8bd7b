// Library exports for Quorum
// This allows integration tests and the binary to share one module tree

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
