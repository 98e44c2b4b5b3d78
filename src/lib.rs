// ABOUTME: Root library module exposing the Matrix transport and built-in commands
// ABOUTME: Re-exports the transport-agnostic pieces of gordy-core for the binary and tests

// Matrix-specific modules
pub mod commands;
pub mod matrix_client;
pub mod platform;

// Re-export platform-agnostic modules from gordy-core
pub use gordy_core::config;
pub use gordy_core::metrics;
pub use gordy_core::paths;
pub use gordy_core::utils;

pub use gordy_core::{Bot, CommandRegistry, EventAdapter, Outbound};
