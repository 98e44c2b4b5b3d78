// ABOUTME: Transport implementations for gordy
// ABOUTME: Matrix is the only transport; it implements gordy_core's MessageGateway

pub mod matrix;

pub use matrix::{register_event_handlers, MatrixGateway};
