//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → rewrite middleware (may swap the request URI)
//!     → admin routes, or forward_handler → upstream application
//!     → response (loop guard cookies added on the way out)
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
