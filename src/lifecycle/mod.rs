//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! SIGINT / SIGTERM
//!     → signals.rs (wait_for_termination)
//!     → shutdown.rs (broadcast to subscribers)
//!     → HttpServer::run drains connections and returns
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
