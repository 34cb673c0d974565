//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! mapping cache, rewrite engine, upstream forwarding produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
