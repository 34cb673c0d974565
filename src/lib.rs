//! Country-aware landing page rewriting for a front proxy.
//!
//! Requests for configured entry paths are rewritten to a country specific
//! landing page, looked up in a remotely authored mapping that is cached with
//! single-flight refresh.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mapping;
pub mod observability;
pub mod rewrite;

pub use config::GeoRewriteConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mapping::{MappingCache, RemoteMappingSource};
pub use rewrite::{RewriteDecision, RewriteDecisionEngine};
