//! Country rewrite subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → middleware.rs (build RequestContext)
//!     → guard.rs (marker present? → pass through, expire marker)
//!     → engine.rs (entry path? country → MappingCache::resolve → target)
//!     → middleware.rs (swap request URI, set marker on response)
//! ```
//!
//! # Design Decisions
//! - Decisions are values; errors never cross this boundary
//! - Only configured entry paths are ever rewritten

pub mod engine;
pub mod guard;
pub mod middleware;

pub use engine::{RequestContext, RewriteDecision, RewriteDecisionEngine, RewriteTarget};
pub use guard::LoopGuard;
pub use middleware::geo_rewrite_middleware;
