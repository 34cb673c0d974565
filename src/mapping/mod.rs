//! Country mapping resolution subsystem.
//!
//! # Data Flow
//! ```text
//! content delivery API (GraphQL)
//!     → source.rs (one POST, unwrap JSON envelope)
//!     → codec.rs (parse `DK=%2Fdk-home&...`)
//!     → CountryMapping (immutable snapshot)
//!     → cache.rs (TTL, single-flight, keep last good)
//!     → resolve(country) for the rewrite engine
//! ```

pub mod cache;
pub mod codec;
pub mod source;
pub mod types;

pub use cache::{CacheStatus, MappingCache};
pub use codec::{encode_mapping, parse_mapping};
pub use source::{MappingSource, RemoteMappingSource};
pub use types::{CountryMapping, MappingError, MappingResult, ROOT_PATH};
