//! Transient resolution results for depot.
//!
//! During resolution the dependency graph is appended to a compact binary log
//! instead of being kept in memory. The log is replayed into a
//! [`TransientConfigurationResults`] graph the first time somebody asks for it,
//! and the replayed graph is shared from then on.

pub mod codec;
pub mod error;
pub mod results;
pub mod store;

pub use error::{Error, Result};
pub use results::{ResultEdge, ResultNode, TransientConfigurationResults};
pub use store::{LogStorage, TransientConfigurationResultsBuilder, decode};
