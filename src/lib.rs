//! In-memory relationship index for bulk graph loading.
//!
//! Maps a directed, typed edge (source node, target node, relationship type)
//! to the id of the relationship record that represents it, so parallel
//! loader threads can deduplicate and look up edges without going through the
//! storage engine. The index is transient: it is rebuilt per load session and
//! never persisted.
//!
//! ```
//! use relidx::{EdgeIndex, IndexOptions, NodeId, RelId};
//!
//! let index = EdgeIndex::new(IndexOptions::default()).unwrap();
//! index.put(NodeId(10), NodeId(20), "SUBCLASS_OF", RelId(1000)).unwrap();
//! assert_eq!(index.get(NodeId(10), NodeId(20), "SUBCLASS_OF"), Some(RelId(1000)));
//! assert!(!index.contains_key(NodeId(20), NodeId(10), "SUBCLASS_OF"));
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod index;
pub mod registry;
pub mod table;
pub mod types;

pub use codec::{EdgeKey, PackedKey};
pub use index::{
    CounterMetrics, EdgeIndex, FrozenEdgeIndex, IndexMetrics, IndexOptions, IndexStats,
    NoopMetrics,
};
pub use registry::{RegistryMetricsSnapshot, TypeRegistry};
pub use table::EdgeTable;
pub use types::{IndexError, NodeId, RelId, Result, TypeId};
