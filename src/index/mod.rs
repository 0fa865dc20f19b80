// Full-text index port.
// A derived, in-memory projection of the store; it can always be rebuilt from cached items.

mod memory;

pub use memory::MemoryIndex;

use crate::error::Result;
use crate::model::{Item, SearchHit};

/// Keyed full-text index over cached items.
///
/// `upsert` and `delete` are staged; they become visible to queries and `count` after
/// `commit`.
pub trait TextIndex: Send + Sync {
    fn upsert(&self, key: &str, item: &Item) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    fn commit(&self) -> Result<()>;

    /// Term query over the analyzed text fields.
    fn match_query(&self, text: &str, max_hits: usize) -> Result<Vec<SearchHit>>;

    /// Substring query so partial words still find something.
    fn wildcard_query(&self, text: &str, max_hits: usize) -> Result<Vec<SearchHit>>;

    fn count(&self) -> Result<u64>;
}
