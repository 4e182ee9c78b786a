//! Ordered key/value storage consumed by the engine.
//!
//! Collections keep their documents in one map keyed by [`NitriteId`], and
//! every index keeps its entries in a map of its own. Only the in-memory
//! backend ships with the crate; other backends plug in through
//! [`NitriteStoreProvider`].
//!
//! [`NitriteId`]: crate::collection::NitriteId

mod iters;
pub mod memory;
mod nitrite_map;
mod nitrite_store;

pub use iters::*;
pub use nitrite_map::*;
pub use nitrite_store::*;
