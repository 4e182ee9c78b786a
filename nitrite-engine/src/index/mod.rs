//! Secondary indexes.
//!
//! Three kinds exist. Unique and non-unique indexes are ordered maps from
//! field values to document ids and can be built over several fields at
//! once. Full-text indexes map the terms of a single string field to the
//! ids of documents containing them.
//!
//! ```rust,ignore
//! use nitrite_engine::index::{non_unique_index, full_text_index};
//!
//! collection.create_index(vec!["last_name", "age"], &non_unique_index())?;
//! collection.create_index(vec!["bio"], &full_text_index())?;
//! ```

mod comparable_index;
mod comparable_indexer;
mod descriptor;
mod index_map;
mod index_meta;
mod index_scanner;
mod nitrite_index;
mod nitrite_indexer;
pub mod text;
mod text_index;
mod text_indexer;

pub(crate) use comparable_index::*;
pub(crate) use comparable_indexer::*;
pub use descriptor::*;
pub use index_map::*;
pub use index_meta::*;
pub(crate) use index_scanner::*;
pub use nitrite_index::*;
pub use nitrite_indexer::*;
pub(crate) use text_index::*;
pub(crate) use text_indexer::*;
