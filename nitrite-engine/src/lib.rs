//! # Nitrite Engine
//!
//! Secondary indexing and query execution for an embedded document store.
//!
//! Documents live in a primary ordered map keyed by [`NitriteId`]. Each
//! collection may carry unique, non-unique and full-text indexes, each kept
//! in a map of its own. Queries are planned against the current index
//! catalog: an `_id` lookup, a scan of the index with the longest matching
//! field prefix, a union of index scans for disjunctions, or a full
//! collection scan. Filters the index cannot answer are applied to the
//! fetched documents afterwards.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nitrite_engine::collection::NitriteCollection;
//! use nitrite_engine::doc;
//! use nitrite_engine::filter::field;
//! use nitrite_engine::index::unique_index;
//! use nitrite_engine::nitrite_config::NitriteConfig;
//!
//! let config = NitriteConfig::new();
//! let people = NitriteCollection::open("people", &config)?;
//! people.create_index(vec!["name"], &unique_index())?;
//!
//! people.insert(doc! { name: "a", age: 30 })?;
//! people.insert(doc! { name: "b", age: 25 })?;
//!
//! let adults = people.find(field("age").gte(20).and(field("age").lt(35)))?;
//! for document in adults {
//!     println!("{}", document?);
//! }
//! ```
//!
//! ## Writes and indexes
//!
//! Every write commits the primary record first and then updates each
//! index. When an index rejects the write, for example on a unique key
//! conflict, the index entries already written and the primary record are
//! restored before the error is returned.
//!
//! An index whose build was interrupted is marked dirty and is rebuilt by
//! the next read or write that touches it.
//!
//! ## Module Organization
//!
//! - [`collection`] - documents, collections, find and update options
//! - [`common`] - values, field sets, event bus and shared utilities
//! - [`errors`] - error kinds and result type
//! - [`filter`] - query filters
//! - [`index`] - index kinds, descriptors and indexers
//! - [`nitrite_config`] - engine configuration
//! - [`store`] - ordered map storage
//!
//! [`NitriteId`]: collection::NitriteId

use crate::collection::snowflake::SnowflakeIdGenerator;
use once_cell::sync::Lazy;

pub mod collection;
pub mod common;
pub mod errors;
pub mod filter;
pub mod index;
pub mod nitrite_config;
pub mod store;

pub(crate) static ID_GENERATOR: Lazy<SnowflakeIdGenerator> = Lazy::new(SnowflakeIdGenerator::new);

#[cfg(test)]
#[ctor::ctor]
fn init_logging() {
    colog::init();
}
