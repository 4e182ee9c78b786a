//! Documents and the collections that store them.
//!
//! A [`Document`] is an ordered map of field names to [`Value`]s. Nested
//! fields are addressed with `.` separated paths and array elements with
//! numeric segments.
//!
//! ```rust,ignore
//! use nitrite_engine::collection::{Document, NitriteCollection};
//! use nitrite_engine::filter::field;
//!
//! let mut document = Document::new();
//! document.put("name", "Alice")?;
//! document.put("address.city", "New York")?;
//!
//! let users = NitriteCollection::open("users", &config)?;
//! users.insert(document)?;
//! let found = users.find(field("address.city").eq("New York"))?;
//! ```
//!
//! # Reserved fields
//!
//! - `_id` - document id, assigned on insert when absent
//! - `_revision` - incremented by every write
//! - `_modified` - time of the last write, in milliseconds since the epoch
//! - `_source` - origin tag of a write, never stored
//!
//! [`Value`]: crate::common::Value

pub(crate) mod collection_factory;
mod document;
mod event;
mod find_options;
mod find_plan;
mod nitrite_collection;
mod nitrite_id;
pub(crate) mod operation;
pub(crate) mod snowflake;
mod update_options;

pub use document::*;
pub use event::*;
pub use find_options::*;
pub use find_plan::*;
pub use nitrite_collection::*;
pub use nitrite_id::NitriteId;
pub use operation::WriteResult;
pub use update_options::*;
