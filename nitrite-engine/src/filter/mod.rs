//! Query filters.
//!
//! A [`Filter`] is evaluated either document by document during a collection
//! scan, or against the ordered structure of an index. The two paths agree
//! on every comparison filter, which lets the planner pick whichever is
//! cheaper without changing results.

mod evaluation;
#[allow(clippy::module_inception)]
mod filter;
mod fluent;
mod index_scan;

pub use evaluation::*;
pub use filter::*;
pub use fluent::*;
