use crate::collection::{FindPlan, NitriteId};
use crate::common::FieldValues;
use crate::errors::NitriteResult;
use crate::index::IndexDescriptor;

/// Reads a document's current index values, or `None` once it is gone.
pub type CurrentValues<'a> = dyn Fn() -> NitriteResult<Option<FieldValues>> + 'a;

/// One physical index over a collection.
///
/// Implementations serialize their own mutations; callers may write to the
/// same index from several threads.
pub trait NitriteIndexProvider: Send + Sync {
    fn index_descriptor(&self) -> &IndexDescriptor;

    /// Adds the document's entries. Fails without changing the index when
    /// a unique key is already held by another document.
    fn write(&self, field_values: &FieldValues) -> NitriteResult<()>;

    /// Reads the values with `read_values` and writes them while holding the
    /// index lock. Builds use this so a concurrent update of the same
    /// document cannot slip between the read and the write.
    fn write_current(&self, read_values: &CurrentValues<'_>) -> NitriteResult<()>;

    /// Replaces the entries of `old` with those of `new`. New entries are
    /// written before old ones are removed, so a failed write leaves the old
    /// entries in place.
    fn update(&self, old: &FieldValues, new: &FieldValues) -> NitriteResult<()>;

    fn remove(&self, field_values: &FieldValues) -> NitriteResult<()>;

    /// Removes every entry, keeping the backing map.
    fn clear(&self) -> NitriteResult<()>;

    fn drop_index(&self) -> NitriteResult<()>;

    /// Ids matched by the plan's index scan filters, in index order.
    fn find_nitrite_ids(&self, find_plan: &FindPlan) -> NitriteResult<Vec<NitriteId>>;
}
