use crate::collection::{FindPlan, NitriteId};
use crate::common::{FieldValues, Fields};
use crate::errors::NitriteResult;
use crate::index::{CurrentValues, IndexDescriptor, IndexKind};
use crate::nitrite_config::NitriteConfig;
use std::ops::Deref;
use std::sync::Arc;

/// Creates and serves the indexes of one [`IndexKind`].
///
/// An indexer keeps one open index per descriptor and resolves the backing
/// map from the store held by the configuration.
#[derive(Clone)]
pub struct NitriteIndexer {
    inner: Arc<dyn NitriteIndexerProvider>,
}

pub trait NitriteIndexerProvider: Send + Sync {
    fn index_kind(&self) -> IndexKind;

    fn is_unique(&self) -> bool;

    /// Rejects field sets this kind of index cannot be built on.
    fn validate_index(&self, fields: &Fields) -> NitriteResult<()>;

    fn drop_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()>;

    /// Removes every entry of the index ahead of a rebuild.
    fn clear_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()>;

    fn write_index_entry(
        &self,
        field_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()>;

    /// Writes the entry for values read while the index lock is held.
    fn write_current_entry(
        &self,
        read_values: &CurrentValues<'_>,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()>;

    fn update_index_entry(
        &self,
        old_values: &FieldValues,
        new_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()>;

    fn remove_index_entry(
        &self,
        field_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()>;

    fn find_by_filter(
        &self,
        find_plan: &FindPlan,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<Vec<NitriteId>>;
}

impl NitriteIndexer {
    pub fn new<T: NitriteIndexerProvider + 'static>(inner: T) -> Self {
        NitriteIndexer { inner: Arc::new(inner) }
    }
}

impl Deref for NitriteIndexer {
    type Target = Arc<dyn NitriteIndexerProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
