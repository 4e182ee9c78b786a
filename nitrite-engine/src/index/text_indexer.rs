use dashmap::DashMap;
use std::sync::Arc;

use super::{
    CurrentValues, IndexDescriptor, IndexKind, NitriteIndexProvider, NitriteIndexerProvider,
    TextIndex,
};
use crate::collection::{FindPlan, NitriteId};
use crate::common::{derive_index_map_name, FieldValues, Fields};
use crate::errors::{ErrorKind, IndexingErrorKind, NitriteError, NitriteResult};
use crate::nitrite_config::NitriteConfig;

/// Serves full-text indexes using the tokenizer from the configuration.
#[derive(Clone, Default)]
pub(crate) struct TextIndexer {
    index_registry: Arc<DashMap<IndexDescriptor, TextIndex>>,
}

impl TextIndexer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn find_text_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<TextIndex> {
        if let Some(index) = self.index_registry.get(index_descriptor) {
            return Ok(index.value().clone());
        }

        let map_name = derive_index_map_name(index_descriptor);
        let index_map = nitrite_config.nitrite_store()?.open_map(&map_name)?;
        let lock = nitrite_config.lock_registry().get_lock(&map_name);
        let tokenizer = nitrite_config.tokenizer();
        let index = self
            .index_registry
            .entry(index_descriptor.clone())
            .or_insert_with(|| TextIndex::new(index_descriptor.clone(), index_map, tokenizer, lock))
            .value()
            .clone();
        Ok(index)
    }
}

impl NitriteIndexerProvider for TextIndexer {
    fn index_kind(&self) -> IndexKind {
        IndexKind::FullText
    }

    fn is_unique(&self) -> bool {
        false
    }

    fn validate_index(&self, fields: &Fields) -> NitriteResult<()> {
        if fields.len() > 1 {
            log::error!("Full-text index requested on compound fields {}", fields);
            return Err(NitriteError::new(
                "Full-text index can only be created on a single field",
                ErrorKind::ValidationError,
            ));
        }
        Ok(())
    }

    fn drop_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        let index = self.find_text_index(index_descriptor, nitrite_config)?;
        index.drop_index()?;
        self.index_registry.remove(index_descriptor);

        let map_name = derive_index_map_name(index_descriptor);
        nitrite_config.nitrite_store()?.remove_map(&map_name)?;
        nitrite_config.lock_registry().remove_lock(&map_name);
        Ok(())
    }

    fn clear_index(
        &self,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_text_index(index_descriptor, nitrite_config)?.clear()
    }

    fn write_index_entry(
        &self,
        field_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_text_index(index_descriptor, nitrite_config)?
            .write(field_values)
    }

    fn write_current_entry(
        &self,
        read_values: &CurrentValues<'_>,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_text_index(index_descriptor, nitrite_config)?
            .write_current(read_values)
    }

    fn update_index_entry(
        &self,
        old_values: &FieldValues,
        new_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_text_index(index_descriptor, nitrite_config)?
            .update(old_values, new_values)
    }

    fn remove_index_entry(
        &self,
        field_values: &FieldValues,
        index_descriptor: &IndexDescriptor,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<()> {
        self.find_text_index(index_descriptor, nitrite_config)?
            .remove(field_values)
    }

    fn find_by_filter(
        &self,
        find_plan: &FindPlan,
        nitrite_config: &NitriteConfig,
    ) -> NitriteResult<Vec<NitriteId>> {
        match find_plan.index_descriptor() {
            Some(index_descriptor) => self
                .find_text_index(index_descriptor, nitrite_config)?
                .find_nitrite_ids(find_plan),
            None => {
                log::error!("Find plan {} has no index descriptor", find_plan);
                Err(NitriteError::new(
                    "Find plan has no index to scan",
                    ErrorKind::IndexingError(IndexingErrorKind::NotIndexed),
                ))
            }
        }
    }
}
