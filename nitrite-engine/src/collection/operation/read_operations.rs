use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::find_optimizer::{collection_scan_plan, find_text_index, FindOptimizer};
use super::IndexOperations;
use crate::collection::{Document, FindOptions, FindPlan, NitriteId};
use crate::common::filtered_stream::{DocumentStream, FilteredStream};
use crate::common::indexed_stream::IndexedStream;
use crate::common::map_values::MapValues;
use crate::common::sorted_stream::SortedStream;
use crate::common::{run_bounded, DocumentCursor, Value};
use crate::errors::{ErrorKind, NitriteError, NitriteResult};
use crate::filter::{Filter, TextMatcher};
use crate::index::{IndexDescriptor, IndexKind};
use crate::nitrite_config::NitriteConfig;
use crate::store::NitriteMap;

/// Executes queries against one collection.
#[derive(Clone)]
pub(crate) struct ReadOperations {
    inner: Arc<ReadOperationsInner>,
}

struct ReadOperationsInner {
    collection_name: String,
    nitrite_config: NitriteConfig,
    nitrite_map: NitriteMap,
    find_optimizer: FindOptimizer,
    index_operations: IndexOperations,
}

impl ReadOperations {
    pub(crate) fn new(
        collection_name: &str,
        nitrite_config: NitriteConfig,
        nitrite_map: NitriteMap,
        index_operations: IndexOperations,
    ) -> Self {
        let find_optimizer = FindOptimizer::new(nitrite_config.plan_cache_capacity());
        ReadOperations {
            inner: Arc::new(ReadOperationsInner {
                collection_name: collection_name.to_string(),
                nitrite_config,
                nitrite_map,
                find_optimizer,
                index_operations,
            }),
        }
    }

    pub(crate) fn find(&self, filter: &Filter, find_options: &FindOptions) -> NitriteResult<DocumentCursor> {
        self.inner.find(filter, find_options)
    }

    /// Every matching document, read eagerly.
    pub(crate) fn find_documents(&self, filter: &Filter) -> NitriteResult<Vec<Document>> {
        self.inner
            .find(filter, &FindOptions::new())?
            .collect::<NitriteResult<Vec<_>>>()
    }

    pub(crate) fn get_by_id(&self, nitrite_id: &NitriteId) -> NitriteResult<Option<Document>> {
        self.inner.get_by_id(nitrite_id)
    }
}

impl ReadOperationsInner {
    fn find(&self, filter: &Filter, find_options: &FindOptions) -> NitriteResult<DocumentCursor> {
        // version first: a plan cached under it can only be older than the catalog
        let catalog_version = self.index_operations.index_manager().version();
        let index_descriptors = self.index_operations.list_indexes()?;
        let find_plan = self.find_optimizer.create_find_plan(
            filter,
            find_options,
            &index_descriptors,
            catalog_version,
        )?;
        let find_plan = self.ensure_clean_indexes(find_plan, filter, &index_descriptors)?;
        log::debug!("Executing {} on {}", find_plan, self.collection_name);

        let texts: Arc<dyn TextMatcher> = Arc::new(IndexedTextMatcher::new(
            self.nitrite_config.clone(),
            index_descriptors,
        ));
        let mut stream = self.plan_stream(&find_plan, &texts)?;

        if find_plan.needs_blocking_sort() {
            let mut sort_order = find_plan.index_sort_prefix().to_vec();
            sort_order.extend_from_slice(find_plan.blocking_sort_order());
            let collator = self.collator(&find_plan)?;
            stream = Box::new(SortedStream::new(
                stream,
                &sort_order,
                find_plan.null_order(),
                collator,
            ));
        }

        if find_plan.skip().is_some() || find_plan.limit().is_some() {
            let skip = find_plan.skip().unwrap_or(0) as usize;
            let limit = find_plan.limit().map_or(usize::MAX, |limit| limit as usize);
            stream = Box::new(stream.skip(skip).take(limit));
        }

        Ok(DocumentCursor::new(stream, find_plan))
    }

    fn get_by_id(&self, nitrite_id: &NitriteId) -> NitriteResult<Option<Document>> {
        match self.nitrite_map.get(&Value::NitriteId(*nitrite_id))? {
            Some(Value::Document(document)) => Ok(Some(document)),
            Some(other) => {
                log::error!("Expected a document for {}, found {}", nitrite_id, other);
                Err(NitriteError::new(
                    &format!("Invalid value stored for id {}", nitrite_id),
                    ErrorKind::InternalError,
                ))
            }
            None => Ok(None),
        }
    }

    /// Text indexes must be clean before a text filter can be answered.
    /// A dirty ordered index is rebuilt inline; when that is not possible
    /// the query runs as a collection scan instead.
    fn ensure_clean_indexes(
        &self,
        find_plan: FindPlan,
        filter: &Filter,
        index_descriptors: &[IndexDescriptor],
    ) -> NitriteResult<FindPlan> {
        for (field, _) in filter.text_filters() {
            if let Some(descriptor) = find_text_index(field, index_descriptors) {
                self.index_operations.await_clean_index(descriptor)?;
            }
        }

        let mut scanned = Vec::new();
        collect_comparable_indexes(&find_plan, &mut scanned);
        for descriptor in scanned {
            match self.index_operations.rebuild_if_dirty(&descriptor) {
                Ok(true) => {}
                Ok(false) => {
                    log::warn!("Index {} is being rebuilt, scanning the collection", descriptor);
                    return Ok(collection_scan_plan(&find_plan, filter));
                }
                Err(e) => {
                    log::warn!("Rebuild of dirty index {} failed, scanning the collection: {}", descriptor, e);
                    return Ok(collection_scan_plan(&find_plan, filter));
                }
            }
        }
        Ok(find_plan)
    }

    fn plan_stream(&self, find_plan: &FindPlan, texts: &Arc<dyn TextMatcher>) -> NitriteResult<DocumentStream> {
        if !find_plan.sub_plans().is_empty() {
            return self.union_stream(find_plan.sub_plans(), texts);
        }

        let mut stream: DocumentStream = if let Some(nitrite_id) = find_plan.by_id() {
            Box::new(self.get_by_id(&nitrite_id)?.into_iter().map(Ok))
        } else if let Some(descriptor) = find_plan.index_descriptor() {
            let indexer = self.nitrite_config.find_indexer(descriptor.index_kind())?;
            let nitrite_ids = indexer.find_by_filter(find_plan, &self.nitrite_config)?;
            Box::new(IndexedStream::new(self.nitrite_map.clone(), nitrite_ids))
        } else {
            Box::new(MapValues::new(&self.nitrite_map)?)
        };

        if let Some(filter) = find_plan.collection_scan_filter() {
            stream = Box::new(FilteredStream::new(stream, filter.clone(), texts.clone()));
        }
        Ok(stream)
    }

    /// Runs each operand plan on the worker pool and merges the results,
    /// keeping the first occurrence of every document.
    fn union_stream(&self, sub_plans: &[FindPlan], texts: &Arc<dyn TextMatcher>) -> NitriteResult<DocumentStream> {
        let width = self.nitrite_config.worker_width();
        let results = run_bounded(sub_plans.iter().collect(), width, |sub_plan: &FindPlan| {
            self.plan_stream(sub_plan, texts)?
                .collect::<NitriteResult<Vec<Document>>>()
        });

        let mut merged = IndexMap::new();
        for result in results {
            for document in result? {
                if let Some(nitrite_id) = document.existing_id() {
                    merged.entry(nitrite_id).or_insert(document);
                }
            }
        }
        Ok(Box::new(merged.into_values().map(Ok)))
    }

    fn collator(&self, find_plan: &FindPlan) -> NitriteResult<Option<CollatorBorrowed<'static>>> {
        if find_plan.collator_options().is_none() && find_plan.collator_preferences().is_none() {
            return Ok(None);
        }

        let preferences = find_plan.collator_preferences().unwrap_or(CollatorPreferences::default());
        let options = find_plan.collator_options().unwrap_or(CollatorOptions::default());
        match Collator::try_new(preferences, options) {
            Ok(collator) => Ok(Some(collator)),
            Err(e) => {
                log::error!("Failed to create collator: {}", e);
                Err(NitriteError::new(
                    &format!("Failed to create collator: {}", e),
                    ErrorKind::ValidationError,
                ))
            }
        }
    }
}

fn collect_comparable_indexes(find_plan: &FindPlan, descriptors: &mut Vec<IndexDescriptor>) {
    if let Some(descriptor) = find_plan.index_descriptor() {
        if descriptor.index_kind() != IndexKind::FullText && !descriptors.contains(descriptor) {
            descriptors.push(descriptor.clone());
        }
    }
    for sub_plan in find_plan.sub_plans() {
        collect_comparable_indexes(sub_plan, descriptors);
    }
}

/// Answers residual text filters from the collection's full-text indexes.
/// Each distinct query is searched once per find.
struct IndexedTextMatcher {
    nitrite_config: NitriteConfig,
    index_descriptors: Vec<IndexDescriptor>,
    results: Mutex<HashMap<(String, String), Arc<HashSet<NitriteId>>>>,
}

impl IndexedTextMatcher {
    fn new(nitrite_config: NitriteConfig, index_descriptors: Vec<IndexDescriptor>) -> Self {
        IndexedTextMatcher {
            nitrite_config,
            index_descriptors,
            results: Mutex::new(HashMap::new()),
        }
    }

    fn search(&self, field: &str, query: &str) -> NitriteResult<Arc<HashSet<NitriteId>>> {
        let key = (field.to_string(), query.to_string());
        if let Some(ids) = self.results.lock().get(&key) {
            return Ok(ids.clone());
        }

        let Some(descriptor) = find_text_index(field, &self.index_descriptors) else {
            return Err(crate::filter::not_text_indexed(field));
        };
        let find_plan = FindPlan {
            index_descriptor: Some(descriptor.clone()),
            index_scan_filters: vec![Filter::Text {
                field: field.to_string(),
                query: query.to_string(),
            }],
            ..FindPlan::default()
        };
        let indexer = self.nitrite_config.find_indexer(IndexKind::FullText)?;
        let ids: Arc<HashSet<NitriteId>> =
            Arc::new(indexer.find_by_filter(&find_plan, &self.nitrite_config)?.into_iter().collect());
        self.results.lock().insert(key, ids.clone());
        Ok(ids)
    }
}

impl TextMatcher for IndexedTextMatcher {
    fn text_matches(&self, field: &str, query: &str, id: &NitriteId) -> NitriteResult<bool> {
        Ok(self.search(field, query)?.contains(id))
    }
}
