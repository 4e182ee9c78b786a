use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::collection::{FindOptions, FindPlan};
use crate::common::SortOrder;
use crate::errors::NitriteResult;
use crate::filter::{not_text_indexed, Filter};
use crate::index::{IndexDescriptor, IndexKind};

/// Turns a filter and find options into a [`FindPlan`].
///
/// AND groups elect at most one index: a by-id lookup wins outright, then a
/// full-text index for a text filter, then the ordered index covering the
/// most leading fields. An OR is answered as a union of its operands' plans
/// only when every operand can use an index; otherwise the whole OR runs as
/// a collection scan.
///
/// Plans are cached by filter, sort options and catalog version, so a plan
/// never outlives the index set it was made for.
#[derive(Clone)]
pub(crate) struct FindOptimizer {
    inner: Arc<FindOptimizerInner>,
}

struct FindOptimizerInner {
    plan_cache: Mutex<LruCache<String, FindPlan>>,
}

impl FindOptimizer {
    pub(crate) fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        FindOptimizer {
            inner: Arc::new(FindOptimizerInner {
                plan_cache: Mutex::new(LruCache::new(capacity)),
            }),
        }
    }

    pub(crate) fn create_find_plan(
        &self,
        filter: &Filter,
        find_options: &FindOptions,
        index_descriptors: &[IndexDescriptor],
        catalog_version: u64,
    ) -> NitriteResult<FindPlan> {
        filter.validate()?;
        check_text_indexes(filter, index_descriptors)?;

        let cache_key = format!(
            "{}|{:?}|{:?}|{}|{}",
            filter,
            find_options.sort_order(),
            find_options.null_order,
            find_options.has_collator(),
            catalog_version
        );

        let cached = self.inner.plan_cache.lock().get(&cache_key).cloned();
        let mut find_plan = match cached {
            Some(plan) => plan,
            None => {
                let mut plan = plan_filter(filter, index_descriptors);
                plan_sort(&mut plan, find_options);
                log::debug!("Planned {} as {}", filter, plan);
                self.inner.plan_cache.lock().put(cache_key, plan.clone());
                plan
            }
        };

        find_plan.skip = find_options.skip;
        find_plan.limit = find_options.limit;
        find_plan.null_order = find_options.null_order;
        find_plan.collator_options = find_options.collator_options;
        find_plan.collator_preferences = find_options.collator_preferences;
        Ok(find_plan)
    }

    #[cfg(test)]
    fn cached_plans(&self) -> usize {
        self.inner.plan_cache.lock().len()
    }
}

/// The same query as `find_plan`, answered by a full collection scan.
pub(crate) fn collection_scan_plan(find_plan: &FindPlan, filter: &Filter) -> FindPlan {
    let mut sort_order = find_plan.index_sort_prefix.clone();
    sort_order.extend(find_plan.blocking_sort_order.iter().cloned());

    FindPlan {
        collection_scan_filter: residual(vec![filter.clone()]),
        blocking_sort_order: sort_order,
        skip: find_plan.skip,
        limit: find_plan.limit,
        collator_options: find_plan.collator_options,
        collator_preferences: find_plan.collator_preferences,
        null_order: find_plan.null_order,
        ..FindPlan::default()
    }
}

fn check_text_indexes(filter: &Filter, index_descriptors: &[IndexDescriptor]) -> NitriteResult<()> {
    for (field, _) in filter.text_filters() {
        if find_text_index(field, index_descriptors).is_none() {
            return Err(not_text_indexed(field));
        }
    }
    Ok(())
}

pub(crate) fn find_text_index<'a>(
    field: &str,
    index_descriptors: &'a [IndexDescriptor],
) -> Option<&'a IndexDescriptor> {
    index_descriptors.iter().find(|descriptor| {
        descriptor.index_kind() == IndexKind::FullText && descriptor.index_fields().first() == field
    })
}

fn plan_filter(filter: &Filter, index_descriptors: &[IndexDescriptor]) -> FindPlan {
    match filter {
        Filter::Or(_) => plan_or(filter.flatten_or(), index_descriptors),
        _ => plan_and(filter.flatten_and(), index_descriptors),
    }
}

fn plan_and(filters: Vec<Filter>, index_descriptors: &[IndexDescriptor]) -> FindPlan {
    let filters: Vec<Filter> = filters
        .into_iter()
        .filter(|filter| !matches!(filter, Filter::All))
        .collect();
    let mut find_plan = FindPlan::default();

    if let Some(position) = filters.iter().position(|filter| filter.id_lookup().is_some()) {
        find_plan.by_id = filters[position].id_lookup();
        find_plan.collection_scan_filter = residual(without(&filters, &[position]));
        return find_plan;
    }

    for (position, filter) in filters.iter().enumerate() {
        if let Filter::Text { field, .. } = filter {
            if let Some(descriptor) = find_text_index(field, index_descriptors) {
                find_plan.index_descriptor = Some(descriptor.clone());
                find_plan.index_scan_filters = vec![filter.clone()];
                find_plan.collection_scan_filter = residual(without(&filters, &[position]));
                return find_plan;
            }
        }
    }

    let mut best: Option<(&IndexDescriptor, Vec<usize>)> = None;
    for descriptor in index_descriptors
        .iter()
        .filter(|descriptor| descriptor.index_kind().is_comparable())
    {
        let matched = prefix_match(descriptor, &filters);
        let covers_more = match &best {
            Some((_, best_matched)) => matched.len() > best_matched.len(),
            None => !matched.is_empty(),
        };
        if covers_more {
            best = Some((descriptor, matched));
        }
    }

    match best {
        Some((descriptor, matched)) => {
            find_plan.index_descriptor = Some(descriptor.clone());
            find_plan.index_scan_filters = matched.iter().map(|i| filters[*i].clone()).collect();
            find_plan.collection_scan_filter = residual(without(&filters, &matched));
        }
        None => find_plan.collection_scan_filter = residual(filters),
    }
    find_plan
}

/// Positions of the filters answering the descriptor's leading fields, one
/// per field, stopping at the first field without one.
fn prefix_match(descriptor: &IndexDescriptor, filters: &[Filter]) -> Vec<usize> {
    let mut matched = Vec::new();
    for field_name in descriptor.index_fields().field_names() {
        let position = filters.iter().position(|filter| {
            filter.is_index_eligible() && filter.field_name() == Some(field_name.as_str())
        });
        match position {
            Some(position) => matched.push(position),
            None => break,
        }
    }
    matched
}

fn plan_or(operands: Vec<Filter>, index_descriptors: &[IndexDescriptor]) -> FindPlan {
    let sub_plans: Vec<FindPlan> = operands
        .iter()
        .map(|operand| plan_filter(operand, index_descriptors))
        .collect();

    if sub_plans.iter().all(FindPlan::uses_index) {
        FindPlan {
            sub_plans,
            ..FindPlan::default()
        }
    } else {
        FindPlan {
            collection_scan_filter: Some(Filter::Or(operands)),
            ..FindPlan::default()
        }
    }
}

fn plan_sort(find_plan: &mut FindPlan, find_options: &FindOptions) {
    let sort_order = find_options.sort_order();
    if sort_order.is_empty() {
        return;
    }

    // index keys are ordered by code point with nulls first
    let pushdown = find_plan.sub_plans.is_empty()
        && find_options.null_order == crate::common::NullOrder::First
        && !find_options.has_collator();

    let index_fields = match &find_plan.index_descriptor {
        Some(descriptor) if pushdown && descriptor.index_kind().is_comparable() => {
            descriptor.index_fields().field_names()
        }
        _ => {
            find_plan.blocking_sort_order = sort_order.to_vec();
            return;
        }
    };

    let prefix_len = sort_order
        .iter()
        .zip(index_fields)
        .take_while(|((sort_field, _), index_field)| sort_field == *index_field)
        .count();

    // ties on a partial prefix would come back in the order of the unsorted
    // index fields, not in id order
    if prefix_len < index_fields.len() {
        find_plan.blocking_sort_order = sort_order.to_vec();
        return;
    }

    for (field, order) in &sort_order[..prefix_len] {
        find_plan
            .index_scan_order
            .insert(field.clone(), order.is_reverse());
    }
    find_plan.index_sort_prefix = sort_order[..prefix_len].to_vec();
    find_plan.blocking_sort_order = sort_order[prefix_len..].to_vec();
}

fn without(filters: &[Filter], positions: &[usize]) -> Vec<Filter> {
    filters
        .iter()
        .enumerate()
        .filter(|(i, _)| !positions.contains(i))
        .map(|(_, filter)| filter.clone())
        .collect()
}

fn residual(mut filters: Vec<Filter>) -> Option<Filter> {
    filters.retain(|filter| !matches!(filter, Filter::All));
    match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(Filter::And(filters)),
    }
}
