use crate::collection::NitriteId;
use crate::common::{NullOrder, SortOrder};
use crate::filter::Filter;
use crate::index::IndexDescriptor;
use icu_collator::options::CollatorOptions;
use icu_collator::CollatorPreferences;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Execution plan for one query.
///
/// A plan reads candidates in one of three ways: a by-id lookup, a scan of
/// one elected index, or a scan of the whole collection. Candidates then
/// pass through the residual collection scan filter. An OR over indexed
/// operands is planned as a union of sub-plans instead.
///
/// Sort keys in `index_sort_prefix` come out of the index in order; the
/// `blocking_sort_order` suffix is sorted in memory within runs of equal
/// prefix values.
#[derive(Clone, Default)]
pub struct FindPlan {
    pub(crate) by_id: Option<NitriteId>,
    pub(crate) index_descriptor: Option<IndexDescriptor>,
    pub(crate) index_scan_filters: Vec<Filter>,
    pub(crate) collection_scan_filter: Option<Filter>,
    pub(crate) index_scan_order: HashMap<String, bool>,
    pub(crate) index_sort_prefix: Vec<(String, SortOrder)>,
    pub(crate) blocking_sort_order: Vec<(String, SortOrder)>,
    pub(crate) sub_plans: Vec<FindPlan>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) collator_options: Option<CollatorOptions>,
    pub(crate) collator_preferences: Option<CollatorPreferences>,
    pub(crate) null_order: NullOrder,
}

impl FindPlan {
    pub fn by_id(&self) -> Option<NitriteId> {
        self.by_id
    }

    pub fn index_descriptor(&self) -> Option<&IndexDescriptor> {
        self.index_descriptor.as_ref()
    }

    /// Filters answered by the elected index, one per leading index field.
    pub fn index_scan_filters(&self) -> &[Filter] {
        &self.index_scan_filters
    }

    pub fn collection_scan_filter(&self) -> Option<&Filter> {
        self.collection_scan_filter.as_ref()
    }

    /// Fields walked in reverse key order.
    pub fn index_scan_order(&self) -> &HashMap<String, bool> {
        &self.index_scan_order
    }

    pub fn index_sort_prefix(&self) -> &[(String, SortOrder)] {
        &self.index_sort_prefix
    }

    pub fn blocking_sort_order(&self) -> &[(String, SortOrder)] {
        &self.blocking_sort_order
    }

    pub fn sub_plans(&self) -> &[FindPlan] {
        &self.sub_plans
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn null_order(&self) -> NullOrder {
        self.null_order
    }

    pub fn collator_options(&self) -> Option<CollatorOptions> {
        self.collator_options
    }

    pub fn collator_preferences(&self) -> Option<CollatorPreferences> {
        self.collator_preferences
    }

    /// Whether candidates come from an index rather than a full scan.
    pub fn uses_index(&self) -> bool {
        self.by_id.is_some()
            || self.index_descriptor.is_some()
            || (!self.sub_plans.is_empty() && self.sub_plans.iter().all(FindPlan::uses_index))
    }

    pub fn needs_blocking_sort(&self) -> bool {
        !self.blocking_sort_order.is_empty()
    }
}

impl Display for FindPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.sub_plans.is_empty() {
            write!(f, "union[")?;
            for (i, plan) in self.sub_plans.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", plan)?;
            }
            write!(f, "]")?;
        } else if let Some(id) = &self.by_id {
            write!(f, "by id {}", id)?;
        } else if let Some(descriptor) = &self.index_descriptor {
            write!(f, "index scan on {}", descriptor.index_fields())?;
            for filter in &self.index_scan_filters {
                write!(f, " {}", filter)?;
            }
        } else {
            write!(f, "collection scan")?;
        }

        if let Some(filter) = &self.collection_scan_filter {
            write!(f, " then filter {}", filter)?;
        }
        if !self.blocking_sort_order.is_empty() {
            write!(f, " then sort {:?}", self.blocking_sort_order)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FindPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
