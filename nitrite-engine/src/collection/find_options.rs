use crate::common::{NullOrder, SortOrder, SortableFields};
use icu_collator::options::CollatorOptions;
use icu_collator::CollatorPreferences;

/// Sorting, paging and collation for `find`.
///
/// Skip and limit apply after filtering and sorting. Without a collator,
/// strings sort by code point, which is also the order of index keys.
#[derive(Clone, Default)]
pub struct FindOptions {
    pub(crate) sort_by: Option<SortableFields>,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) collator_options: Option<CollatorOptions>,
    pub(crate) collator_preferences: Option<CollatorPreferences>,
    pub(crate) null_order: NullOrder,
}

pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

pub fn skip_by(skip: u64) -> FindOptions {
    FindOptions::new().skip(skip)
}

pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Appends a sort key. Earlier keys are more significant.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        let fields = self.sort_by.take().unwrap_or_default();
        self.sort_by = Some(fields.add_sorted_field(field_name, sort_order));
        self
    }

    /// Where null or missing sort values go. `First` orders them below every
    /// value, so they lead ascending sorts and trail descending ones; `Last`
    /// orders them above every value.
    pub fn null_order(mut self, null_order: NullOrder) -> FindOptions {
        self.null_order = null_order;
        self
    }

    pub fn collator_options(mut self, collator: CollatorOptions) -> FindOptions {
        self.collator_options = Some(collator);
        self
    }

    pub fn collator_preferences(mut self, collator: CollatorPreferences) -> FindOptions {
        self.collator_preferences = Some(collator);
        self
    }

    pub(crate) fn has_collator(&self) -> bool {
        self.collator_options.is_some() || self.collator_preferences.is_some()
    }

    pub(crate) fn sort_order(&self) -> &[(String, SortOrder)] {
        self.sort_by
            .as_ref()
            .map(SortableFields::sorting_order)
            .unwrap_or_default()
    }
}
