#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Whether an index must be walked backwards to produce this order.
    pub fn is_reverse(&self) -> bool {
        matches!(self, SortOrder::Descending)
    }
}

/// Placement of null or missing values in a sorted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullOrder {
    #[default]
    First,
    Last,
}
