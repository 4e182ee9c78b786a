// doc constants
pub const DOC_ID: &str = "_id";
pub const DOC_REVISION: &str = "_revision";
pub const DOC_MODIFIED: &str = "_modified";
pub const DOC_SOURCE: &str = "_source";
pub const RESERVED_FIELDS: [&str; 4] = [DOC_ID, DOC_REVISION, DOC_MODIFIED, DOC_SOURCE];

// event constants
pub const NITRITE_EVENT: &str = "nitrite_event";

// index constants
pub const UNIQUE_INDEX: &str = "unique";
pub const NON_UNIQUE_INDEX: &str = "non-unique";
pub const FULL_TEXT_INDEX: &str = "full-text";
pub const INDEX_PREFIX: &str = "$nitrite_index";
pub const INDEX_META_PREFIX: &str = "$nitrite_index_meta";
pub const INTERNAL_NAME_SEPARATOR: &str = "|";
pub const NAME_SEPARATOR: &str = "|";

// field path separator for nested documents
pub const FIELD_SEPARATOR: &str = ".";

// element match wraps scalar array items under this field
pub const ELEMENT_FIELD: &str = "$";

pub const NO2: &str = "NO\u{2082}";
pub const REPLICATOR: &str = "Replicator.NO\u{2082}";

pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 256;
