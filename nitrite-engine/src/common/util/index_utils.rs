use crate::common::{INDEX_META_PREFIX, INDEX_PREFIX, INTERNAL_NAME_SEPARATOR};
use crate::index::IndexDescriptor;

/// `$nitrite_index|<collection>|<fields>|<kind>`
pub(crate) fn derive_index_map_name(descriptor: &IndexDescriptor) -> String {
    let mut name = String::with_capacity(80);
    name.push_str(INDEX_PREFIX);
    name.push_str(INTERNAL_NAME_SEPARATOR);
    name.push_str(descriptor.collection_name());
    name.push_str(INTERNAL_NAME_SEPARATOR);
    name.push_str(descriptor.index_fields().encoded_names());
    name.push_str(INTERNAL_NAME_SEPARATOR);
    name.push_str(descriptor.index_kind().as_str());
    name
}

/// `$nitrite_index_meta|<collection>`
pub(crate) fn derive_index_meta_map_name(collection_name: &str) -> String {
    let mut name = String::with_capacity(48);
    name.push_str(INDEX_META_PREFIX);
    name.push_str(INTERNAL_NAME_SEPARATOR);
    name.push_str(collection_name);
    name
}
