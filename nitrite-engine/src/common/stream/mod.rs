mod document_cursor;
pub(crate) mod filtered_stream;
pub(crate) mod indexed_stream;
pub(crate) mod map_values;
pub(crate) mod sorted_stream;

pub use document_cursor::*;
