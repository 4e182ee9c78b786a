mod find_optimizer;
mod index_manager;
mod index_operations;
mod index_writer;
mod read_operations;
mod write_operations;
mod write_result;

pub(crate) use index_manager::*;
pub(crate) use index_operations::*;
pub(crate) use index_writer::*;
pub(crate) use read_operations::*;
pub(crate) use write_operations::*;
pub use write_result::*;
