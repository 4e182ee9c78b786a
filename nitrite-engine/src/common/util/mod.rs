mod index_utils;
mod task_util;
mod time_utils;
mod type_utils;

pub(crate) use index_utils::*;
pub use task_util::*;
pub use time_utils::*;
pub use type_utils::*;
