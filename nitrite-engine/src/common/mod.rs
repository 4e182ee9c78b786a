mod constants;
mod event_bus;
mod fields;
mod lock;
mod sort_order;
mod stream;
mod util;
mod value;

pub use constants::*;
pub use event_bus::*;
pub use fields::*;
pub use lock::*;
pub use sort_order::*;
pub use stream::*;
pub use util::*;
pub use value::*;
