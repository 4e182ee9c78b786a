mod map;
mod store;

pub use map::*;
pub use store::*;
