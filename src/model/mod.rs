pub mod common;
pub mod item;
pub mod relationship;
pub mod schema;

pub use common::*;
pub use item::*;
pub use relationship::*;
pub use schema::*;
