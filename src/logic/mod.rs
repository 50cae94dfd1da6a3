pub mod errors;
pub mod nested;
pub mod relationships;
pub mod service;
pub mod validate;

pub use errors::*;
pub use nested::*;
pub use relationships::*;
pub use service::*;
pub use validate::*;
