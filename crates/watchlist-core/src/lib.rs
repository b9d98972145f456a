pub mod classifier;
pub mod error;
pub mod symbol;
pub mod traits;
pub mod types;

pub use classifier::*;
pub use error::*;
pub use symbol::*;
pub use traits::*;
pub use types::*;
