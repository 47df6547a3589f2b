pub mod combinatorics;
pub mod conditional;
pub mod config;
pub mod error;
pub mod generator;
pub mod patterns;
pub mod recommend;
pub mod source;
pub mod trend;
pub mod winning;

pub use conditional::{compute_conditional, ConstraintSet};
pub use error::{ConstraintError, FetchError};
pub use recommend::recommend;
pub use trend::analyze;
