pub mod model;
pub mod normalizer;

pub use model::*;
pub use normalizer::*;
