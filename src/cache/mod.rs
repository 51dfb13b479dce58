pub mod resolution_cache;

pub use resolution_cache::ResolutionCache;
