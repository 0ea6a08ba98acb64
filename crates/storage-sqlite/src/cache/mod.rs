mod model;
mod repository;

pub use model::*;
pub use repository::SqliteCacheStorage;
