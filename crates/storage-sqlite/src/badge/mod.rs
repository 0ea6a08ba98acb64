mod repository;

pub use repository::{SqliteBadgeStore, BADGE_COUNTER};
