// Public API
pub use cache::{FsWarCache, InMemoryWarCache, WarCache, ROUNDS_PER_SEASON};
pub use errors::{ClashApiError, WarCacheError};
pub use models::{
    Attack, LeagueGroup, LeagueRound, WarMember, WarRound, WarSide, STATE_NOT_IN_WAR,
    STATE_WAR_ENDED,
};
pub use month::{current_month_key, is_valid_month_key, month_key_from_end_time};
pub use provider::{CocClient, WarDataProvider, DEFAULT_BASE_URL};
pub use tags::{normalize_tag, tag_path_segment};

// Internal modules
mod cache;
mod errors;
mod models;
mod month;
mod provider;
mod tags;
