// Library crate for the CWL bonus-medal scoring engine
// This file exposes the public API for the binary and integration tests

pub mod clash;
pub mod cwl;

// Re-export commonly used types for easier access in tests
pub use clash::{
    ClashApiError, CocClient, FsWarCache, InMemoryWarCache, WarCache, WarCacheError,
    WarDataProvider,
};
pub use cwl::{
    BonusMedalService, ClanBoard, ClanRef, CollectError, CollectedRound, MemberStats,
    WarRoundCollector,
};
