pub mod collector;
pub mod models;
pub mod ranker;
pub mod scorer;
pub mod service;

mod errors;

pub use collector::WarRoundCollector;
pub use errors::CollectError;
pub use models::{
    AttackDetail, ClanBoard, CollectedRound, DefenseDetail, MemberStats, MirrorViolation,
};
pub use ranker::rank;
pub use scorer::score_rounds;
pub use service::{BonusMedalService, ClanRef};
