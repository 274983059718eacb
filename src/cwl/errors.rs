use thiserror::Error;

/// Why no rounds could be assembled for a clan. These are soft outcomes: the
/// service turns them into a displayable `ClanBoard.error`, never a panic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectError {
    #[error("Clan is not currently in CWL or has no CWL history")]
    NotInLeague,

    #[error("Clan is not currently in an active CWL")]
    LeagueInactive,

    #[error("No CWL wars found. CWL may not have started yet.")]
    NoWarTags,

    #[error("No CWL wars with member data found. Wars may not have started yet or data is not available.")]
    NoUsableRounds,

    #[error("No CWL data available for {0}. The clan may not have participated in CWL that month.")]
    NoDataForMonth(String),

    #[error("Failed to fetch CWL data: {0}")]
    Api(String),
}
