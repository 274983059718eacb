// Serde model of the Clash of Clans war JSON. Field names follow the API
// wire format (camelCase, `townhallLevel` on war members), so these structs
// round-trip through the on-disk war cache unchanged.
use serde::{Deserialize, Serialize};

use crate::clash::month::month_key_from_end_time;
use crate::clash::tags::normalize_tag;

pub const STATE_WAR_ENDED: &str = "warEnded";
pub const STATE_NOT_IN_WAR: &str = "notInWar";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attack {
    pub attacker_tag: String,
    pub defender_tag: String,
    #[serde(default)]
    pub stars: u32,
    #[serde(default)]
    pub destruction_percentage: f64,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarMember {
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub townhall_level: Option<u32>,
    #[serde(default)]
    pub map_position: Option<u32>,
    #[serde(default)]
    pub attacks: Option<Vec<Attack>>,
}

impl WarMember {
    /// Town hall level with 0 standing in for "unknown".
    pub fn town_hall(&self) -> u32 {
        self.townhall_level.unwrap_or(0)
    }

    pub fn attack_count(&self) -> usize {
        self.attacks.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarSide {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: Option<Vec<WarMember>>,
}

impl WarSide {
    pub fn has_members(&self) -> bool {
        self.members.as_ref().is_some_and(|m| !m.is_empty())
    }
}

/// One war between two sides. In a CWL season the same struct describes each
/// of the up-to-seven rounds; only wars whose state is "warEnded" are scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarRound {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub attacks_per_member: Option<u32>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub clan: WarSide,
    pub opponent: WarSide,
}

impl WarRound {
    pub fn is_finished(&self) -> bool {
        self.state == STATE_WAR_ENDED
    }

    pub fn includes_clan(&self, clan_tag: &str) -> bool {
        self.sides_for(clan_tag).is_some()
    }

    /// Resolve (our side, their side) for the given clan tag. The API puts an
    /// arbitrary participant under `clan`, so both sides are checked.
    pub fn sides_for(&self, clan_tag: &str) -> Option<(&WarSide, &WarSide)> {
        let wanted = normalize_tag(clan_tag);
        if normalize_tag(&self.clan.tag) == wanted {
            Some((&self.clan, &self.opponent))
        } else if normalize_tag(&self.opponent.tag) == wanted {
            Some((&self.opponent, &self.clan))
        } else {
            None
        }
    }

    pub fn opponent_name_for(&self, clan_tag: &str) -> String {
        match self.sides_for(clan_tag) {
            Some((_, theirs)) if !theirs.name.is_empty() => theirs.name.clone(),
            _ => "Unknown".to_string(),
        }
    }

    /// Month key (YYYY-MM) derived from the war end time.
    pub fn end_month_key(&self) -> Option<String> {
        self.end_time.as_deref().and_then(month_key_from_end_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueRound {
    #[serde(default)]
    pub war_tags: Vec<String>,
}

/// The league group for a clan's current CWL season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueGroup {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub rounds: Vec<LeagueRound>,
}

impl LeagueGroup {
    pub fn is_active(&self) -> bool {
        self.state != STATE_NOT_IN_WAR && !self.rounds.is_empty()
    }

    /// War tags across all rounds, with the `#0` placeholders the API emits
    /// for unscheduled rounds removed.
    pub fn war_tags(&self) -> Vec<String> {
        self.rounds
            .iter()
            .flat_map(|r| r.war_tags.iter())
            .filter(|t| !t.is_empty() && t.as_str() != "#0")
            .cloned()
            .collect()
    }
}
