use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::clash::{WarMember, WarRound};

/// One war the collector deemed scoreable, in season order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRound {
    pub war: WarRound,
    pub round_index: usize,
    pub opponent_name: String,
}

/// One scored attack, kept for the audit trail. `points` is the credit this
/// row contributed to the member's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDetail {
    pub round_index: usize,
    pub opponent_name: String,
    pub stars: u32,
    pub defender_tag: String,
    pub defender_town_hall: Option<u32>,
    pub defender_map_position: Option<u32>,
    pub was_higher_th: bool,
    pub bonus_awarded: bool,
    pub was_mirror: bool,
    pub points: f64,
}

/// One round's defense outcome. A row is appended every round the member was
/// on the roster, including rounds that contributed 0 points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseDetail {
    pub round_index: usize,
    pub opponent_name: String,
    pub stars_defended: u32,
    pub attacker_town_hall: Option<u32>,
    pub attacker_map_position: Option<u32>,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorViolation {
    pub round_index: usize,
    pub opponent_name: String,
}

/// Per-member accumulator across a season. Created the first time a tag is
/// seen, mutated once per round containing that tag, read-only afterwards.
/// `disqualified` and `flagged_for_review` are monotonic: set once, never
/// unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStats {
    pub tag: String,
    pub name: String,
    pub town_hall_level: Option<u32>,
    pub total_points: f64,
    pub total_attacks: u32,
    pub normalized_points: f64,
    pub disqualified: bool,
    pub disqualification_reason: Option<String>,
    pub flagged_for_review: bool,
    pub mirror_rule_violations: Vec<MirrorViolation>,
    /// Round indices in which the member attacked their mirror.
    pub mirror_attack_rounds: BTreeSet<usize>,
    pub attack_details: Vec<AttackDetail>,
    pub defense_details: Vec<DefenseDetail>,
}

impl MemberStats {
    pub fn seed_from(member: &WarMember) -> Self {
        let name = if member.name.is_empty() {
            member.tag.clone()
        } else {
            member.name.clone()
        };
        Self {
            tag: member.tag.clone(),
            name,
            town_hall_level: member.townhall_level,
            total_points: 0.0,
            total_attacks: 0,
            normalized_points: 0.0,
            disqualified: false,
            disqualification_reason: None,
            flagged_for_review: false,
            mirror_rule_violations: Vec::new(),
            mirror_attack_rounds: BTreeSet::new(),
            attack_details: Vec::new(),
            defense_details: Vec::new(),
        }
    }
}

/// Final per-clan outcome. A populated `error` with an empty member list is a
/// normal, displayable result, never a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClanBoard {
    pub clan_tag: String,
    pub clan_name: String,
    pub members: Vec<MemberStats>,
    pub error: Option<String>,
}

impl ClanBoard {
    pub fn empty(clan_tag: String, clan_name: String, reason: String) -> Self {
        Self {
            clan_tag,
            clan_name,
            members: Vec::new(),
            error: Some(reason),
        }
    }
}
