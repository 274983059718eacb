use cwl_medals::clash::{Attack, WarMember, WarRound, WarSide, STATE_WAR_ENDED};

pub const OUR_TAG: &str = "#OURS";
pub const THEIR_TAG: &str = "#THEM";

pub fn member(tag: &str, th: u32, pos: u32) -> WarMember {
    WarMember {
        tag: tag.to_string(),
        name: format!("Player {}", tag.trim_start_matches('#')),
        townhall_level: (th > 0).then_some(th),
        map_position: (pos > 0).then_some(pos),
        attacks: None,
    }
}

pub fn attacking(mut member: WarMember, defender_tag: &str, stars: u32) -> WarMember {
    let attack = Attack {
        attacker_tag: member.tag.clone(),
        defender_tag: defender_tag.to_string(),
        stars,
        destruction_percentage: f64::from(stars) * 30.0,
        order: None,
    };
    member.attacks.get_or_insert_with(Vec::new).push(attack);
    member
}

/// A finished war between `#OURS` and `#THEM`, ending on the given day of
/// July 2025 (one CWL round per day).
pub fn finished_war(day: u8, ours: Vec<WarMember>, theirs: Vec<WarMember>) -> WarRound {
    WarRound {
        state: STATE_WAR_ENDED.to_string(),
        team_size: Some(15),
        attacks_per_member: Some(1),
        start_time: None,
        end_time: Some(format!("202507{day:02}T080000.000Z")),
        clan: WarSide {
            tag: OUR_TAG.to_string(),
            name: "Our Clan".to_string(),
            members: Some(ours),
        },
        opponent: WarSide {
            tag: THEIR_TAG.to_string(),
            name: "Rival Clan".to_string(),
            members: Some(theirs),
        },
    }
}
