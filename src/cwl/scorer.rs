use std::collections::{BTreeMap, HashMap};

use crate::clash::{normalize_tag, WarMember};
use crate::cwl::models::{AttackDetail, CollectedRound, DefenseDetail, MemberStats, MirrorViolation};

const DISQUALIFIED_MISSED_ATTACKS: &str = "Missed attack(s)";

/// Score a season's worth of rounds for one clan. Pure and deterministic:
/// no I/O, and the returned map is ordered by member tag.
///
/// Rounds must arrive in ascending `round_index` order; ordering never
/// changes point totals but is preserved in the per-round detail rows.
pub fn score_rounds(rounds: &[CollectedRound], clan_tag: &str) -> BTreeMap<String, MemberStats> {
    let clan_tag = normalize_tag(clan_tag);
    let mut stats_by_tag: BTreeMap<String, MemberStats> = BTreeMap::new();

    for round in rounds {
        let Some((ours, theirs)) = round.war.sides_for(&clan_tag) else {
            continue;
        };
        let (Some(our_members), Some(their_members)) =
            (ours.members.as_ref(), theirs.members.as_ref())
        else {
            continue;
        };
        if our_members.is_empty() || their_members.is_empty() {
            continue;
        }

        // Fresh per-round lookup: opponent occupying each map position.
        let mirror_by_position: HashMap<u32, &WarMember> = their_members
            .iter()
            .filter_map(|m| m.map_position.map(|p| (p, m)))
            .collect();

        let attacks_per_member = round.war.attacks_per_member.unwrap_or(1);

        for member in our_members {
            let stats = stats_by_tag
                .entry(member.tag.clone())
                .or_insert_with(|| MemberStats::seed_from(member));

            // Last-seen non-zero town hall wins across rounds.
            if member.town_hall() > 0 {
                stats.town_hall_level = member.townhall_level;
            }
            let member_th = member.town_hall();

            if member.attack_count() == 0 && attacks_per_member > 0 {
                stats.disqualified = true;
                stats.disqualification_reason = Some(DISQUALIFIED_MISSED_ATTACKS.to_string());
            }

            let mut attacked_mirror = false;
            if let Some(attacks) = member.attacks.as_ref() {
                for attack in attacks {
                    stats.total_attacks += 1;
                    let stars = attack.stars;

                    let defender = their_members.iter().find(|m| m.tag == attack.defender_tag);
                    let defender_th = defender.map_or(0, WarMember::town_hall);
                    let defender_pos = defender.and_then(|d| d.map_position);
                    let was_higher_th = defender_th > member_th;

                    let was_mirror = member
                        .map_position
                        .and_then(|p| mirror_by_position.get(&p))
                        .is_some_and(|mirror| mirror.tag == attack.defender_tag);
                    if was_mirror {
                        attacked_mirror = true;
                        stats.mirror_attack_rounds.insert(round.round_index);
                    }

                    let bonus_awarded =
                        was_higher_th && bonus_allowed(their_members, defender_pos, defender_th);

                    // +2 per star, +1 more per star when the bonus applies.
                    let points = f64::from(stars * 2 + if bonus_awarded { stars } else { 0 });
                    stats.total_points += points;
                    stats.attack_details.push(AttackDetail {
                        round_index: round.round_index,
                        opponent_name: round.opponent_name.clone(),
                        stars,
                        defender_tag: attack.defender_tag.clone(),
                        defender_town_hall: (defender_th > 0).then_some(defender_th),
                        defender_map_position: defender_pos,
                        was_higher_th,
                        bonus_awarded,
                        was_mirror,
                        points,
                    });
                }
            }

            if !attacked_mirror && member.attack_count() > 0 {
                stats.mirror_rule_violations.push(MirrorViolation {
                    round_index: round.round_index,
                    opponent_name: round.opponent_name.clone(),
                });
            }

            score_defense(stats, member, member_th, their_members, round);
        }
    }

    // A member who attacked but never hit their mirror in any round gets a
    // soft review flag, not a disqualification.
    for stats in stats_by_tag.values_mut() {
        if !stats.mirror_rule_violations.is_empty()
            && stats.mirror_attack_rounds.is_empty()
            && stats.total_attacks > 0
        {
            stats.flagged_for_review = true;
        }
    }

    stats_by_tag
}

/// The bonus needs a known defender position, and is blocked if any opponent
/// ranked above the defender has a strictly lower town hall ("rushed base
/// above defender").
fn bonus_allowed(
    their_members: &[WarMember],
    defender_pos: Option<u32>,
    defender_th: u32,
) -> bool {
    let Some(defender_pos) = defender_pos else {
        return false;
    };
    !their_members.iter().any(|opponent| {
        opponent
            .map_position
            .is_some_and(|p| p < defender_pos)
            && opponent.town_hall() < defender_th
    })
}

/// Defense for one member in one round. Only the single worst hit counts;
/// ties on stars go to the highest-townhall attacker. A round with no
/// incoming attack is a flat 2 points.
fn score_defense(
    stats: &mut MemberStats,
    member: &WarMember,
    member_th: u32,
    their_members: &[WarMember],
    round: &CollectedRound,
) {
    let mut was_attacked = false;
    let mut max_stars_lost: u32 = 0;
    let mut attacker_th: u32 = 0;
    let mut attacker_pos: Option<u32> = None;

    for opponent in their_members {
        let Some(attacks) = opponent.attacks.as_ref() else {
            continue;
        };
        for attack in attacks {
            if attack.defender_tag != member.tag {
                continue;
            }
            was_attacked = true;
            let stars = attack.stars;
            let th = opponent.town_hall();
            if stars > max_stars_lost {
                max_stars_lost = stars;
                attacker_th = th;
                attacker_pos = opponent.map_position;
            } else if stars == max_stars_lost && th > attacker_th {
                attacker_th = th;
                attacker_pos = opponent.map_position;
            }
        }
    }

    let (stars_defended, points) = if was_attacked {
        let stars_defended = 3u32.saturating_sub(max_stars_lost);
        // A lower-townhall attacker taking stars does not cost the defender
        // any credit; a full three-star always scores 0.
        let points = if stars_defended > 0 && attacker_th >= member_th {
            f64::from(stars_defended * 2)
        } else {
            0.0
        };
        (stars_defended, points)
    } else {
        (3, 2.0)
    };

    stats.total_points += points;
    stats.defense_details.push(DefenseDetail {
        round_index: round.round_index,
        opponent_name: round.opponent_name.clone(),
        stars_defended,
        attacker_town_hall: (was_attacked && attacker_th > 0).then_some(attacker_th),
        attacker_map_position: if was_attacked { attacker_pos } else { None },
        points,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash::{Attack, WarRound, WarSide, STATE_WAR_ENDED};
    use rstest::rstest;

    fn member(tag: &str, th: u32, pos: u32) -> WarMember {
        WarMember {
            tag: tag.to_string(),
            name: format!("Player {}", tag.trim_start_matches('#')),
            townhall_level: (th > 0).then_some(th),
            map_position: (pos > 0).then_some(pos),
            attacks: None,
        }
    }

    fn attacking(mut m: WarMember, defender_tag: &str, stars: u32) -> WarMember {
        let attack = Attack {
            attacker_tag: m.tag.clone(),
            defender_tag: defender_tag.to_string(),
            stars,
            destruction_percentage: f64::from(stars) * 30.0,
            order: None,
        };
        m.attacks.get_or_insert_with(Vec::new).push(attack);
        m
    }

    fn round(index: usize, ours: Vec<WarMember>, theirs: Vec<WarMember>) -> CollectedRound {
        CollectedRound {
            war: WarRound {
                state: STATE_WAR_ENDED.to_string(),
                team_size: None,
                attacks_per_member: Some(1),
                start_time: None,
                end_time: Some(format!("2025070{}T080000.000Z", index + 1)),
                clan: WarSide {
                    tag: "#OURS".to_string(),
                    name: "Ours".to_string(),
                    members: Some(ours),
                },
                opponent: WarSide {
                    tag: "#THEM".to_string(),
                    name: "Them".to_string(),
                    members: Some(theirs),
                },
            },
            round_index: index,
            opponent_name: "Them".to_string(),
        }
    }

    fn stats_for<'a>(
        map: &'a BTreeMap<String, MemberStats>,
        tag: &str,
    ) -> &'a MemberStats {
        map.get(tag).expect("member scored")
    }

    #[test]
    fn awards_two_points_per_star_without_bonus() {
        let rounds = vec![round(
            0,
            vec![attacking(member("#P1", 15, 1), "#Q1", 3)],
            vec![member("#Q1", 15, 1)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let p1 = stats_for(&scored, "#P1");
        assert_eq!(p1.attack_details.len(), 1);
        assert!(!p1.attack_details[0].bonus_awarded);
        assert_eq!(p1.attack_details[0].points, 6.0);
        // 6 attack + 2 untouched defense.
        assert_eq!(p1.total_points, 8.0);
    }

    #[test]
    fn awards_bonus_for_higher_th_with_clean_roster_above() {
        // Scenario: TH15 at 3 hits TH16 at 3; positions 1 and 2 are TH16.
        let rounds = vec![round(
            0,
            vec![attacking(member("#P1", 15, 3), "#Q3", 3)],
            vec![
                member("#Q1", 16, 1),
                member("#Q2", 16, 2),
                member("#Q3", 16, 3),
            ],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let detail = &stats_for(&scored, "#P1").attack_details[0];
        assert!(detail.was_higher_th);
        assert!(detail.bonus_awarded);
        assert_eq!(detail.points, 9.0);
    }

    #[test]
    fn denies_bonus_when_rushed_base_sits_above_defender() {
        // Same as above but position 1 is a TH14, lower than the defender.
        let rounds = vec![round(
            0,
            vec![attacking(member("#P1", 15, 3), "#Q3", 3)],
            vec![
                member("#Q1", 14, 1),
                member("#Q2", 16, 2),
                member("#Q3", 16, 3),
            ],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let detail = &stats_for(&scored, "#P1").attack_details[0];
        assert!(detail.was_higher_th);
        assert!(!detail.bonus_awarded);
        assert_eq!(detail.points, 6.0);
    }

    #[rstest]
    #[case(15, 15)] // same TH
    #[case(16, 15)] // lower TH
    fn denies_bonus_for_same_or_lower_defender(#[case] attacker_th: u32, #[case] defender_th: u32) {
        let rounds = vec![round(
            0,
            vec![attacking(member("#P1", attacker_th, 1), "#Q1", 3)],
            vec![member("#Q1", defender_th, 1)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let detail = &stats_for(&scored, "#P1").attack_details[0];
        assert!(!detail.bonus_awarded);
    }

    #[test]
    fn denies_bonus_when_defender_position_unknown() {
        let rounds = vec![round(
            0,
            vec![attacking(member("#P1", 14, 1), "#Q1", 3)],
            vec![member("#Q1", 16, 0)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let detail = &stats_for(&scored, "#P1").attack_details[0];
        assert!(detail.was_higher_th);
        assert!(!detail.bonus_awarded);
    }

    #[test]
    fn missed_attack_disqualifies_and_sticks() {
        let rounds = vec![
            round(0, vec![member("#P1", 15, 1)], vec![member("#Q1", 15, 1)]),
            round(
                1,
                vec![attacking(member("#P1", 15, 1), "#Q1", 3)],
                vec![member("#Q1", 15, 1)],
            ),
        ];

        let scored = score_rounds(&rounds, "#OURS");
        let p1 = stats_for(&scored, "#P1");
        assert!(p1.disqualified);
        assert_eq!(p1.disqualification_reason.as_deref(), Some("Missed attack(s)"));
        // The later perfect round does not undo it.
        assert_eq!(p1.total_attacks, 1);
    }

    #[test]
    fn no_disqualification_when_war_expects_zero_attacks() {
        let mut r = round(0, vec![member("#P1", 15, 1)], vec![member("#Q1", 15, 1)]);
        r.war.attacks_per_member = Some(0);

        let scored = score_rounds(&[r], "#OURS");
        assert!(!stats_for(&scored, "#P1").disqualified);
    }

    #[test]
    fn untouched_round_awards_flat_two_defense_points() {
        let rounds = vec![round(
            0,
            vec![attacking(member("#P1", 15, 1), "#Q1", 2)],
            vec![member("#Q1", 15, 1)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let defense = &stats_for(&scored, "#P1").defense_details[0];
        assert_eq!(defense.stars_defended, 3);
        assert_eq!(defense.attacker_town_hall, None);
        assert_eq!(defense.points, 2.0);
    }

    #[test]
    fn defense_credit_requires_attacker_at_least_equal_th() {
        // TH14 takes one star off a TH15: starsDefended is 2 but no points.
        let rounds = vec![round(
            0,
            vec![member("#P1", 15, 1)],
            vec![attacking(member("#Q1", 14, 1), "#P1", 1)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let defense = &stats_for(&scored, "#P1").defense_details[0];
        assert_eq!(defense.stars_defended, 2);
        assert_eq!(defense.attacker_town_hall, Some(14));
        assert_eq!(defense.points, 0.0);
    }

    #[test]
    fn defense_awards_stars_defended_times_two() {
        let rounds = vec![round(
            0,
            vec![member("#P1", 15, 1)],
            vec![attacking(member("#Q1", 15, 1), "#P1", 1)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let defense = &stats_for(&scored, "#P1").defense_details[0];
        assert_eq!(defense.stars_defended, 2);
        assert_eq!(defense.points, 4.0);
    }

    #[test]
    fn three_starred_member_gets_no_defense_points() {
        let rounds = vec![round(
            0,
            vec![member("#P1", 15, 1)],
            vec![attacking(member("#Q1", 16, 1), "#P1", 3)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let defense = &stats_for(&scored, "#P1").defense_details[0];
        assert_eq!(defense.stars_defended, 0);
        assert_eq!(defense.points, 0.0);
        assert_eq!(defense.attacker_town_hall, Some(16));
    }

    #[test]
    fn defense_counts_only_the_worst_single_hit() {
        let rounds = vec![round(
            0,
            vec![member("#P1", 15, 1)],
            vec![
                attacking(member("#Q1", 15, 1), "#P1", 1),
                attacking(member("#Q2", 15, 2), "#P1", 2),
            ],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let defense = &stats_for(&scored, "#P1").defense_details[0];
        // Worst hit is 2 stars, not the 3-star sum.
        assert_eq!(defense.stars_defended, 1);
        assert_eq!(defense.points, 2.0);
        assert_eq!(defense.attacker_map_position, Some(2));
    }

    #[test]
    fn defense_star_ties_prefer_highest_townhall_attacker() {
        let rounds = vec![round(
            0,
            vec![member("#P1", 15, 1)],
            vec![
                attacking(member("#Q1", 14, 1), "#P1", 2),
                attacking(member("#Q2", 16, 2), "#P1", 2),
            ],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let defense = &stats_for(&scored, "#P1").defense_details[0];
        assert_eq!(defense.attacker_town_hall, Some(16));
        assert_eq!(defense.attacker_map_position, Some(2));
        // TH16 >= TH15, so the remaining star pays out.
        assert_eq!(defense.points, 2.0);
    }

    #[test]
    fn mirror_attack_is_tracked_and_clears_the_flag() {
        let rounds = vec![round(
            0,
            vec![attacking(member("#P1", 15, 2), "#Q2", 2)],
            vec![member("#Q1", 15, 1), member("#Q2", 15, 2)],
        )];

        let scored = score_rounds(&rounds, "#OURS");
        let p1 = stats_for(&scored, "#P1");
        assert!(p1.attack_details[0].was_mirror);
        assert!(p1.mirror_attack_rounds.contains(&0));
        assert!(p1.mirror_rule_violations.is_empty());
        assert!(!p1.flagged_for_review);
    }

    #[test]
    fn flags_member_who_never_attacks_their_mirror() {
        let rounds = vec![
            round(
                0,
                vec![attacking(member("#P1", 15, 2), "#Q1", 2)],
                vec![member("#Q1", 15, 1), member("#Q2", 15, 2)],
            ),
            round(
                1,
                vec![attacking(member("#P1", 15, 2), "#Q1", 2)],
                vec![member("#Q1", 15, 1), member("#Q2", 15, 2)],
            ),
        ];

        let scored = score_rounds(&rounds, "#OURS");
        let p1 = stats_for(&scored, "#P1");
        assert_eq!(p1.mirror_rule_violations.len(), 2);
        assert!(p1.flagged_for_review);
    }

    #[test]
    fn one_mirror_attack_across_the_season_avoids_the_flag() {
        let rounds = vec![
            round(
                0,
                vec![attacking(member("#P1", 15, 2), "#Q1", 2)],
                vec![member("#Q1", 15, 1), member("#Q2", 15, 2)],
            ),
            round(
                1,
                vec![attacking(member("#P1", 15, 2), "#Q2", 2)],
                vec![member("#Q1", 15, 1), member("#Q2", 15, 2)],
            ),
        ];

        let scored = score_rounds(&rounds, "#OURS");
        let p1 = stats_for(&scored, "#P1");
        assert_eq!(p1.mirror_rule_violations.len(), 1);
        assert!(!p1.flagged_for_review);
    }

    #[test]
    fn member_without_attacks_is_never_flagged() {
        let rounds = vec![round(0, vec![member("#P1", 15, 1)], vec![member("#Q1", 15, 1)])];

        let scored = score_rounds(&rounds, "#OURS");
        let p1 = stats_for(&scored, "#P1");
        assert!(p1.disqualified);
        assert!(!p1.flagged_for_review);
    }

    #[test]
    fn town_hall_updates_only_on_known_values() {
        let rounds = vec![
            round(
                0,
                vec![attacking(member("#P1", 15, 1), "#Q1", 2)],
                vec![member("#Q1", 15, 1)],
            ),
            round(
                1,
                vec![attacking(member("#P1", 0, 1), "#Q1", 2)],
                vec![member("#Q1", 15, 1)],
            ),
            round(
                2,
                vec![attacking(member("#P1", 16, 1), "#Q1", 2)],
                vec![member("#Q1", 15, 1)],
            ),
        ];

        let scored = score_rounds(&rounds, "#OURS");
        assert_eq!(stats_for(&scored, "#P1").town_hall_level, Some(16));
    }

    #[test]
    fn skips_rounds_missing_a_members_list() {
        let mut bad = round(
            0,
            vec![attacking(member("#P1", 15, 1), "#Q1", 3)],
            vec![member("#Q1", 15, 1)],
        );
        bad.war.opponent.members = None;
        let good = round(
            1,
            vec![attacking(member("#P1", 15, 1), "#Q1", 3)],
            vec![member("#Q1", 15, 1)],
        );

        let scored = score_rounds(&[bad, good], "#OURS");
        let p1 = stats_for(&scored, "#P1");
        assert_eq!(p1.total_attacks, 1);
        assert_eq!(p1.attack_details[0].round_index, 1);
    }

    #[test]
    fn scoring_is_deterministic() {
        let rounds = vec![
            round(
                0,
                vec![
                    attacking(member("#P1", 15, 1), "#Q1", 3),
                    attacking(member("#P2", 14, 2), "#Q2", 1),
                    member("#P3", 13, 3),
                ],
                vec![
                    member("#Q1", 16, 1),
                    attacking(member("#Q2", 15, 2), "#P2", 2),
                    member("#Q3", 13, 3),
                ],
            ),
            round(
                1,
                vec![attacking(member("#P1", 15, 1), "#Q1", 2)],
                vec![attacking(member("#Q1", 16, 1), "#P1", 3)],
            ),
        ];

        assert_eq!(score_rounds(&rounds, "#OURS"), score_rounds(&rounds, "#OURS"));
    }

    #[test]
    fn resolves_our_side_when_clan_is_the_api_opponent() {
        let mut r = round(
            0,
            vec![attacking(member("#P1", 15, 1), "#Q1", 3)],
            vec![member("#Q1", 15, 1)],
        );
        std::mem::swap(&mut r.war.clan, &mut r.war.opponent);

        let scored = score_rounds(&[r], "#OURS");
        assert_eq!(stats_for(&scored, "#P1").total_attacks, 1);
    }
}
