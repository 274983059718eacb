use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::cwl::models::MemberStats;

/// Normalize and order scored members into the final leaderboard:
/// points-per-attack descending, with disqualified members strictly after
/// everyone else. Ties keep the incoming (tag) order via the stable sort.
pub fn rank(stats: BTreeMap<String, MemberStats>) -> Vec<MemberStats> {
    let mut members: Vec<MemberStats> = stats.into_values().collect();

    for member in &mut members {
        member.normalized_points = if member.total_attacks > 0 {
            member.total_points / f64::from(member.total_attacks)
        } else {
            0.0
        };
    }

    members.sort_by(|a, b| {
        a.disqualified.cmp(&b.disqualified).then_with(|| {
            b.normalized_points
                .partial_cmp(&a.normalized_points)
                .unwrap_or(Ordering::Equal)
        })
    });
    members
}
