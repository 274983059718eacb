use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use cwl_medals::clash::{LeagueGroup, LeagueRound, WarRound};
use cwl_medals::{ClashApiError, WarDataProvider};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// War-data provider scripted entirely up front. A missing league group or
/// war tag answers with NotFound; tags in `failing` answer with a 5xx.
pub struct ScriptedProvider {
    group: Option<LeagueGroup>,
    wars: HashMap<String, WarRound>,
    failing: HashSet<String>,
}

impl ScriptedProvider {
    pub fn not_in_league() -> Self {
        Self {
            group: None,
            wars: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    /// An active league announcing `wars` in order, one war tag per entry.
    pub fn active_league(wars: Vec<(&str, WarRound)>) -> Self {
        let war_tags = wars.iter().map(|(t, _)| (*t).to_string()).collect();
        Self {
            group: Some(LeagueGroup {
                state: "inWar".to_string(),
                season: None,
                rounds: vec![LeagueRound { war_tags }],
            }),
            wars: wars
                .into_iter()
                .map(|(t, w)| (t.to_string(), w))
                .collect(),
            failing: HashSet::new(),
        }
    }

    pub fn with_failing_tag(mut self, tag: &str) -> Self {
        self.failing.insert(tag.to_string());
        self
    }
}

#[async_trait]
impl WarDataProvider for ScriptedProvider {
    async fn league_group(&self, _clan_tag: &str) -> Result<LeagueGroup, ClashApiError> {
        self.group.clone().ok_or(ClashApiError::NotFound)
    }

    async fn war_by_tag(&self, war_tag: &str) -> Result<WarRound, ClashApiError> {
        if self.failing.contains(war_tag) {
            return Err(ClashApiError::Api {
                status: 503,
                message: "scripted failure".to_string(),
            });
        }
        self.wars
            .get(war_tag)
            .cloned()
            .ok_or(ClashApiError::NotFound)
    }
}
