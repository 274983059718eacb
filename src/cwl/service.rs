use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clash::{normalize_tag, WarCache, WarDataProvider};
use crate::cwl::collector::WarRoundCollector;
use crate::cwl::models::ClanBoard;
use crate::cwl::ranker::rank;
use crate::cwl::scorer::score_rounds;

/// A clan to score, with an optional display name.
#[derive(Debug, Clone)]
pub struct ClanRef {
    pub tag: String,
    pub name: Option<String>,
}

impl ClanRef {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: None,
        }
    }

    pub fn named(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: Some(name.into()),
        }
    }
}

/// Public entry point for bonus-medal computation. Every outcome is a
/// [`ClanBoard`]: unrecoverable conditions surface as `error` plus an empty
/// member list, never as an Err or panic.
pub struct BonusMedalService {
    cache: Arc<dyn WarCache>,
    collector: WarRoundCollector,
}

impl BonusMedalService {
    pub fn new(provider: Arc<dyn WarDataProvider>, cache: Arc<dyn WarCache>) -> Self {
        Self {
            collector: WarRoundCollector::new(provider, cache.clone()),
            cache,
        }
    }

    pub async fn compute(
        &self,
        clan_tag: &str,
        clan_name: Option<&str>,
        month: Option<&str>,
    ) -> ClanBoard {
        let tag = normalize_tag(clan_tag);
        let name = clan_name
            .filter(|n| !n.is_empty())
            .map_or_else(|| tag.clone(), ToString::to_string);

        match self.collector.collect(&tag, month).await {
            Ok(rounds) => {
                info!(clan_tag = %tag, rounds = rounds.len(), "scoring CWL rounds");
                let members = rank(score_rounds(&rounds, &tag));
                ClanBoard {
                    clan_tag: tag,
                    clan_name: name,
                    members,
                    error: None,
                }
            }
            Err(err) => {
                info!(clan_tag = %tag, %err, "no scoreable CWL rounds");
                ClanBoard::empty(tag, name, err.to_string())
            }
        }
    }

    /// Score several clans; one clan's failure never aborts the rest.
    pub async fn compute_many(&self, clans: &[ClanRef], month: Option<&str>) -> Vec<ClanBoard> {
        let mut boards = Vec::with_capacity(clans.len());
        for clan in clans {
            boards.push(self.compute(&clan.tag, clan.name.as_deref(), month).await);
        }
        boards
    }

    /// Months with cached data across any of the given clans, newest first.
    pub async fn available_months(&self, clan_tags: &[String]) -> Vec<String> {
        let mut months = BTreeSet::new();
        for tag in clan_tags {
            match self.cache.list_months(tag).await {
                Ok(found) => months.extend(found),
                Err(err) => warn!(?err, clan_tag = %tag, "failed to list cached months"),
            }
        }
        months.into_iter().rev().collect()
    }
}
