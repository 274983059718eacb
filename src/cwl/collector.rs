use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clash::{
    current_month_key, normalize_tag, ClashApiError, WarCache, WarDataProvider, WarRound,
};
use crate::cwl::errors::CollectError;
use crate::cwl::models::CollectedRound;

/// Assembles the ordered list of war rounds to score for a clan, preferring
/// previously cached finished wars and falling back to the live league group.
/// Per-war failures are logged and skipped; only "no data at all" conditions
/// surface as a [`CollectError`].
pub struct WarRoundCollector {
    provider: Arc<dyn WarDataProvider>,
    cache: Arc<dyn WarCache>,
}

impl WarRoundCollector {
    pub fn new(provider: Arc<dyn WarDataProvider>, cache: Arc<dyn WarCache>) -> Self {
        Self { provider, cache }
    }

    pub async fn collect(
        &self,
        clan_tag: &str,
        month: Option<&str>,
    ) -> Result<Vec<CollectedRound>, CollectError> {
        let clan_tag = normalize_tag(clan_tag);
        let current_month = current_month_key();

        let mut rounds: Vec<CollectedRound> = Vec::new();
        let mut seen_end_times: HashSet<String> = HashSet::new();

        if let Some(month) = month {
            self.load_cached_month(&clan_tag, month, &mut rounds, &mut seen_end_times)
                .await;
        }

        // For a past month with nothing cached there is nothing the live API
        // can add: the league group only describes the current season.
        if let Some(month) = month {
            if month != current_month && rounds.is_empty() {
                return Err(CollectError::NoDataForMonth(month.to_string()));
            }
        }

        let should_fetch = month.is_none() || rounds.len() < usize::from(crate::clash::ROUNDS_PER_SEASON);
        if should_fetch {
            match self.live_war_tags(&clan_tag, month, &current_month).await {
                Ok(war_tags) => {
                    self.fetch_remaining(&clan_tag, month, &war_tags, &mut rounds, &mut seen_end_times)
                        .await;
                }
                Err(err) if rounds.is_empty() => return Err(err),
                Err(err) => {
                    debug!(%err, clan_tag, "live league lookup failed, scoring cached rounds only");
                }
            }
        }

        if rounds.is_empty() {
            return Err(CollectError::NoUsableRounds);
        }
        Ok(rounds)
    }

    /// Load up to seven cached day slots, dropping duplicate wars (same end
    /// time) and wars that do not include the clan, then renumber the
    /// survivors sequentially.
    async fn load_cached_month(
        &self,
        clan_tag: &str,
        month: &str,
        rounds: &mut Vec<CollectedRound>,
        seen_end_times: &mut HashSet<String>,
    ) {
        let cached = match self.cache.rounds_for_month(clan_tag, month).await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(?err, clan_tag, month, "failed to read cached rounds");
                return;
            }
        };

        for (day, war) in cached {
            // Record the end time before any skip so a war cached under two
            // slots blocks its duplicate, and a later live fetch of the same
            // war is also skipped.
            if let Some(end) = war.end_time.clone() {
                if !seen_end_times.insert(end) {
                    continue;
                }
            }
            if !war.includes_clan(clan_tag) {
                debug!(clan_tag, month, day, "cached war does not include clan, skipping");
                continue;
            }
            let opponent_name = war.opponent_name_for(clan_tag);
            rounds.push(CollectedRound {
                round_index: rounds.len(),
                opponent_name,
                war,
            });
        }
    }

    async fn live_war_tags(
        &self,
        clan_tag: &str,
        month: Option<&str>,
        current_month: &str,
    ) -> Result<Vec<String>, CollectError> {
        let group = match self.provider.league_group(clan_tag).await {
            Ok(group) => group,
            Err(ClashApiError::NotFound) => return Err(CollectError::NotInLeague),
            Err(err) => return Err(CollectError::Api(err.to_string())),
        };

        if !group.is_active() {
            return Err(match month {
                Some(m) if m != current_month => CollectError::NoDataForMonth(m.to_string()),
                _ => CollectError::LeagueInactive,
            });
        }

        let war_tags = group.war_tags();
        if war_tags.is_empty() {
            return Err(CollectError::NoWarTags);
        }
        Ok(war_tags)
    }

    /// Resolve every war tag beyond what cache already supplied: cache slot
    /// first, live fetch otherwise. Fetched finished wars are persisted
    /// before continuing. Individual failures never abort the batch.
    async fn fetch_remaining(
        &self,
        clan_tag: &str,
        month: Option<&str>,
        war_tags: &[String],
        rounds: &mut Vec<CollectedRound>,
        seen_end_times: &mut HashSet<String>,
    ) {
        for (slot, war_tag) in war_tags.iter().enumerate().skip(rounds.len()) {
            let mut war: Option<WarRound> = None;
            let mut fetched = false;

            if let Some(month) = month {
                let day = u8::try_from(slot + 1).unwrap_or(u8::MAX);
                match self.cache.load_round(clan_tag, month, day).await {
                    Ok(Some(cached)) if cached.is_finished() => war = Some(cached),
                    Ok(_) => {}
                    Err(err) => debug!(?err, war_tag, "cache lookup failed"),
                }
            }

            let war = match war {
                Some(war) => war,
                None => match self.provider.war_by_tag(war_tag).await {
                    Ok(war) => {
                        fetched = true;
                        war
                    }
                    Err(err) => {
                        warn!(?err, war_tag, clan_tag, "failed to fetch CWL war");
                        continue;
                    }
                },
            };

            if !war.includes_clan(clan_tag) || !war.is_finished() {
                continue;
            }
            if let Some(end) = war.end_time.as_deref() {
                if seen_end_times.contains(end) {
                    continue;
                }
            }

            if fetched {
                if let Err(err) = self.cache.save_round(&war, clan_tag, rounds.len()).await {
                    warn!(?err, war_tag, clan_tag, "failed to cache fetched war");
                }
            }

            if let Some(end) = war.end_time.clone() {
                seen_end_times.insert(end);
            }
            let opponent_name = war.opponent_name_for(clan_tag);
            rounds.push(CollectedRound {
                round_index: rounds.len(),
                opponent_name,
                war,
            });
        }
    }
}
