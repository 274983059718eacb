use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::clash::errors::WarCacheError;
use crate::clash::models::WarRound;
use crate::clash::month::is_valid_month_key;
use crate::clash::tags::tag_path_segment;

/// A CWL season runs at most seven rounds; cached day slots are 1..=7.
pub const ROUNDS_PER_SEASON: u8 = 7;

/// Persistence for finished war rounds, keyed by clan, month and day slot.
/// Only wars whose state is "warEnded" are ever written.
#[async_trait]
pub trait WarCache: Send + Sync {
    async fn load_round(
        &self,
        clan_tag: &str,
        month: &str,
        day: u8,
    ) -> Result<Option<WarRound>, WarCacheError>;

    /// Persist a finished round. The day slot is `round_index + 1` so day
    /// files match the order the collector assigned. Unfinished wars and
    /// wars without a parseable end time are skipped.
    async fn save_round(
        &self,
        war: &WarRound,
        clan_tag: &str,
        round_index: usize,
    ) -> Result<(), WarCacheError>;

    async fn rounds_for_month(
        &self,
        clan_tag: &str,
        month: &str,
    ) -> Result<BTreeMap<u8, WarRound>, WarCacheError>;

    /// Months with any cached data for a clan, newest first.
    async fn list_months(&self, clan_tag: &str) -> Result<Vec<String>, WarCacheError>;
}

/// Day-file JSON cache: `<root>/<TAG>/<YYYY-MM>/day<N>.json`.
pub struct FsWarCache {
    root: PathBuf,
}

impl FsWarCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn clan_dir(&self, clan_tag: &str) -> PathBuf {
        self.root.join(tag_path_segment(clan_tag))
    }

    fn day_path(&self, clan_tag: &str, month: &str, day: u8) -> PathBuf {
        self.clan_dir(clan_tag).join(month).join(format!("day{day}.json"))
    }
}

#[async_trait]
impl WarCache for FsWarCache {
    async fn load_round(
        &self,
        clan_tag: &str,
        month: &str,
        day: u8,
    ) -> Result<Option<WarRound>, WarCacheError> {
        let path = self.day_path(clan_tag, month, day);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&raw) {
            Ok(war) => Ok(Some(war)),
            Err(err) => {
                // Unreadable day files are treated as absent so one corrupt
                // entry cannot block the rest of the month.
                warn!(?err, path = %path.display(), "discarding unparseable cached war");
                Ok(None)
            }
        }
    }

    async fn save_round(
        &self,
        war: &WarRound,
        clan_tag: &str,
        round_index: usize,
    ) -> Result<(), WarCacheError> {
        if !war.is_finished() {
            return Ok(());
        }
        let Some(month) = war.end_month_key() else {
            return Ok(());
        };
        let day = u8::try_from(round_index + 1).unwrap_or(u8::MAX);

        let path = self.day_path(clan_tag, &month, day);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        // Write to a temp file then rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(war)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(clan_tag, month, day, "cached finished war");
        Ok(())
    }

    async fn rounds_for_month(
        &self,
        clan_tag: &str,
        month: &str,
    ) -> Result<BTreeMap<u8, WarRound>, WarCacheError> {
        let mut rounds = BTreeMap::new();
        for day in 1..=ROUNDS_PER_SEASON {
            if let Some(war) = self.load_round(clan_tag, month, day).await? {
                rounds.insert(day, war);
            }
        }
        Ok(rounds)
    }

    async fn list_months(&self, clan_tag: &str) -> Result<Vec<String>, WarCacheError> {
        let dir = self.clan_dir(clan_tag);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut months = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_valid_month_key(&name) {
                months.push(name);
            }
        }
        months.sort();
        months.reverse();
        Ok(months)
    }
}

/// In-memory cache for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryWarCache {
    rounds: RwLock<BTreeMap<(String, String, u8), WarRound>>,
}

impl InMemoryWarCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(clan_tag: &str, month: &str, day: u8) -> (String, String, u8) {
        (tag_path_segment(clan_tag), month.to_string(), day)
    }
}

#[async_trait]
impl WarCache for InMemoryWarCache {
    async fn load_round(
        &self,
        clan_tag: &str,
        month: &str,
        day: u8,
    ) -> Result<Option<WarRound>, WarCacheError> {
        let rounds = self.rounds.read().await;
        Ok(rounds.get(&Self::key(clan_tag, month, day)).cloned())
    }

    async fn save_round(
        &self,
        war: &WarRound,
        clan_tag: &str,
        round_index: usize,
    ) -> Result<(), WarCacheError> {
        if !war.is_finished() {
            return Ok(());
        }
        let Some(month) = war.end_month_key() else {
            return Ok(());
        };
        let day = u8::try_from(round_index + 1).unwrap_or(u8::MAX);
        let mut rounds = self.rounds.write().await;
        rounds.insert(Self::key(clan_tag, &month, day), war.clone());
        Ok(())
    }

    async fn rounds_for_month(
        &self,
        clan_tag: &str,
        month: &str,
    ) -> Result<BTreeMap<u8, WarRound>, WarCacheError> {
        let clan = tag_path_segment(clan_tag);
        let rounds = self.rounds.read().await;
        Ok(rounds
            .iter()
            .filter(|((c, m, _), _)| *c == clan && m == month)
            .map(|((_, _, day), war)| (*day, war.clone()))
            .collect())
    }

    async fn list_months(&self, clan_tag: &str) -> Result<Vec<String>, WarCacheError> {
        let clan = tag_path_segment(clan_tag);
        let rounds = self.rounds.read().await;
        let mut months: Vec<String> = rounds
            .keys()
            .filter(|(c, _, _)| *c == clan)
            .map(|(_, m, _)| m.clone())
            .collect();
        months.sort();
        months.dedup();
        months.reverse();
        Ok(months)
    }
}
