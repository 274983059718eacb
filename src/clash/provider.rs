use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::clash::errors::ClashApiError;
use crate::clash::models::{LeagueGroup, WarRound};
use crate::clash::tags::normalize_tag;

pub const DEFAULT_BASE_URL: &str = "https://api.clashofclans.com/v1";

/// Source of live war data. Production uses [`CocClient`]; tests script one.
#[async_trait]
pub trait WarDataProvider: Send + Sync {
    /// Current league group for a clan. Returns [`ClashApiError::NotFound`]
    /// when the clan is not in a league and has no league history.
    async fn league_group(&self, clan_tag: &str) -> Result<LeagueGroup, ClashApiError>;

    async fn war_by_tag(&self, war_tag: &str) -> Result<WarRound, ClashApiError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: Option<String>,
    message: Option<String>,
}

/// Clash of Clans REST client with bearer-token auth.
pub struct CocClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl CocClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Configure from `COC_API_TOKEN` and (optionally) `COC_API_BASE_URL`.
    pub fn from_env() -> Result<Self, ClashApiError> {
        let token = std::env::var("COC_API_TOKEN").map_err(|_| ClashApiError::MissingToken)?;
        let base_url =
            std::env::var("COC_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url, token))
    }

    fn checked_tag(input: &str) -> Result<String, ClashApiError> {
        let tag = normalize_tag(input);
        if tag.is_empty() || tag == "#" {
            return Err(ClashApiError::InvalidTag(input.to_string()));
        }
        Ok(tag)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClashApiError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClashApiError::NotFound);
        }
        if !status.is_success() {
            let message = match res.json::<ApiErrorBody>().await {
                Ok(body) => body
                    .message
                    .or(body.reason)
                    .unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(ClashApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl WarDataProvider for CocClient {
    async fn league_group(&self, clan_tag: &str) -> Result<LeagueGroup, ClashApiError> {
        let tag = Self::checked_tag(clan_tag)?;
        self.get_json(&format!(
            "/clans/{}/currentwar/leaguegroup",
            encode_tag(&tag)
        ))
        .await
    }

    async fn war_by_tag(&self, war_tag: &str) -> Result<WarRound, ClashApiError> {
        let tag = Self::checked_tag(war_tag)?;
        self.get_json(&format!("/clanwarleagues/wars/{}", encode_tag(&tag)))
            .await
    }
}

// Tags are the only path segment needing escaping; `#` -> `%23`.
fn encode_tag(tag: &str) -> String {
    tag.replace('#', "%23")
}
