//! Contracts for the score and leaderboard backend.
//!
//! The engine only ever talks to these traits; `http_client` provides the
//! HTTP implementation and tests substitute in-memory fakes.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::session::FinalScore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub is_new_high_score: bool,
    /// Present when the score was stored.
    #[serde(default)]
    pub rank: Option<u32>,
    /// Present when an older, higher score was kept.
    #[serde(default)]
    pub current_high_score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub nickname: String,
    pub score: u32,
    #[serde(default)]
    pub lines: u32,
    #[serde(default)]
    pub level: u32,
}

impl LeaderboardEntry {
    /// Nickname, falling back to the account name.
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    /// The backend sends `null` for an empty board.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalBest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub nickname: String,
    pub high_score: u32,
    pub has_record: bool,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub lines: Option<u32>,
    #[serde(default)]
    pub level: Option<u32>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<LeaderboardEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<LeaderboardEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug)]
pub enum ApiError {
    InvalidUrl(String),
    Transport(String),
    Timeout,
    /// The token was rejected; callers should forget it.
    Unauthorized,
    Status { code: u16, body: String },
    Decode(serde_json::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidUrl(url) => write!(f, "invalid api url: {url}"),
            ApiError::Transport(msg) => write!(f, "request failed: {msg}"),
            ApiError::Timeout => write!(f, "request timed out"),
            ApiError::Unauthorized => write!(f, "token rejected by server"),
            ApiError::Status { code, body } => write!(f, "server returned {code}: {body}"),
            ApiError::Decode(err) => write!(f, "unexpected response body: {err}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

pub trait ScoreService: Send + Sync {
    /// `Ok(None)` when no token is available; nothing is sent.
    fn submit(
        &self,
        score: FinalScore,
    ) -> impl Future<Output = Result<Option<SubmitOutcome>, ApiError>> + Send;
}

pub trait LeaderboardService: Send + Sync {
    fn fetch_top(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, ApiError>> + Send;

    /// `Ok(None)` when no token is available.
    fn fetch_own_best(&self) -> impl Future<Output = Result<Option<PersonalBest>, ApiError>> + Send;
}
