//! HTTP/1 JSON client for the score backend.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;

use crate::api::{
    ApiError, LeaderboardEntry, LeaderboardPage, LeaderboardService, PersonalBest, ScoreService,
    SubmitOutcome,
};
use crate::config::ApiSettings;
use crate::session::FinalScore;

const SCORE_PATH: &str = "/tetris/score";
const LEADERBOARD_PATH: &str = "/tetris/leaderboard";
const OWN_SCORE_PATH: &str = "/tetris/user/score";

#[derive(Clone)]
pub struct HttpApiClient {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpApiClient {
    pub fn new(settings: &ApiSettings, token: Option<String>) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token,
            timeout: settings.timeout(),
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn uri(&self, path_and_query: &str) -> Result<Uri, ApiError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        url.parse::<Uri>().map_err(|_| ApiError::InvalidUrl(url))
    }

    async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        token: Option<&str>,
        body: Vec<u8>,
    ) -> Result<Bytes, ApiError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(self.uri(path_and_query)?)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = tokio::time::timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(|e| ApiError::Transport(e.to_string()))?
            .to_bytes();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let bytes = self
            .send(Method::GET, path_and_query, token, Vec::new())
            .await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ScoreService for HttpApiClient {
    async fn submit(&self, score: FinalScore) -> Result<Option<SubmitOutcome>, ApiError> {
        let Some(token) = self.token.as_deref() else {
            return Ok(None);
        };
        let body = serde_json::to_vec(&score)?;
        let bytes = self.send(Method::POST, SCORE_PATH, Some(token), body).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

impl LeaderboardService for HttpApiClient {
    async fn fetch_top(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let page: LeaderboardPage = self
            .get_json(&format!("{LEADERBOARD_PATH}?limit={limit}"), None)
            .await?;
        Ok(page.leaderboard)
    }

    async fn fetch_own_best(&self) -> Result<Option<PersonalBest>, ApiError> {
        let Some(token) = self.token.as_deref() else {
            return Ok(None);
        };
        self.get_json(OWN_SCORE_PATH, Some(token)).await.map(Some)
    }
}
