use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::models::LeaderboardEntry;

use super::LeaderboardService;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    leaderboard: Vec<LeaderboardEntry>,
}

/// Client for the backend's `/api/leaderboard` endpoint.
#[derive(Debug, Clone)]
pub struct HttpLeaderboard {
    base_url: String,
    timeout: Duration,
}

impl HttpLeaderboard {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/leaderboard", self.base_url)
    }
}

fn request_error(err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, _) => anyhow!("leaderboard returned status {code}"),
        ureq::Error::Transport(t) => anyhow!("leaderboard unreachable: {t}"),
    }
}

impl LeaderboardService for HttpLeaderboard {
    fn top_entries(&self) -> Result<Vec<LeaderboardEntry>> {
        ureq::get(&self.endpoint())
            .timeout(self.timeout)
            .call()
            .map_err(request_error)?
            .into_json()
            .context("invalid leaderboard payload")
    }

    fn submit(&self, entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>> {
        let response: SubmitResponse = ureq::post(&self.endpoint())
            .timeout(self.timeout)
            .send_json(&entry)
            .map_err(request_error)?
            .into_json()
            .context("invalid leaderboard submission reply")?;

        if response.status != "ok" {
            return Err(anyhow!("leaderboard rejected entry: status {:?}", response.status));
        }
        Ok(response.leaderboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let client = HttpLeaderboard::new("http://kiosk.local:8000/");
        assert_eq!(client.endpoint(), "http://kiosk.local:8000/api/leaderboard");
    }

    #[test]
    fn submit_reply_parses_backend_shape() {
        let reply: SubmitResponse = serde_json::from_str(
            r#"{"status":"ok","leaderboard":[{"name":"ada","score":412,"rounds":5,"date":"2024-05-01T10:00:00"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.status, "ok");
        assert_eq!(reply.leaderboard[0].score, 412);
    }

    #[test]
    fn unreachable_backend_is_an_error() {
        let client = HttpLeaderboard::new("http://127.0.0.1:9").with_timeout(Duration::from_millis(200));
        assert!(client.top_entries().is_err());
    }
}
