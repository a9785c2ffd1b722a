use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;

use crate::models::{CapturedFrame, FrameObservation};

use super::{ClassifierResponse, EmotionClassifier};

/// Client for the detection backend (`POST /api/detect`, `GET /api/health`).
pub struct HttpClassifier {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpClassifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl EmotionClassifier for HttpClassifier {
    fn classify(&self, frame: &CapturedFrame) -> Result<FrameObservation> {
        let body = json!({ "image": STANDARD.encode(&frame.jpeg) });

        let reply: ClassifierResponse = self
            .agent
            .post(&self.url("/api/detect"))
            .send_json(body)
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => anyhow!("classifier returned status {code}"),
                ureq::Error::Transport(t) => anyhow!("classifier unreachable: {t}"),
            })?
            .into_json()
            .context("invalid classifier reply")?;

        Ok(reply.into_observation(frame))
    }

    fn is_healthy(&self) -> bool {
        match self.agent.get(&self.url("/api/health")).call() {
            Ok(resp) => resp.status() == 200,
            Err(_) => false,
        }
    }
}
