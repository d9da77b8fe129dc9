use std::time::Duration;

use serde::Deserialize;

use super::{ContentProvider, Puzzle};
use crate::error::ExitError;
use crate::event::Message;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches one puzzle per request from a JSON endpoint.
pub struct RemoteProvider {
    url: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct RemotePuzzle {
    #[serde(alias = "img", alias = "pic")]
    image: String,
    #[serde(alias = "key")]
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteResponse {
    Wrapped { data: RemotePuzzle },
    Flat(RemotePuzzle),
}

impl RemoteProvider {
    pub fn new(url: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            url: url.to_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

/// Accepts `{answer, image}` or the same object under `data`.
fn parse_puzzle(body: &str) -> anyhow::Result<Puzzle> {
    let response: RemoteResponse = serde_json::from_str(body)
        .map_err(|e| ExitError::provider("remote", format!("unexpected response: {e}")))?;
    let remote = match response {
        RemoteResponse::Wrapped { data } => data,
        RemoteResponse::Flat(puzzle) => puzzle,
    };
    let answer = remote.answer.trim();
    if answer.is_empty() || remote.image.trim().is_empty() {
        return Err(ExitError::provider("remote", "response has an empty answer or image").into());
    }
    Ok(Puzzle {
        prompt: Message::new().with_image(remote.image.trim()),
        answer: answer.to_string(),
    })
}

impl ContentProvider for RemoteProvider {
    fn name(&self) -> &str {
        "remote"
    }

    fn next(&self) -> anyhow::Result<Puzzle> {
        let body = self
            .agent
            .get(&self.url)
            .call()
            .and_then(|resp| resp.into_body().read_to_string())
            .map_err(|e| ExitError::provider(self.name(), format!("GET {}: {e}", self.url)))?;
        let puzzle = parse_puzzle(&body)?;
        tracing::debug!(url = %self.url, "fetched remote puzzle");
        Ok(puzzle)
    }
}
