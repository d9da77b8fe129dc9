//! Puzzle sources: a (prompt, answer) pair on demand.

pub mod local;
pub mod remote;

use crate::config::IdiomsConfig;
use crate::error::ExitError;
use crate::event::Message;

pub use local::LocalProvider;
pub use remote::RemoteProvider;

/// One round's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    /// What gets shown to players, usually a single picture.
    pub prompt: Message,
    pub answer: String,
}

pub trait ContentProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn next(&self) -> anyhow::Result<Puzzle>;
}

/// Tries each source in order and returns the first puzzle produced.
pub struct ChainProvider {
    providers: Vec<Box<dyn ContentProvider>>,
}

impl ChainProvider {
    pub fn new(providers: Vec<Box<dyn ContentProvider>>) -> Self {
        Self { providers }
    }

    /// Local pool and, when configured, the remote endpoint; `local_first` picks the order.
    pub fn from_config(config: &IdiomsConfig) -> Self {
        let local: Box<dyn ContentProvider> = Box::new(LocalProvider::new(&config.image_dir));
        let remote = config
            .remote_url
            .as_deref()
            .map(|url| Box::new(RemoteProvider::new(url)) as Box<dyn ContentProvider>);

        let providers = match remote {
            Some(remote) if config.local_first => vec![local, remote],
            Some(remote) => vec![remote, local],
            None => vec![local],
        };
        Self::new(providers)
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl ContentProvider for ChainProvider {
    fn name(&self) -> &str {
        "chain"
    }

    fn next(&self) -> anyhow::Result<Puzzle> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.next() {
                Ok(puzzle) => return Ok(puzzle),
                Err(e) => {
                    tracing::warn!(source = provider.name(), "puzzle source failed: {e:#}");
                    failures.push(format!("{}: {e}", provider.name()));
                }
            }
        }
        if failures.is_empty() {
            failures.push("no sources configured".to_string());
        }
        Err(ExitError::provider(self.name(), failures.join("; ")).into())
    }
}
