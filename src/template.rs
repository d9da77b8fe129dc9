//! Reply texts rendered from the `[messages]` templates.

use minijinja::Environment;
use serde::Serialize;

use crate::config::MessagesConfig;
use crate::error::ExitError;
use crate::event::UserId;

/// Which reply to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Busy,
    Failed,
    Announce,
    Solved,
    Cancelled,
    Timeout,
    Wrong,
}

impl Reply {
    pub const ALL: [Self; 7] = [
        Self::Busy,
        Self::Failed,
        Self::Announce,
        Self::Solved,
        Self::Cancelled,
        Self::Timeout,
        Self::Wrong,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Failed => "failed",
            Self::Announce => "announce",
            Self::Solved => "solved",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::Wrong => "wrong",
        }
    }
}

/// Variables visible to every template.
#[derive(Debug, Default, Serialize)]
pub struct ReplyContext<'a> {
    pub answer: Option<&'a str>,
    pub owner: Option<i64>,
    pub solver: Option<i64>,
    pub nickname: &'a str,
}

impl<'a> ReplyContext<'a> {
    pub const fn new(owner: UserId) -> Self {
        Self {
            answer: None,
            owner: Some(owner.0),
            solver: None,
            nickname: "",
        }
    }

    #[must_use]
    pub const fn answer(mut self, answer: &'a str) -> Self {
        self.answer = Some(answer);
        self
    }

    #[must_use]
    pub const fn solver(mut self, solver: UserId) -> Self {
        self.solver = Some(solver.0);
        self
    }
}

/// Reply templates, parsed once at construction and looked up by name.
#[derive(Debug)]
pub struct Messages {
    env: Environment<'static>,
    sources: MessagesConfig,
    nickname: String,
}

fn source_of(sources: &MessagesConfig, reply: Reply) -> &str {
    match reply {
        Reply::Busy => &sources.busy,
        Reply::Failed => &sources.failed,
        Reply::Announce => &sources.announce,
        Reply::Solved => &sources.solved,
        Reply::Cancelled => &sources.cancelled,
        Reply::Timeout => &sources.timeout,
        Reply::Wrong => &sources.wrong,
    }
}

impl Messages {
    /// Build the renderer, rejecting templates that don't parse.
    pub fn new(sources: &MessagesConfig, nickname: &str) -> anyhow::Result<Self> {
        let mut env = Environment::new();
        for reply in Reply::ALL {
            env.add_template_owned(reply.as_str(), source_of(sources, reply).to_string())
                .map_err(|e| {
                    ExitError::Config(format!("invalid messages.{} template: {e}", reply.as_str()))
                })?;
        }
        Ok(Self {
            env,
            sources: sources.clone(),
            nickname: nickname.to_string(),
        })
    }

    /// Render `reply`. A runtime render error falls back to the raw template.
    pub fn render(&self, reply: Reply, ctx: ReplyContext<'_>) -> String {
        let ctx = ReplyContext {
            nickname: &self.nickname,
            ..ctx
        };
        let rendered = self
            .env
            .get_template(reply.as_str())
            .and_then(|template| template.render(ctx));
        match rendered {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(reply = reply.as_str(), "rendering reply failed: {e}");
                source_of(&self.sources, reply).to_string()
            }
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::new(&MessagesConfig::default(), "").unwrap_or_else(|e| {
            tracing::error!("built-in reply templates are invalid: {e:#}");
            Self {
                env: Environment::new(),
                sources: MessagesConfig::default(),
                nickname: String::new(),
            }
        })
    }
}
