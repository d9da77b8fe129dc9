//! Outgoing side of the chat connection.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::error::ExitError;
use crate::event::{Conversation, Message};

pub trait Transport: Send + Sync {
    /// Deliver `message` to the conversation. Callers treat failures as best effort.
    fn send(&self, to: &Conversation, message: &Message) -> anyhow::Result<()>;
}

/// Writes each message as one line: `[<channel>/<peer>] <message>`.
pub struct WriterTransport<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterTransport<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WriterTransport<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

/// `55` for a group, `0/7` for the direct conversation with user 7.
pub fn conversation_label(to: &Conversation) -> String {
    if to.channel.is_direct() {
        format!("{}/{}", to.channel, to.peer)
    } else {
        to.channel.to_string()
    }
}

impl<W: Write + Send> Transport for WriterTransport<W> {
    fn send(&self, to: &Conversation, message: &Message) -> anyhow::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "[{}] {message}", conversation_label(to))
            .and_then(|()| out.flush())
            .map_err(|e| ExitError::Transport(e.to_string()).into())
    }
}
