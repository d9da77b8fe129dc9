use std::io::BufRead;
use std::sync::Arc;
use std::sync::mpsc::{Sender, channel};
use std::time::Duration;

use anyhow::Context;
use clap::Args;

use crate::bus::EventBus;
use crate::config::Config;
use crate::console::{ConsoleRouter, parse_line};
use crate::lock::ChannelLockTable;
use crate::provider::ChainProvider;
use crate::session::{Outcome, SessionEngine};
use crate::template::Messages;
use crate::transport::WriterTransport;

#[derive(Debug, Args)]
pub struct PlayArgs {
    /// Seconds players get per puzzle (overrides idioms.timeout_secs)
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

enum Input {
    Line(String),
    Eof,
    Interrupt,
}

fn spawn_stdin_reader(tx: Sender<Input>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!("reading stdin failed: {e}");
                    break;
                }
            }
        }
        let _ = tx.send(Input::Eof);
    });
}

impl PlayArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let timeout = self
            .timeout
            .map_or_else(|| config.idioms.timeout(), Duration::from_secs);
        if timeout.is_zero() {
            anyhow::bail!("--timeout must be positive");
        }

        let image_dir = &config.idioms.image_dir;
        std::fs::create_dir_all(image_dir)
            .with_context(|| format!("creating picture directory {}", image_dir.display()))?;

        let bus = EventBus::new();
        let provider = ChainProvider::from_config(&config.idioms);
        tracing::info!(sources = ?provider.names(), timeout_secs = timeout.as_secs(), "starting console game");
        let engine = SessionEngine::new(
            ChannelLockTable::new(),
            Arc::clone(&bus),
            Arc::new(provider),
            Arc::new(WriterTransport::stdout()),
        )
        .with_timeout(timeout)
        .with_messages(Messages::new(&config.messages, &config.bot.nickname)?);
        let mut router = ConsoleRouter::new(engine, Arc::clone(&bus), &config.bot.trigger);

        let (tx, rx) = channel();
        let interrupt = tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            let _ = interrupt.send(Input::Interrupt);
        }) {
            tracing::warn!("could not install Ctrl-C handler: {e}");
        }
        spawn_stdin_reader(tx);

        while let Ok(input) = rx.recv() {
            match input {
                Input::Line(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_line(&line) {
                        Some(event) => {
                            let routed = router.handle(&event);
                            tracing::debug!(?routed, channel = %event.channel, sender = %event.sender, "routed line");
                        }
                        None => tracing::warn!(line = %line, "expected `<channel> <user> <text>`"),
                    }
                }
                Input::Eof => break,
                Input::Interrupt => {
                    tracing::info!("interrupted, ending running sessions");
                    break;
                }
            }
        }

        let outcomes = router.shutdown();
        let solved = outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Solved { .. }))
            .count();
        tracing::info!(sessions = outcomes.len(), solved, "console game finished");
        Ok(())
    }
}
