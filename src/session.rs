//! One guessing round: lock, puzzle, announce, decide, release.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::bus::{Decision, EventBus, Subscription, WaitError};
use crate::event::{ChannelId, Conversation, GuessEvent, Message, UserId};
use crate::lock::{ChannelGuard, ChannelLockTable};
use crate::provider::ContentProvider;
use crate::template::{Messages, Reply, ReplyContext};
use crate::transport::Transport;

/// Owner messages that give up the round.
pub const CANCEL_WORDS: &[&str] = &["算啦", "算了", "cancel", "取消", "不知道"];

/// How long players get after the puzzle is announced.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub fn is_cancel_word(text: &str) -> bool {
    CANCEL_WORDS.contains(&text.trim())
}

/// Terminal result of [`SessionEngine::start`]. Produced exactly once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Another round is running in this channel.
    Busy,
    ProviderFailed,
    Solved { solver: UserId },
    Cancelled,
    TimedOut,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "busy"),
            Self::ProviderFailed => write!(f, "provider-failed"),
            Self::Solved { solver } => write!(f, "solved by {solver}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TimedOut => write!(f, "timed-out"),
        }
    }
}

/// State of a round between announcement and its terminal outcome.
#[derive(Debug)]
struct Session {
    conversation: Conversation,
    owner: UserId,
    answer: String,
    started_at: DateTime<Utc>,
    deadline: Instant,
}

impl Session {
    /// Which events this round wants and which it keeps from everyone else.
    ///
    /// Direct rounds take every direct message from the owner. Group rounds
    /// observe the whole channel but only swallow the owner giving up or a
    /// correct answer, so ordinary chatter still reaches other handlers.
    fn filter(&self) -> impl Fn(&GuessEvent) -> Decision + Send + 'static {
        let channel = self.conversation.channel;
        let owner = self.owner;
        let answer = self.answer.clone();
        move |event: &GuessEvent| {
            if channel.is_direct() {
                if event.channel.is_direct() && event.sender == owner {
                    Decision::CONSUME
                } else {
                    Decision::IGNORE
                }
            } else if event.channel == channel {
                let guess = event.guess();
                if (event.sender == owner && is_cancel_word(guess)) || guess == answer {
                    Decision::CONSUME
                } else {
                    Decision::OBSERVE
                }
            } else {
                Decision::IGNORE
            }
        }
    }
}

/// Runs guessing rounds. Cheap to clone; clones share the lock table and bus.
#[derive(Clone)]
pub struct SessionEngine {
    locks: Arc<ChannelLockTable>,
    bus: Arc<EventBus>,
    provider: Arc<dyn ContentProvider>,
    transport: Arc<dyn Transport>,
    messages: Arc<Messages>,
    timeout: Duration,
}

impl SessionEngine {
    pub fn new(
        locks: Arc<ChannelLockTable>,
        bus: Arc<EventBus>,
        provider: Arc<dyn ContentProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            locks,
            bus,
            provider,
            transport,
            messages: Arc::new(Messages::default()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = Arc::new(messages);
        self
    }

    /// Play one round in `channel`, started by `owner`. Blocks until the
    /// round reaches a terminal outcome.
    ///
    /// Group channels are locked for the whole round; the lock is released on
    /// every return path, and on unwind.
    pub fn start(&self, channel: ChannelId, owner: UserId) -> Outcome {
        let span = tracing::info_span!("session", channel = %channel, owner = %owner);
        let _span = span.enter();

        let conversation = Conversation { channel, peer: owner };
        let _guard: Option<ChannelGuard> = if channel.is_direct() {
            None
        } else if let Some(guard) = self.locks.try_lock(channel) {
            Some(guard)
        } else {
            tracing::info!("channel busy, rejecting start");
            self.reply(&conversation, Reply::Busy, ReplyContext::new(owner), None);
            return Outcome::Busy;
        };

        let puzzle = match self.provider.next() {
            Ok(puzzle) => puzzle,
            Err(e) => {
                tracing::error!(source = self.provider.name(), "getting puzzle failed: {e:#}");
                self.reply(&conversation, Reply::Failed, ReplyContext::new(owner), Some(owner));
                return Outcome::ProviderFailed;
            }
        };

        let announce = self.render(Reply::Announce, ReplyContext::new(owner));
        self.send(
            &conversation,
            &Message::mention(owner).with_text(announce).append(puzzle.prompt),
        );
        let session = Session {
            conversation,
            owner,
            answer: puzzle.answer,
            started_at: Utc::now(),
            deadline: Instant::now() + self.timeout,
        };
        tracing::info!(answer = %session.answer, "puzzle announced");

        let mut subscription = self.bus.subscribe(session.filter());
        let outcome = self.decide(&session, &subscription);
        subscription.cancel();

        let elapsed = Utc::now() - session.started_at;
        tracing::info!(%outcome, elapsed_secs = elapsed.num_seconds(), "session finished");
        outcome
    }

    fn decide(&self, session: &Session, subscription: &Subscription) -> Outcome {
        let owner = session.owner;
        let answer = session.answer.as_str();
        loop {
            let event = match subscription.recv_until(session.deadline) {
                Ok(event) => event,
                Err(wait) => {
                    if wait == WaitError::Closed {
                        tracing::warn!("event source closed, revealing answer");
                    }
                    let ctx = ReplyContext::new(owner).answer(answer);
                    self.reply(&session.conversation, Reply::Timeout, ctx, Some(owner));
                    return Outcome::TimedOut;
                }
            };

            let guess = event.guess();
            if event.sender == owner && is_cancel_word(guess) {
                let ctx = ReplyContext::new(owner).answer(answer);
                self.reply(&session.conversation, Reply::Cancelled, ctx, Some(event.sender));
                return Outcome::Cancelled;
            }
            if guess == answer {
                let ctx = ReplyContext::new(owner).answer(answer).solver(event.sender);
                self.reply(&session.conversation, Reply::Solved, ctx, Some(event.sender));
                return Outcome::Solved {
                    solver: event.sender,
                };
            }

            tracing::debug!(sender = %event.sender, guess, "wrong guess");
            // Groups stay quiet on misses; a busy channel would drown in replies.
            if session.conversation.channel.is_direct() {
                self.reply(&session.conversation, Reply::Wrong, ReplyContext::new(owner), None);
            }
        }
    }

    fn render(&self, reply: Reply, ctx: ReplyContext<'_>) -> String {
        self.messages.render(reply, ctx)
    }

    fn reply(
        &self,
        to: &Conversation,
        reply: Reply,
        ctx: ReplyContext<'_>,
        mention: Option<UserId>,
    ) {
        let text = self.render(reply, ctx);
        let message = match mention {
            Some(user) => Message::mention(user).with_text(text),
            None => Message::text(text),
        };
        self.send(to, &message);
    }

    /// Best effort: a failed send never changes the round's outcome.
    fn send(&self, to: &Conversation, message: &Message) {
        if let Err(e) = self.transport.send(to, message) {
            tracing::warn!(channel = %to.channel, "sending message failed: {e:#}");
        }
    }
}
