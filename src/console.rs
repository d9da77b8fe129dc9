//! Line-oriented stand-in for a chat connection.
//!
//! Each input line is `<channel> <user> <text>`; channel 0 is a direct
//! message. Lines go through the bus first so running rounds see them; a line
//! nobody consumed that equals the trigger word starts a new round.

use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use regex::Regex;

use crate::bus::EventBus;
use crate::event::{ChannelId, GuessEvent, UserId};
use crate::session::{Outcome, SessionEngine};

fn re_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(-?\d+)\s+(-?\d+)\s+(.*?)\s*$").unwrap())
}

/// Parse `<channel> <user> <text>`. None for blank or malformed lines.
pub fn parse_line(line: &str) -> Option<GuessEvent> {
    let caps = re_line().captures(line)?;
    let channel = caps[1].parse().ok()?;
    let user = caps[2].parse().ok()?;
    let text = &caps[3];
    if text.is_empty() {
        return None;
    }
    Some(GuessEvent::new(ChannelId(channel), UserId(user), text))
}

/// What happened to one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// A running round swallowed it.
    Consumed,
    /// It was the trigger word; a round was started on its own thread.
    Started,
    Ignored,
}

/// Feeds events to the bus and owns the threads of running rounds.
pub struct ConsoleRouter {
    engine: SessionEngine,
    bus: Arc<EventBus>,
    trigger: String,
    rounds: Vec<JoinHandle<Outcome>>,
    finished: Vec<Outcome>,
}

impl ConsoleRouter {
    pub fn new(engine: SessionEngine, bus: Arc<EventBus>, trigger: &str) -> Self {
        Self {
            engine,
            bus,
            trigger: trigger.trim().to_string(),
            rounds: Vec::new(),
            finished: Vec::new(),
        }
    }

    pub fn handle(&mut self, event: &GuessEvent) -> Routed {
        self.reap();
        let delivery = self.bus.publish(event);
        tracing::trace!(delivered = delivery.delivered, consumed = delivery.consumed, "published");
        if delivery.consumed {
            return Routed::Consumed;
        }
        if event.guess() != self.trigger {
            return Routed::Ignored;
        }
        let engine = self.engine.clone();
        let (channel, owner) = (event.channel, event.sender);
        tracing::debug!(%channel, %owner, "trigger received");
        self.rounds
            .push(std::thread::spawn(move || engine.start(channel, owner)));
        Routed::Started
    }

    pub fn running(&self) -> usize {
        self.rounds.iter().filter(|h| !h.is_finished()).count()
    }

    /// Close the bus so every running round ends, then wait for all of them.
    pub fn shutdown(mut self) -> Vec<Outcome> {
        self.bus.close();
        for handle in self.rounds.drain(..) {
            collect(handle, &mut self.finished);
        }
        self.finished
    }

    fn reap(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) =
            self.rounds.drain(..).partition(JoinHandle::is_finished);
        self.rounds = running;
        for handle in done {
            collect(handle, &mut self.finished);
        }
    }
}

fn collect(handle: JoinHandle<Outcome>, into: &mut Vec<Outcome>) {
    match handle.join() {
        Ok(outcome) => into.push(outcome),
        Err(_) => tracing::error!("session thread panicked"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::event::{Conversation, Message};
    use crate::lock::ChannelLockTable;
    use crate::provider::{ContentProvider, Puzzle};
    use crate::transport::Transport;

    #[test]
    fn parse_group_line() {
        let e = parse_line("55 1 猜成语").unwrap();
        assert_eq!(e.channel, ChannelId(55));
        assert_eq!(e.sender, UserId(1));
        assert_eq!(e.text, "猜成语");
    }

    #[test]
    fn parse_keeps_inner_spaces() {
        let e = parse_line("  0 7   hello  world  ").unwrap();
        assert!(e.channel.is_direct());
        assert_eq!(e.text, "hello  world");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(parse_line("").is_none());
        assert!(parse_line("55 1").is_none());
        assert!(parse_line("55 1   ").is_none());
        assert!(parse_line("abc 1 hi").is_none());
        assert!(parse_line("99999999999999999999 1 hi").is_none());
    }

    struct One;

    impl ContentProvider for One {
        fn name(&self) -> &str {
            "one"
        }

        fn next(&self) -> anyhow::Result<Puzzle> {
            Ok(Puzzle {
                prompt: Message::text("?"),
                answer: "一帆风顺".into(),
            })
        }
    }

    struct Quiet;

    impl Transport for Quiet {
        fn send(&self, _: &Conversation, _: &Message) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn router() -> (ConsoleRouter, Arc<EventBus>) {
        let bus = EventBus::new();
        let engine = SessionEngine::new(
            ChannelLockTable::new(),
            Arc::clone(&bus),
            Arc::new(One),
            Arc::new(Quiet),
        );
        (ConsoleRouter::new(engine, Arc::clone(&bus), "猜成语"), bus)
    }

    fn wait_for_subscribers(bus: &EventBus, n: usize) {
        let start = Instant::now();
        while bus.subscriber_count() < n {
            assert!(start.elapsed() < Duration::from_secs(5));
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn trigger_starts_and_answer_consumes() {
        let (mut router, bus) = router();
        assert_eq!(router.handle(&parse_line("55 1 hello").unwrap()), Routed::Ignored);
        assert_eq!(router.handle(&parse_line("55 1 猜成语").unwrap()), Routed::Started);
        wait_for_subscribers(&bus, 1);
        assert_eq!(router.running(), 1);
        assert_eq!(router.handle(&parse_line("55 2 nope").unwrap()), Routed::Ignored);
        assert_eq!(router.handle(&parse_line("55 2 一帆风顺").unwrap()), Routed::Consumed);
        let outcomes = router.shutdown();
        assert_eq!(outcomes, vec![Outcome::Solved { solver: UserId(2) }]);
    }

    #[test]
    fn shutdown_ends_running_rounds() {
        let (mut router, bus) = router();
        router.handle(&parse_line("0 1 猜成语").unwrap());
        router.handle(&parse_line("8 2 猜成语").unwrap());
        wait_for_subscribers(&bus, 2);
        let mut outcomes = router.shutdown();
        outcomes.dedup();
        assert_eq!(outcomes, vec![Outcome::TimedOut]);
    }

    #[test]
    fn trigger_in_busy_channel_reports_busy() {
        let (mut router, bus) = router();
        router.handle(&parse_line("9 1 猜成语").unwrap());
        wait_for_subscribers(&bus, 1);
        assert_eq!(router.handle(&parse_line("9 2 猜成语").unwrap()), Routed::Started);
        let start = Instant::now();
        while router.running() > 1 {
            assert!(start.elapsed() < Duration::from_secs(5));
            std::thread::sleep(Duration::from_millis(2));
        }
        let outcomes = router.shutdown();
        assert!(outcomes.contains(&Outcome::Busy));
        assert!(outcomes.contains(&Outcome::TimedOut));
    }
}
