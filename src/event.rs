use std::fmt;

use chrono::{DateTime, Utc};

/// Conversation context. `0` is reserved for direct (private) messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub i64);

impl ChannelId {
    pub const DIRECT: Self = Self(0);

    pub const fn is_direct(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An incoming chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessEvent {
    pub sender: UserId,
    pub channel: ChannelId,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl GuessEvent {
    pub fn new(channel: ChannelId, sender: UserId, text: impl Into<String>) -> Self {
        Self {
            sender,
            channel,
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    /// Message text with surrounding whitespace removed.
    pub fn guess(&self) -> &str {
        self.text.trim()
    }
}

/// Where replies go: a group channel, or the direct conversation with `peer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversation {
    pub channel: ChannelId,
    pub peer: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Mention(UserId),
    /// Local path or URL of a picture.
    Image(String),
}

/// Outgoing message, an ordered list of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub segments: Vec<Segment>,
}

impl Message {
    pub const fn new() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    pub fn mention(user: UserId) -> Self {
        Self::new().with_mention(user)
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Text(text.into()));
        self
    }

    #[must_use]
    pub fn with_mention(mut self, user: UserId) -> Self {
        self.segments.push(Segment::Mention(user));
        self
    }

    #[must_use]
    pub fn with_image(mut self, location: impl Into<String>) -> Self {
        self.segments.push(Segment::Image(location.into()));
        self
    }

    #[must_use]
    pub fn append(mut self, other: Self) -> Self {
        self.segments.extend(other.segments);
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => write!(f, "{t}")?,
                Segment::Mention(u) => write!(f, "@{u} ")?,
                Segment::Image(loc) => write!(f, "[image: {loc}]")?,
            }
        }
        Ok(())
    }
}
