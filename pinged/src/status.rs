//! User-visible feedback line.

use std::time::Duration;

use log::info;
use web_time::SystemTime;

const DEFAULT_DURATION: Duration = Duration::from_millis(1800);

/// Message shown in the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Text of the message.
    pub message: String,
    /// Time the message was first posted.
    pub posted_at: SystemTime,
    /// Time the message disappears.
    pub expires_at: SystemTime,
}

/// Short-lived feedback line shared by all components of the map.
///
/// A new message replaces the current one. Posting the message that is already shown only
/// extends its display time, so a burst of identical events produces a single visible change.
#[derive(Debug, Clone)]
pub struct StatusChannel {
    duration: Duration,
    current: Option<StatusLine>,
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

impl StatusChannel {
    /// Creates a channel that shows each message for `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            current: None,
        }
    }

    /// How long messages are shown.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Shows a message. Returns `true` if the visible text changed.
    pub fn post(&mut self, message: impl Into<String>, now: SystemTime) -> bool {
        let message = message.into();
        let expires_at = now + self.duration;

        if let Some(current) = &mut self.current {
            if current.message == message && current.expires_at > now {
                current.expires_at = expires_at;
                return false;
            }
        }

        info!("Status: {message}");
        self.current = Some(StatusLine {
            message,
            posted_at: now,
            expires_at,
        });
        true
    }

    /// Message visible at the given time.
    pub fn visible(&self, now: SystemTime) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|line| line.expires_at > now)
            .map(|line| line.message.as_str())
    }

    /// The last posted message, even if it has already expired.
    pub fn last(&self) -> Option<&StatusLine> {
        self.current.as_ref()
    }

    /// Hides the current message.
    pub fn clear(&mut self) {
        self.current = None;
    }
}
