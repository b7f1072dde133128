//! The single pending wake-up.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::TransitionKind;

/// Why the scheduler will wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "kind")]
pub enum WakeReason {
    /// A sunrise or effective sunset is due.
    Transition(TransitionKind),
    /// The previous apply failed and will be attempted again.
    Retry,
}

impl std::fmt::Display for WakeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WakeReason::Transition(kind) => write!(f, "{kind}"),
            WakeReason::Retry => f.write_str("retry"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledWake {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub reason: WakeReason,
    /// Incremented on every arm; identifies which schedule a wake belongs to.
    pub generation: u64,
}

/// Holds at most one [`ScheduledWake`]. Arming replaces whatever was there.
#[derive(Debug, Default)]
pub struct WakeSlot {
    current: Option<ScheduledWake>,
    generation: u64,
}

impl WakeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, at: DateTime<Utc>, reason: WakeReason) -> &ScheduledWake {
        self.generation += 1;
        self.current.insert(ScheduledWake {
            at,
            reason,
            generation: self.generation,
        })
    }

    pub fn cancel(&mut self) -> Option<ScheduledWake> {
        self.current.take()
    }

    pub fn peek(&self) -> Option<&ScheduledWake> {
        self.current.as_ref()
    }

    /// Remove and return the wake if it is due at `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<ScheduledWake> {
        if self.current.as_ref().is_some_and(|wake| wake.at <= now) {
            self.current.take()
        } else {
            None
        }
    }

    /// Time left until the wake, zero if overdue, `None` if nothing is armed.
    pub fn time_until(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        self.current
            .as_ref()
            .map(|wake| (wake.at - now).to_std().unwrap_or_default())
    }
}
