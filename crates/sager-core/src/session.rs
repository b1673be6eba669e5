//! Process-wide session clock.

use serde::{Deserialize, Serialize};

/// Free-running counter advanced once per fixed interval.
///
/// Independent of any tracked drone; it only resets with the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClock {
    elapsed_ticks: u64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one interval and return the new count.
    pub fn tick(&mut self) -> u64 {
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);
        self.elapsed_ticks
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn display(&self) -> String {
        format_elapsed(self.elapsed_ticks)
    }
}

/// Render seconds as `MM:SS`, or `HH:MM:SS` once an hour has passed.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}
