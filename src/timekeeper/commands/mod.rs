//! Command services behind the bot's prefix commands.
//!
//! Each command gets a small service trait with one implementation wired to
//! the stores and the Discord connector. User mistakes (missing permission,
//! unconfigured guild, unknown member, bad input) are reported back as
//! replies; only infrastructure failures bubble up as errors.

use crate::timekeeper::connectors::discord;
use crate::timekeeper::store;
use thiserror::Error;

pub mod grant;
pub mod panel;
pub mod ranking;
pub mod tempo;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Something went wrong with Discord")]
    Discord(#[from] discord::Error),
    #[error("Something went wrong with the data files")]
    Store(#[from] store::Error),
}

/// Reply sent when a non-administrator invokes an administrative command.
pub(crate) const PERMISSION_DENIED_REPLY: &str =
    "You do not have permission to use this command.";

/// Renders a second total as `XhYmZs`, the shape all time reports use.
pub(crate) fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_renders_zero() {
        assert_eq!(format_duration(0.0), "0h 0m 0s");
    }

    #[test]
    fn format_duration_splits_minutes_and_seconds() {
        assert_eq!(format_duration(125.0), "0h 2m 5s");
    }

    #[test]
    fn format_duration_splits_hours() {
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
    }

    #[test]
    fn format_duration_truncates_fractional_seconds() {
        assert_eq!(format_duration(59.9), "0h 0m 59s");
    }

    #[test]
    fn format_duration_clamps_negative_input() {
        assert_eq!(format_duration(-10.0), "0h 0m 0s");
    }
}
