//! Cumulative voice-presence accounting.
//!
//! Every member gets a [`VoiceRecord`] holding their flushed total plus the
//! start of the currently open session, if any. The invariant is that
//! `session_start` is `Some` exactly while the member sits in a voice channel
//! with accrued-but-unflushed time. The periodic reconciliation pass folds
//! open sessions into the totals so that a crash loses at most one interval
//! of accrued time.

use crate::timekeeper::store::{self, JsonStore};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One member's voice-time state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VoiceRecord {
    /// Total flushed voice time in seconds
    pub accumulated_seconds: f64,
    /// Start of the open session, `None` while the member is not connected
    pub session_start: Option<DateTime<Utc>>,
}

/// The persisted voice-time document: member id to record.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct VoiceLedger {
    records: HashMap<u64, VoiceRecord>,
}

impl VoiceLedger {
    /// Opens a session for the member, creating the record lazily.
    ///
    /// A join while a session is already open restarts the session; the
    /// matching leave was never observed, so the stale interval is dropped.
    pub fn note_join(&mut self, member_id: u64, now: DateTime<Utc>) {
        let record = self.records.entry(member_id).or_default();
        record.session_start = Some(now);
    }

    /// Closes the member's session and folds it into the total.
    ///
    /// A leave without an open session accumulates nothing.
    pub fn note_leave(&mut self, member_id: u64, now: DateTime<Utc>) {
        let record = self.records.entry(member_id).or_default();
        if let Some(started) = record.session_start.take() {
            record.accumulated_seconds += session_seconds(started, now);
        }
    }

    /// Folds every connected member's open session into their total and
    /// restarts the session at `now`.
    ///
    /// A connected member without a record gets one lazily; a connected
    /// member whose join event was never observed has no open session and is
    /// left alone. Transfers time only, never adds or loses any.
    pub fn reconcile(&mut self, connected: &[u64], now: DateTime<Utc>) {
        for &member_id in connected {
            let record = self.records.entry(member_id).or_default();
            if let Some(started) = record.session_start {
                record.accumulated_seconds += session_seconds(started, now);
                record.session_start = Some(now);
            }
        }
    }

    /// Total voice time in seconds, including the open session's elapsed
    /// time. `None` when the member has never been observed in voice.
    pub fn total_seconds(&self, member_id: u64, now: DateTime<Utc>) -> Option<f64> {
        let record = self.records.get(&member_id)?;
        let open = record
            .session_start
            .map(|started| session_seconds(started, now))
            .unwrap_or(0.0);
        Some(record.accumulated_seconds + open)
    }

    /// All members ranked by flushed total, descending. Equal totals order by
    /// member id so ties render deterministically.
    pub fn standings(&self) -> Vec<(u64, f64)> {
        let mut entries: Vec<(u64, f64)> = self
            .records
            .iter()
            .map(|(member_id, record)| (*member_id, record.accumulated_seconds))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

/// Elapsed seconds of a session, clamped at zero against clock skew.
fn session_seconds(started: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - started).num_milliseconds() as f64 / 1000.0).max(0.0)
}

/// The voice-channel transition carried by a gateway voice-state update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceTransition {
    Joined,
    Left,
    /// Mute changes and channel-to-channel moves; the session keeps running.
    Unchanged,
}

/// Classifies a voice-state update by the presence of its channels.
pub fn classify_transition(previous: Option<u64>, current: Option<u64>) -> VoiceTransition {
    match (previous, current) {
        (None, Some(_)) => VoiceTransition::Joined,
        (Some(_), None) => VoiceTransition::Left,
        _ => VoiceTransition::Unchanged,
    }
}

/// Applies a gateway voice-state update to the ledger.
pub async fn handle_voice_update(
    store: &JsonStore<VoiceLedger>,
    member_id: u64,
    previous: Option<u64>,
    current: Option<u64>,
) -> Result<(), store::Error> {
    match classify_transition(previous, current) {
        VoiceTransition::Joined => {
            debug!("Member {} joined a voice channel", member_id);
            store
                .mutate(|ledger| ledger.note_join(member_id, Utc::now()))
                .await?;
        }
        VoiceTransition::Left => {
            debug!("Member {} left a voice channel", member_id);
            store
                .mutate(|ledger| ledger.note_leave(member_id, Utc::now()))
                .await?;
        }
        VoiceTransition::Unchanged => {}
    }
    Ok(())
}

/// Reconciles the open sessions of every currently-connected member.
pub async fn reconcile_connected(
    store: &JsonStore<VoiceLedger>,
    connected: &[u64],
) -> Result<(), store::Error> {
    if connected.is_empty() {
        return Ok(());
    }
    store
        .mutate(|ledger| ledger.reconcile(connected, Utc::now()))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds_past_noon: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(seconds_past_noon)
    }

    #[test]
    fn join_then_leave_accumulates_exactly_the_elapsed_seconds() {
        // Arrange
        let mut ledger = VoiceLedger::default();

        // Act
        ledger.note_join(1, at(0));
        ledger.note_leave(1, at(125));

        // Assert
        assert_eq!(ledger.total_seconds(1, at(500)), Some(125.0));
        assert_eq!(ledger.standings(), vec![(1, 125.0)]);
    }

    #[test]
    fn leave_without_an_open_session_accumulates_nothing() {
        // Arrange
        let mut ledger = VoiceLedger::default();

        // Act
        ledger.note_leave(1, at(60));

        // Assert: the record exists but holds no time
        assert_eq!(ledger.total_seconds(1, at(60)), Some(0.0));
    }

    #[test]
    fn rejoin_restarts_the_session_instead_of_stacking() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(1, at(0));

        // Act: the leave was never observed, then the member joins again
        ledger.note_join(1, at(100));
        ledger.note_leave(1, at(160));

        // Assert: only the second session counts
        assert_eq!(ledger.total_seconds(1, at(200)), Some(60.0));
    }

    #[test]
    fn leave_before_join_time_clamps_to_zero() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(1, at(100));

        // Act
        ledger.note_leave(1, at(40));

        // Assert
        assert_eq!(ledger.total_seconds(1, at(200)), Some(0.0));
    }

    #[test]
    fn reconcile_folds_the_open_session_and_restarts_it() {
        // The scenario from the accounting design: join at T0, leave at
        // T0+125, rejoin at T0+200, reconciliation tick at T0+260.
        let mut ledger = VoiceLedger::default();
        ledger.note_join(1, at(0));
        ledger.note_leave(1, at(125));
        ledger.note_join(1, at(200));

        // Act
        ledger.reconcile(&[1], at(260));

        // Assert: 125 + 60 flushed, session restarted at the tick
        assert_eq!(ledger.standings(), vec![(1, 185.0)]);
        ledger.note_leave(1, at(300));
        assert_eq!(ledger.total_seconds(1, at(300)), Some(225.0));
    }

    #[test]
    fn reconcile_conserves_accumulated_plus_open_time() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(1, at(0));
        ledger.note_leave(1, at(50));
        ledger.note_join(1, at(100));
        let probe = at(400);
        let before = ledger.total_seconds(1, probe).unwrap();

        // Act
        ledger.reconcile(&[1], at(250));

        // Assert: reconciliation only transfers time between buckets
        let after = ledger.total_seconds(1, probe).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn reconcile_lazily_creates_records_for_unknown_connected_members() {
        // A member can be connected before any join event was observed, for
        // example right after the process starts.
        let mut ledger = VoiceLedger::default();

        // Act
        ledger.reconcile(&[7], at(60));

        // Assert: record exists, no session was invented
        assert_eq!(ledger.total_seconds(7, at(60)), Some(0.0));
        assert_eq!(ledger.standings(), vec![(7, 0.0)]);
    }

    #[test]
    fn reconcile_leaves_members_without_open_sessions_alone() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(1, at(0));
        ledger.note_leave(1, at(30));

        // Act
        ledger.reconcile(&[1], at(90));

        // Assert
        assert_eq!(ledger.total_seconds(1, at(90)), Some(30.0));
    }

    #[test]
    fn total_seconds_includes_the_open_session_delta() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(1, at(0));
        ledger.note_leave(1, at(100));
        ledger.note_join(1, at(200));

        // Act
        let total = ledger.total_seconds(1, at(230));

        // Assert: 100 flushed plus 30 in progress
        assert_eq!(total, Some(130.0));
    }

    #[test]
    fn total_seconds_is_none_for_an_unobserved_member() {
        let ledger = VoiceLedger::default();
        assert_eq!(ledger.total_seconds(42, at(0)), None);
    }

    #[test]
    fn standings_sort_descending_with_deterministic_ties() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(3, at(0));
        ledger.note_leave(3, at(100));
        ledger.note_join(1, at(0));
        ledger.note_leave(1, at(100));
        ledger.note_join(2, at(0));
        ledger.note_leave(2, at(300));

        // Act
        let standings = ledger.standings();

        // Assert: 2 leads, the 100-second tie orders by member id
        assert_eq!(standings, vec![(2, 300.0), (1, 100.0), (3, 100.0)]);
    }

    #[test]
    fn standings_ignore_open_session_deltas() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(1, at(0));
        ledger.note_leave(1, at(10));
        ledger.note_join(2, at(0));

        // Act
        let standings = ledger.standings();

        // Assert: member 2's open session does not count until flushed
        assert_eq!(standings, vec![(1, 10.0), (2, 0.0)]);
    }

    #[test]
    fn classify_transition_matches_channel_presence() {
        assert_eq!(classify_transition(None, Some(5)), VoiceTransition::Joined);
        assert_eq!(classify_transition(Some(5), None), VoiceTransition::Left);
        assert_eq!(
            classify_transition(Some(5), Some(6)),
            VoiceTransition::Unchanged
        );
        assert_eq!(classify_transition(None, None), VoiceTransition::Unchanged);
    }

    #[test]
    fn ledger_serializes_as_a_flat_member_map() {
        // Arrange
        let mut ledger = VoiceLedger::default();
        ledger.note_join(123456789, at(0));
        ledger.note_leave(123456789, at(90));

        // Act
        let encoded = serde_json::to_value(&ledger).unwrap();

        // Assert
        assert_eq!(
            encoded,
            serde_json::json!({
                "123456789": {
                    "accumulated_seconds": 90.0,
                    "session_start": null,
                }
            })
        );
        let decoded: VoiceLedger = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, ledger);
    }
}
