//! Honor-role configuration per guild.
//!
//! Each guild configures its honor role exactly once through an interactive
//! wizard: the bot asks for a name, then for a hex color, creates the role
//! and remembers its id. The wizard is an explicit state machine so invalid
//! input re-prompts instead of crashing the handler, and a per-guild gate
//! keeps two concurrent wizards from racing on the same configuration.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::Mutex;

/// One guild's honor-role configuration.
///
/// `role_name`, `role_color` and `role_id` are set exactly once by the setup
/// wizard; `member_ids` grows with every grant and never shrinks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct HonorRoleConfig {
    pub role_name: Option<String>,
    /// 24-bit RGB value
    pub role_color: Option<u32>,
    pub role_id: Option<u64>,
    pub member_ids: Vec<u64>,
}

/// The persisted honor-role document: guild id to configuration.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct HonorLedger {
    configs: HashMap<u64, HonorRoleConfig>,
}

impl HonorLedger {
    pub fn config(&self, guild_id: u64) -> Option<&HonorRoleConfig> {
        self.configs.get(&guild_id)
    }

    /// The configured role id for the guild, if setup ever completed.
    pub fn configured_role(&self, guild_id: u64) -> Option<u64> {
        self.config(guild_id).and_then(|config| config.role_id)
    }

    /// Records a completed setup. Returns `false` without touching anything
    /// when the guild is already configured; there is no reconfiguration
    /// path.
    pub fn record_setup(&mut self, guild_id: u64, name: String, color: u32, role_id: u64) -> bool {
        let config = self.configs.entry(guild_id).or_default();
        if config.role_id.is_some() {
            return false;
        }
        config.role_name = Some(name);
        config.role_color = Some(color);
        config.role_id = Some(role_id);
        true
    }

    /// Appends newly-granted members, keeping `member_ids` duplicate-free.
    pub fn record_grants(&mut self, guild_id: u64, member_ids: &[u64]) {
        let config = self.configs.entry(guild_id).or_default();
        for &member_id in member_ids {
            if !config.member_ids.contains(&member_id) {
                config.member_ids.push(member_id);
            }
        }
    }
}

/// Errors produced by wizard input.
#[derive(Error, Debug, PartialEq)]
pub enum WizardError {
    /// The color step got something that is not a 24-bit hex color
    #[error("'{0}' is not a valid hex color")]
    InvalidColor(String),
    /// Input arrived after the wizard already completed
    #[error("setup is already complete")]
    Finished,
}

/// What the wizard expects next after accepting an input.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    /// The name was captured; a color is expected next
    NeedColor,
    /// Both inputs captured; the role can be created
    Done { name: String, color: u32 },
}

enum WizardState {
    AwaitingName,
    AwaitingColor { name: String },
    Complete,
}

/// The interactive setup state machine.
///
/// The name step accepts any string verbatim, the empty string included. The
/// color step keeps the wizard in place on invalid input so the caller can
/// re-prompt.
pub struct SetupWizard {
    state: WizardState,
}

impl SetupWizard {
    pub fn new() -> Self {
        Self {
            state: WizardState::AwaitingName,
        }
    }

    /// Feeds the next message from the invoking user into the wizard.
    pub fn submit(&mut self, input: &str) -> Result<WizardStep, WizardError> {
        match &mut self.state {
            WizardState::AwaitingName => {
                self.state = WizardState::AwaitingColor {
                    name: input.to_string(),
                };
                Ok(WizardStep::NeedColor)
            }
            WizardState::AwaitingColor { name } => {
                let color = parse_color(input)?;
                let name = std::mem::take(name);
                self.state = WizardState::Complete;
                Ok(WizardStep::Done { name, color })
            }
            WizardState::Complete => Err(WizardError::Finished),
        }
    }
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a 24-bit RGB color from hex text, with or without a leading `#`.
pub fn parse_color(input: &str) -> Result<u32, WizardError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let value = u32::from_str_radix(digits, 16)
        .map_err(|_| WizardError::InvalidColor(input.to_string()))?;
    if value > 0xFF_FF_FF {
        return Err(WizardError::InvalidColor(input.to_string()));
    }
    Ok(value)
}

/// Per-guild mutual exclusion for the setup wizard.
///
/// A second `painelpd` invocation while a wizard is collecting input would
/// race on the same configuration; the gate rejects it up front.
#[derive(Default)]
pub struct SetupGate {
    active: Mutex<HashSet<u64>>,
}

impl SetupGate {
    /// Claims the wizard for a guild. Returns `false` when one is already
    /// running there.
    pub async fn try_begin(&self, guild_id: u64) -> bool {
        self.active.lock().await.insert(guild_id)
    }

    /// Releases the wizard claim for a guild.
    pub async fn end(&self, guild_id: u64) {
        self.active.lock().await.remove(&guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod wizard_tests {
        use super::*;

        #[test]
        fn name_is_captured_verbatim() {
            // Arrange
            let mut wizard = SetupWizard::new();

            // Act
            let step = wizard.submit("  First Lady  ").unwrap();
            let done = wizard.submit("ff00aa").unwrap();

            // Assert: no trimming, no validation on the name
            assert_eq!(step, WizardStep::NeedColor);
            assert_eq!(
                done,
                WizardStep::Done {
                    name: "  First Lady  ".to_string(),
                    color: 0xFF00AA,
                }
            );
        }

        #[test]
        fn empty_name_is_accepted() {
            let mut wizard = SetupWizard::new();
            assert_eq!(wizard.submit("").unwrap(), WizardStep::NeedColor);
        }

        #[test]
        fn color_without_leading_hash_is_accepted() {
            // Arrange
            let mut wizard = SetupWizard::new();
            wizard.submit("VIP").unwrap();

            // Act
            let done = wizard.submit("ff00aa").unwrap();

            // Assert
            assert_eq!(
                done,
                WizardStep::Done {
                    name: "VIP".to_string(),
                    color: 0xFF00AA,
                }
            );
        }

        #[test]
        fn invalid_color_keeps_the_wizard_waiting() {
            // Arrange
            let mut wizard = SetupWizard::new();
            wizard.submit("VIP").unwrap();

            // Act
            let rejected = wizard.submit("#zz0000");

            // Assert: the error is recoverable and the next valid input works
            assert_eq!(
                rejected,
                Err(WizardError::InvalidColor("#zz0000".to_string()))
            );
            let done = wizard.submit("#ff0000").unwrap();
            assert_eq!(
                done,
                WizardStep::Done {
                    name: "VIP".to_string(),
                    color: 0xFF0000,
                }
            );
        }

        #[test]
        fn input_after_completion_is_rejected() {
            // Arrange
            let mut wizard = SetupWizard::new();
            wizard.submit("VIP").unwrap();
            wizard.submit("ff0000").unwrap();

            // Act & Assert
            assert_eq!(wizard.submit("anything"), Err(WizardError::Finished));
        }
    }

    mod parse_color_tests {
        use super::*;

        #[test]
        fn strips_a_leading_hash() {
            assert_eq!(parse_color("#ff00aa"), Ok(0xFF00AA));
        }

        #[test]
        fn accepts_bare_hex() {
            assert_eq!(parse_color("ff00aa"), Ok(0xFF00AA));
        }

        #[test]
        fn rejects_non_hex_input() {
            assert_eq!(
                parse_color("#zz0000"),
                Err(WizardError::InvalidColor("#zz0000".to_string()))
            );
        }

        #[test]
        fn rejects_the_empty_string() {
            assert!(parse_color("").is_err());
        }

        #[test]
        fn rejects_values_beyond_24_bits() {
            assert!(parse_color("1ffffff").is_err());
        }
    }

    mod ledger_tests {
        use super::*;

        #[test]
        fn record_setup_sets_the_configuration_once() {
            // Arrange
            let mut ledger = HonorLedger::default();

            // Act
            let first = ledger.record_setup(9, "VIP".to_string(), 0xFF0000, 42);
            let second = ledger.record_setup(9, "Other".to_string(), 0x00FF00, 43);

            // Assert: the second setup attempt changes nothing
            assert!(first);
            assert!(!second);
            let config = ledger.config(9).unwrap();
            assert_eq!(config.role_name.as_deref(), Some("VIP"));
            assert_eq!(config.role_color, Some(0xFF0000));
            assert_eq!(config.role_id, Some(42));
        }

        #[test]
        fn record_grants_keeps_order_and_skips_duplicates() {
            // Arrange
            let mut ledger = HonorLedger::default();
            ledger.record_setup(9, "VIP".to_string(), 0xFF0000, 42);

            // Act
            ledger.record_grants(9, &[1, 2]);
            ledger.record_grants(9, &[2, 3]);

            // Assert
            assert_eq!(ledger.config(9).unwrap().member_ids, vec![1, 2, 3]);
        }

        #[test]
        fn configured_role_is_none_before_setup() {
            let ledger = HonorLedger::default();
            assert_eq!(ledger.configured_role(9), None);
        }

        #[test]
        fn ledger_serializes_as_a_flat_guild_map() {
            // Arrange
            let mut ledger = HonorLedger::default();
            ledger.record_setup(987, "VIP".to_string(), 0xFF00AA, 42);
            ledger.record_grants(987, &[1, 2]);

            // Act
            let encoded = serde_json::to_value(&ledger).unwrap();

            // Assert
            assert_eq!(
                encoded,
                serde_json::json!({
                    "987": {
                        "role_name": "VIP",
                        "role_color": 0xFF00AA,
                        "role_id": 42,
                        "member_ids": [1, 2],
                    }
                })
            );
            let decoded: HonorLedger = serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, ledger);
        }
    }

    mod gate_tests {
        use super::*;

        #[tokio::test]
        async fn second_begin_for_the_same_guild_is_rejected() {
            // Arrange
            let gate = SetupGate::default();

            // Act & Assert
            assert!(gate.try_begin(9).await);
            assert!(!gate.try_begin(9).await);
            assert!(gate.try_begin(10).await, "other guilds are unaffected");
        }

        #[tokio::test]
        async fn end_releases_the_claim() {
            // Arrange
            let gate = SetupGate::default();
            gate.try_begin(9).await;

            // Act
            gate.end(9).await;

            // Assert
            assert!(gate.try_begin(9).await);
        }
    }
}
