use crate::timekeeper::commands::{Error, PERMISSION_DENIED_REPLY};
use crate::timekeeper::connectors::discord::DiscordConnector;
use crate::timekeeper::honor::{
    HonorLedger, HonorRoleConfig, SetupGate, SetupWizard, WizardError, WizardStep,
};
use crate::timekeeper::store::JsonStore;
use log::{info, warn};
use std::time::Duration;

pub(crate) const NAME_PROMPT: &str =
    "Setting up the honor role for the first time. What should the role be called?";
pub(crate) const COLOR_PROMPT: &str =
    "What color should the role have? Hex, like #ff0000.";
pub(crate) const TIMEOUT_REPLY: &str =
    "No answer arrived in time; honor role setup was cancelled.";
pub(crate) const IN_PROGRESS_REPLY: &str =
    "Honor role setup is already in progress for this server.";
pub(crate) const PANEL_TITLE: &str = "Honor role panel";
pub(crate) const NO_HOLDERS_LINE: &str = "Nobody holds the honor role yet.";

/// Runs the honor-role setup wizard, or renders the read-only summary panel
/// once the guild is configured.
pub trait HonorPanel {
    async fn run(&self) -> Result<(), Error>;
}

pub struct HonorPanelImpl<'a, DISCORD: DiscordConnector> {
    honor_store: &'a JsonStore<HonorLedger>,
    setup_gate: &'a SetupGate,
    wizard_timeout: Duration,
    discord_connector: &'a DISCORD,
}

impl<'a, DISCORD: DiscordConnector> HonorPanelImpl<'a, DISCORD> {
    pub fn new(
        honor_store: &'a JsonStore<HonorLedger>,
        setup_gate: &'a SetupGate,
        wizard_timeout: Duration,
        discord_connector: &'a DISCORD,
    ) -> Self {
        Self {
            honor_store,
            setup_gate,
            wizard_timeout,
            discord_connector,
        }
    }

    async fn render_summary(&self, config: &HonorRoleConfig) -> Result<(), Error> {
        let name = config
            .role_name
            .clone()
            .unwrap_or_else(|| "(unnamed)".to_string());
        let color = config.role_color.unwrap_or(0);
        let mut holders = Vec::new();
        for &member_id in &config.member_ids {
            // Holders that left the guild are simply not listed.
            if let Some(display_name) =
                self.discord_connector.member_display_name(member_id).await?
            {
                holders.push(display_name);
            }
        }
        let holders_line = if holders.is_empty() {
            NO_HOLDERS_LINE.to_string()
        } else {
            holders.join(", ")
        };
        let body = format!(
            "Name: {}\nColor: #{:06x}\nHolders: {}",
            name, color, holders_line
        );
        self.discord_connector.send_panel(PANEL_TITLE, &body).await?;
        Ok(())
    }

    async fn run_wizard(&self, guild_id: u64) -> Result<(), Error> {
        let mut wizard = SetupWizard::new();
        self.discord_connector.send_reply(NAME_PROMPT).await?;
        let settings = loop {
            let Some(input) = self
                .discord_connector
                .await_setup_reply(self.wizard_timeout)
                .await?
            else {
                self.discord_connector.send_reply(TIMEOUT_REPLY).await?;
                return Ok(());
            };
            match wizard.submit(&input) {
                Ok(WizardStep::NeedColor) => {
                    self.discord_connector.send_reply(COLOR_PROMPT).await?;
                }
                Ok(WizardStep::Done { name, color }) => break (name, color),
                Err(err @ WizardError::InvalidColor(_)) => {
                    self.discord_connector
                        .send_reply(&format!("{}. Try again, hex like #ff0000.", err))
                        .await?;
                }
                Err(WizardError::Finished) => {
                    warn!("Setup wizard for guild {} received input after completing", guild_id);
                    return Ok(());
                }
            }
        };
        let (name, color) = settings;
        let role_id = self.discord_connector.create_role(&name, color).await?;
        let recorded = self
            .honor_store
            .mutate(|ledger| ledger.record_setup(guild_id, name.clone(), color, role_id))
            .await?;
        if !recorded {
            warn!("Guild {} was configured while its wizard was running", guild_id);
        }
        info!("Honor role '{}' configured for guild {}", name, guild_id);
        self.discord_connector
            .send_reply(&format!("Honor role '{}' created and configured!", name))
            .await?;
        Ok(())
    }
}

impl<'a, DISCORD: DiscordConnector> HonorPanel for HonorPanelImpl<'a, DISCORD> {
    async fn run(&self) -> Result<(), Error> {
        if !self.discord_connector.invoker_is_administrator().await? {
            self.discord_connector
                .send_reply(PERMISSION_DENIED_REPLY)
                .await?;
            return Ok(());
        }
        let guild_id = self.discord_connector.guild_id().await?;
        let existing = self
            .honor_store
            .read(|ledger| ledger.config(guild_id).cloned())
            .await;
        if let Some(config) = existing.filter(|config| config.role_id.is_some()) {
            // Already configured: read-only summary, no way back into setup.
            return self.render_summary(&config).await;
        }
        if !self.setup_gate.try_begin(guild_id).await {
            self.discord_connector.send_reply(IN_PROGRESS_REPLY).await?;
            return Ok(());
        }
        let outcome = self.run_wizard(guild_id).await;
        self.setup_gate.end(guild_id).await;
        outcome
    }
}
