pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod connectors;
pub(crate) mod honor;
pub(crate) mod store;
pub(crate) mod voice;

use commands::Error;
use commands::grant::{HonorGranter, HonorGranterImpl};
use commands::panel::{HonorPanel, HonorPanelImpl};
use commands::ranking::{RankingReporter, RankingReporterImpl};
use commands::tempo::{TempoReporter, TempoReporterImpl};
use connectors::discord::{DiscordConnector, GuildMember};
use honor::{HonorLedger, SetupGate};
use std::time::Duration;
use store::JsonStore;
use voice::VoiceLedger;

/// Facade over the per-command services, one method per user command.
pub trait Timekeeper {
    async fn report_time(&self, member: &GuildMember) -> Result<(), Error>;
    async fn report_ranking(&self) -> Result<(), Error>;
    async fn honor_panel(&self) -> Result<(), Error>;
    async fn grant_honor(&self, members: &[GuildMember]) -> Result<(), Error>;
}

pub struct TimekeeperImpl<'a, DISCORD: DiscordConnector> {
    voice_store: &'a JsonStore<VoiceLedger>,
    honor_store: &'a JsonStore<HonorLedger>,
    setup_gate: &'a SetupGate,
    wizard_timeout: Duration,
    discord_connector: &'a DISCORD,
}

impl<'a, DISCORD: DiscordConnector> TimekeeperImpl<'a, DISCORD> {
    pub fn new(
        voice_store: &'a JsonStore<VoiceLedger>,
        honor_store: &'a JsonStore<HonorLedger>,
        setup_gate: &'a SetupGate,
        wizard_timeout: Duration,
        discord_connector: &'a DISCORD,
    ) -> Self {
        Self {
            voice_store,
            honor_store,
            setup_gate,
            wizard_timeout,
            discord_connector,
        }
    }
}

impl<'a, DISCORD: DiscordConnector> Timekeeper for TimekeeperImpl<'a, DISCORD> {
    async fn report_time(&self, member: &GuildMember) -> Result<(), Error> {
        let reporter = TempoReporterImpl::new(self.voice_store, self.discord_connector);
        reporter.report(member).await
    }

    async fn report_ranking(&self) -> Result<(), Error> {
        let reporter = RankingReporterImpl::new(self.voice_store, self.discord_connector);
        reporter.report().await
    }

    async fn honor_panel(&self) -> Result<(), Error> {
        let panel = HonorPanelImpl::new(
            self.honor_store,
            self.setup_gate,
            self.wizard_timeout,
            self.discord_connector,
        );
        panel.run().await
    }

    async fn grant_honor(&self, members: &[GuildMember]) -> Result<(), Error> {
        let granter = HonorGranterImpl::new(self.honor_store, self.discord_connector);
        granter.grant(members).await
    }
}
