use crate::timekeeper::commands::{Error, format_duration};
use crate::timekeeper::connectors::discord::{DiscordConnector, GuildMember};
use crate::timekeeper::store::JsonStore;
use crate::timekeeper::voice::VoiceLedger;
use chrono::Utc;

/// Reports one member's cumulative voice time.
pub trait TempoReporter {
    async fn report(&self, member: &GuildMember) -> Result<(), Error>;
}

pub struct TempoReporterImpl<'a, DISCORD: DiscordConnector> {
    voice_store: &'a JsonStore<VoiceLedger>,
    discord_connector: &'a DISCORD,
}

impl<'a, DISCORD: DiscordConnector> TempoReporterImpl<'a, DISCORD> {
    pub fn new(voice_store: &'a JsonStore<VoiceLedger>, discord_connector: &'a DISCORD) -> Self {
        Self {
            voice_store,
            discord_connector,
        }
    }
}

impl<'a, DISCORD: DiscordConnector> TempoReporter for TempoReporterImpl<'a, DISCORD> {
    async fn report(&self, member: &GuildMember) -> Result<(), Error> {
        let now = Utc::now();
        let total = self
            .voice_store
            .read(|ledger| ledger.total_seconds(member.id, now))
            .await;
        // The total includes the open session's elapsed time, so a member
        // currently in a voice channel sees an up-to-date figure.
        let message = match total {
            Some(seconds) => format!(
                "{} has spent {} in voice channels.",
                member.display_name,
                format_duration(seconds)
            ),
            None => format!("No voice time recorded for {} yet.", member.display_name),
        };
        self.discord_connector.send_reply(&message).await?;
        Ok(())
    }
}
