use crate::timekeeper::commands::{Error, format_duration};
use crate::timekeeper::connectors::discord::DiscordConnector;
use crate::timekeeper::store::JsonStore;
use crate::timekeeper::voice::VoiceLedger;

/// How many entries the leaderboard shows.
pub const RANKING_LIMIT: usize = 10;

pub(crate) const RANKING_TITLE: &str = "Top 10 members by voice time";
pub(crate) const EMPTY_RANKING_REPLY: &str = "Nobody has any voice time recorded yet.";

/// Renders the voice-time leaderboard.
pub trait RankingReporter {
    async fn report(&self) -> Result<(), Error>;
}

pub struct RankingReporterImpl<'a, DISCORD: DiscordConnector> {
    voice_store: &'a JsonStore<VoiceLedger>,
    discord_connector: &'a DISCORD,
}

impl<'a, DISCORD: DiscordConnector> RankingReporterImpl<'a, DISCORD> {
    pub fn new(voice_store: &'a JsonStore<VoiceLedger>, discord_connector: &'a DISCORD) -> Self {
        Self {
            voice_store,
            discord_connector,
        }
    }
}

impl<'a, DISCORD: DiscordConnector> RankingReporter for RankingReporterImpl<'a, DISCORD> {
    async fn report(&self) -> Result<(), Error> {
        let standings = self.voice_store.read(|ledger| ledger.standings()).await;
        let mut lines = Vec::new();
        for (member_id, seconds) in standings {
            if lines.len() == RANKING_LIMIT {
                break;
            }
            // Members that left the guild are skipped without using up a slot.
            let Some(display_name) = self
                .discord_connector
                .member_display_name(member_id)
                .await?
            else {
                continue;
            };
            lines.push(format!(
                "**{}. {}** - {}",
                lines.len() + 1,
                display_name,
                format_duration(seconds)
            ));
        }
        if lines.is_empty() {
            self.discord_connector.send_reply(EMPTY_RANKING_REPLY).await?;
        } else {
            self.discord_connector
                .send_panel(RANKING_TITLE, &lines.join("\n"))
                .await?;
        }
        Ok(())
    }
}
