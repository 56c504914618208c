use crate::timekeeper::commands::{Error, PERMISSION_DENIED_REPLY};
use crate::timekeeper::connectors::discord::{self, DiscordConnector, GuildMember};
use crate::timekeeper::honor::HonorLedger;
use crate::timekeeper::store::JsonStore;
use log::info;

pub(crate) const NOT_CONFIGURED_REPLY: &str =
    "The honor role has not been configured in this server yet. Run the panel command first.";
pub(crate) const ROLE_MISSING_REPLY: &str =
    "The configured honor role no longer exists in this server.";
pub(crate) const NOTHING_ADDED_REPLY: &str = "No new members were given the honor role.";

/// Grants the configured honor role to members, idempotently.
pub trait HonorGranter {
    async fn grant(&self, members: &[GuildMember]) -> Result<(), Error>;
}

pub struct HonorGranterImpl<'a, DISCORD: DiscordConnector> {
    honor_store: &'a JsonStore<HonorLedger>,
    discord_connector: &'a DISCORD,
}

impl<'a, DISCORD: DiscordConnector> HonorGranterImpl<'a, DISCORD> {
    pub fn new(honor_store: &'a JsonStore<HonorLedger>, discord_connector: &'a DISCORD) -> Self {
        Self {
            honor_store,
            discord_connector,
        }
    }
}

impl<'a, DISCORD: DiscordConnector> HonorGranter for HonorGranterImpl<'a, DISCORD> {
    async fn grant(&self, members: &[GuildMember]) -> Result<(), Error> {
        if !self.discord_connector.invoker_is_administrator().await? {
            self.discord_connector
                .send_reply(PERMISSION_DENIED_REPLY)
                .await?;
            return Ok(());
        }
        let guild_id = self.discord_connector.guild_id().await?;
        let Some(role_id) = self
            .honor_store
            .read(|ledger| ledger.configured_role(guild_id))
            .await
        else {
            self.discord_connector.send_reply(NOT_CONFIGURED_REPLY).await?;
            return Ok(());
        };
        if !self.discord_connector.role_exists(role_id).await? {
            self.discord_connector.send_reply(ROLE_MISSING_REPLY).await?;
            return Ok(());
        }

        // Resolve everyone before touching any state so an unresolvable
        // member aborts the whole operation without a partial grant.
        let mut candidates = Vec::new();
        for member in members {
            match self
                .discord_connector
                .member_has_role(member.id, role_id)
                .await
            {
                Ok(true) => {}
                Ok(false) => candidates.push(member),
                Err(discord::Error::CannotFindMember) => {
                    self.discord_connector
                        .send_reply(&format!(
                            "{} is no longer in this server.",
                            member.display_name
                        ))
                        .await?;
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        }

        if candidates.is_empty() {
            self.discord_connector.send_reply(NOTHING_ADDED_REPLY).await?;
            return Ok(());
        }

        for member in &candidates {
            self.discord_connector.grant_role(member.id, role_id).await?;
        }
        let added_ids: Vec<u64> = candidates.iter().map(|member| member.id).collect();
        self.honor_store
            .mutate(|ledger| ledger.record_grants(guild_id, &added_ids))
            .await?;
        info!(
            "Granted the honor role to {} member(s) in guild {}",
            candidates.len(),
            guild_id
        );

        let mentions: Vec<&str> = candidates
            .iter()
            .map(|member| member.mention.as_str())
            .collect();
        self.discord_connector
            .send_reply(&format!("Honor role granted to: {}", mentions.join(", ")))
            .await?;
        Ok(())
    }
}
