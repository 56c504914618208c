//! Serenity-based implementation of Discord connectivity.
//!
//! This module provides the concrete implementation of the Discord connector
//! trait using the Serenity Discord library, driven by a Poise command
//! context.

use crate::timekeeper::config::Config;
use crate::timekeeper::connectors::discord::Error::{
    CannotAssignRole, CannotCreateRole, CannotFindMember, CannotGetGuild,
    CannotResolvePermissions, CannotSendReply, NotInGuildChannel,
};
use crate::timekeeper::connectors::discord::{DiscordConnector, Error, GuildMember};
use crate::timekeeper::honor::{HonorLedger, SetupGate};
use crate::timekeeper::store::JsonStore;
use crate::timekeeper::voice::VoiceLedger;
use log::info;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// Discord connector implementation using the Serenity library.
pub struct SerenityDiscordConnector<'a> {
    context: Context<'a>,
}

impl<'a> SerenityDiscordConnector<'a> {
    /// Creates a new SerenityDiscordConnector instance.
    ///
    /// # Arguments
    ///
    /// * `context` - Poise command context for Discord interactions
    pub fn new(context: Context<'a>) -> Self {
        Self { context }
    }
}

impl DiscordConnector for SerenityDiscordConnector<'_> {
    async fn send_reply(&self, message: &str) -> Result<(), Error> {
        let Ok(_) = self.context.reply(message).await else {
            return Err(CannotSendReply);
        };
        Ok(())
    }

    async fn send_panel(&self, title: &str, body: &str) -> Result<(), Error> {
        let embed = serenity::CreateEmbed::new()
            .title(title)
            .description(body)
            .colour(serenity::Colour::PURPLE);
        let reply = poise::CreateReply::default().embed(embed);
        let Ok(_) = self.context.send(reply).await else {
            return Err(CannotSendReply);
        };
        Ok(())
    }

    async fn invoker_is_administrator(&self) -> Result<bool, Error> {
        let Some(member) = self.context.author_member().await else {
            return Err(NotInGuildChannel);
        };
        let cache = self.context.serenity_context().cache.clone();
        let Ok(permissions) = member.permissions(cache) else {
            return Err(CannotResolvePermissions);
        };
        Ok(permissions.administrator())
    }

    async fn guild_id(&self) -> Result<u64, Error> {
        self.context
            .guild_id()
            .map(|guild_id| guild_id.get())
            .ok_or(NotInGuildChannel)
    }

    async fn await_setup_reply(&self, timeout: Duration) -> Result<Option<String>, Error> {
        let shard = self.context.serenity_context().shard.clone();
        let reply = serenity::collector::MessageCollector::new(shard)
            .channel_id(self.context.channel_id())
            .author_id(self.context.author().id)
            .timeout(timeout)
            .await;
        Ok(reply.map(|message| message.content))
    }

    async fn create_role(&self, name: &str, color: u32) -> Result<u64, Error> {
        let Some(guild_id) = self.context.guild_id() else {
            return Err(NotInGuildChannel);
        };
        let builder = serenity::EditRole::new()
            .name(name)
            .colour(serenity::Colour::new(color));
        let Ok(role) = guild_id.create_role(self.context.http(), builder).await else {
            return Err(CannotCreateRole);
        };
        info!("Created role '{}' ({}) in guild {}", name, role.id, guild_id);
        Ok(role.id.get())
    }

    async fn role_exists(&self, role_id: u64) -> Result<bool, Error> {
        let Some(guild) = self.context.guild() else {
            return Err(CannotGetGuild);
        };
        Ok(guild.roles.contains_key(&serenity::RoleId::new(role_id)))
    }

    async fn member_has_role(&self, member_id: u64, role_id: u64) -> Result<bool, Error> {
        let Some(guild_id) = self.context.guild_id() else {
            return Err(NotInGuildChannel);
        };
        let Ok(member) = guild_id
            .member(self.context, serenity::UserId::new(member_id))
            .await
        else {
            return Err(CannotFindMember);
        };
        Ok(member.roles.contains(&serenity::RoleId::new(role_id)))
    }

    async fn grant_role(&self, member_id: u64, role_id: u64) -> Result<(), Error> {
        let Some(guild_id) = self.context.guild_id() else {
            return Err(NotInGuildChannel);
        };
        let Ok(_) = self
            .context
            .http()
            .add_member_role(
                guild_id,
                serenity::UserId::new(member_id),
                serenity::RoleId::new(role_id),
                None,
            )
            .await
        else {
            return Err(CannotAssignRole);
        };
        Ok(())
    }

    async fn member_display_name(&self, member_id: u64) -> Result<Option<String>, Error> {
        let Some(guild) = self.context.guild() else {
            return Err(CannotGetGuild);
        };
        Ok(guild
            .members
            .get(&serenity::UserId::new(member_id))
            .map(|member| member.display_name().to_string()))
    }
}

impl From<serenity::Member> for GuildMember {
    fn from(member: serenity::Member) -> Self {
        GuildMember {
            id: member.user.id.get(),
            display_name: member.display_name().to_string(),
            mention: serenity::Mentionable::mention(&member).to_string(),
        }
    }
}

impl From<&serenity::User> for GuildMember {
    fn from(user: &serenity::User) -> Self {
        GuildMember {
            id: user.id.get(),
            display_name: user.display_name().to_string(),
            mention: serenity::Mentionable::mention(user).to_string(),
        }
    }
}

/// Shared state handed to every Poise command handler.
pub struct Data {
    pub config: Config,
    pub voice_store: Arc<JsonStore<VoiceLedger>>,
    pub honor_store: Arc<JsonStore<HonorLedger>>,
    pub setup_gate: SetupGate,
}

/// Type alias for the Poise command context
pub type Context<'a> = poise::Context<'a, Data, anyhow::Error>;
