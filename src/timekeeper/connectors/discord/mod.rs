//! Discord connectivity for the timekeeper bot.
//!
//! This module provides abstractions for interacting with Discord:
//! - Error types for Discord connectivity issues
//! - The `DiscordConnector` trait covering every platform interaction the
//!   command services need
//! - Data structures representing guild members
//!
//! The module is implementation-agnostic; a concrete implementation using
//! the Serenity library lives in the `serenity` submodule.

use mockall::automock;
use std::time::Duration;
use thiserror::Error;

pub(crate) mod serenity;

/// Errors that can occur during Discord connectivity operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The command was not executed in a server channel
    #[error("Not in a server channel")]
    NotInGuildChannel,
    /// Failed to send a reply message
    #[error("Cannot send reply")]
    CannotSendReply,
    /// Failed to retrieve the guild (server) information
    #[error("Cannot get guild")]
    CannotGetGuild,
    /// The member is not present in the guild
    #[error("Cannot find member")]
    CannotFindMember,
    /// Role creation failed on the platform side
    #[error("Cannot create role")]
    CannotCreateRole,
    /// Role assignment failed on the platform side
    #[error("Cannot assign role")]
    CannotAssignRole,
    /// The invoker's permissions could not be resolved
    #[error("Cannot resolve permissions")]
    CannotResolvePermissions,
}

/// Trait for abstracting Discord server interactions.
///
/// This trait defines the required functionality for replying to commands,
/// probing the guild and managing the honor role.
#[automock]
pub trait DiscordConnector {
    /// Sends a reply to the person that invoked the prefix command.
    async fn send_reply(&self, message: &str) -> Result<(), Error>;

    /// Sends an embed-shaped panel reply with a title and a body.
    async fn send_panel(&self, title: &str, body: &str) -> Result<(), Error>;

    /// Whether the invoker holds the administrator permission.
    async fn invoker_is_administrator(&self) -> Result<bool, Error>;

    /// The id of the guild the command was invoked in.
    async fn guild_id(&self) -> Result<u64, Error>;

    /// Waits for the next message from the invoking user in the invoking
    /// channel. `None` when no message arrives within `timeout`.
    async fn await_setup_reply(&self, timeout: Duration) -> Result<Option<String>, Error>;

    /// Creates a role in the current guild and returns its id.
    async fn create_role(&self, name: &str, color: u32) -> Result<u64, Error>;

    /// Whether the role still exists in the current guild.
    async fn role_exists(&self, role_id: u64) -> Result<bool, Error>;

    /// Whether the member currently holds the role.
    async fn member_has_role(&self, member_id: u64, role_id: u64) -> Result<bool, Error>;

    /// Grants the role to the member.
    async fn grant_role(&self, member_id: u64, role_id: u64) -> Result<(), Error>;

    /// The member's display name, or `None` when the id no longer resolves
    /// in the guild roster.
    async fn member_display_name(&self, member_id: u64) -> Result<Option<String>, Error>;
}

/// Represents a member of a Discord server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GuildMember {
    /// Discord user's unique identifier
    pub(crate) id: u64,
    /// The name shown in the guild: nickname when set, username otherwise
    pub(crate) display_name: String,
    pub(crate) mention: String,
}

/// Builder for GuildMember instances, for readable test fixtures.
#[derive(Debug, Default)]
#[cfg(test)]
pub struct GuildMemberBuilder {
    id: u64,
    display_name: String,
    mention: String,
}

#[cfg(test)]
impl GuildMemberBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = id;
        // Default the mention to the standard Discord format if not explicitly set
        if self.mention.is_empty() {
            self.mention = format!("<@{}>", id);
        }
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn mention(mut self, mention: impl Into<String>) -> Self {
        self.mention = mention.into();
        self
    }

    pub fn build(self) -> GuildMember {
        GuildMember {
            id: self.id,
            display_name: self.display_name,
            mention: self.mention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_the_mention_from_the_id() {
        // Arrange & Act
        let member = GuildMemberBuilder::new()
            .id(123456789)
            .display_name("Maria")
            .build();

        // Assert
        assert_eq!(member.id, 123456789);
        assert_eq!(member.display_name, "Maria");
        assert_eq!(member.mention, "<@123456789>");
    }

    #[test]
    fn builder_keeps_an_explicit_mention() {
        let member = GuildMemberBuilder::new()
            .id(1)
            .mention("<@!1>")
            .display_name("Maria")
            .build();
        assert_eq!(member.mention, "<@!1>");
    }
}
