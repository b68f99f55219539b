use serde::{Deserialize, Serialize};

use super::snowflake::Snowflake;
use crate::engine::permissions::Overwrite;

/// Channel kind, as the platform encodes it in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelType {
    Text,
    Private,
    Voice,
    Group,
    Category,
    News,
    NewsThread,
    PublicThread,
    PrivateThread,
    Stage,
    Directory,
    Forum,
    Media,
    /// A type code this client does not know yet.
    Unknown(u8),
}

impl From<u8> for ChannelType {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Text,
            1 => Self::Private,
            2 => Self::Voice,
            3 => Self::Group,
            4 => Self::Category,
            5 => Self::News,
            10 => Self::NewsThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            13 => Self::Stage,
            14 => Self::Directory,
            15 => Self::Forum,
            16 => Self::Media,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(kind: ChannelType) -> Self {
        match kind {
            ChannelType::Text => 0,
            ChannelType::Private => 1,
            ChannelType::Voice => 2,
            ChannelType::Group => 3,
            ChannelType::Category => 4,
            ChannelType::News => 5,
            ChannelType::NewsThread => 10,
            ChannelType::PublicThread => 11,
            ChannelType::PrivateThread => 12,
            ChannelType::Stage => 13,
            ChannelType::Directory => 14,
            ChannelType::Forum => 15,
            ChannelType::Media => 16,
            ChannelType::Unknown(code) => code,
        }
    }
}

impl ChannelType {
    pub fn is_thread(self) -> bool {
        matches!(
            self,
            Self::NewsThread | Self::PublicThread | Self::PrivateThread
        )
    }

    /// DMs and group DMs. No guild permission model applies to these.
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private | Self::Group)
    }

    /// Whether the channel carries a message history that can be read.
    pub fn is_text_capable(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Private
                | Self::Voice
                | Self::Group
                | Self::News
                | Self::NewsThread
                | Self::PublicThread
                | Self::PrivateThread
                | Self::Stage
        )
    }
}

/// Snapshot of a channel. Relations (guild, parent) are held as ids and
/// resolved through an [`EntityLookup`](crate::engine::registry::EntityLookup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// Category for guild channels, parent channel for threads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "permission_overwrites")]
    pub overwrites: Vec<Overwrite>,
}

impl Channel {
    pub fn new(id: Snowflake, kind: ChannelType, guild_id: Option<Snowflake>) -> Self {
        Self {
            id,
            kind,
            guild_id,
            parent_id: None,
            name: String::new(),
            overwrites: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: Snowflake) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_overwrites(mut self, overwrites: Vec<Overwrite>) -> Self {
        self.overwrites = overwrites;
        self
    }

    pub fn is_thread(&self) -> bool {
        self.kind.is_thread()
    }

    pub fn is_private(&self) -> bool {
        self.kind.is_private()
    }
}
