use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::model::{Channel, Guild, Snowflake};

/// Read-only, id-keyed relation lookups. Entities refer to each other by id
/// only; anything that needs to follow a relation goes through here.
pub trait EntityLookup {
    fn guild(&self, id: Snowflake) -> Option<Arc<Guild>>;
    fn channel(&self, id: Snowflake) -> Option<Arc<Channel>>;
}

/// In-memory registry of the guilds and channels the client has seen.
#[derive(Default)]
pub struct EntityCache {
    /// All known guilds, keyed by guild ID.
    guilds: DashMap<Snowflake, Arc<Guild>>,
    /// All known channels (including threads), keyed by channel ID.
    channels: DashMap<Snowflake, Arc<Channel>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a guild snapshot.
    pub fn upsert_guild(&self, mut guild: Guild) {
        guild.link_roles();
        debug!(guild_id = %guild.id, roles = guild.roles.len(), "caching guild");
        self.guilds.insert(guild.id, Arc::new(guild));
    }

    /// Insert or replace a channel snapshot.
    pub fn upsert_channel(&self, channel: Channel) {
        self.channels.insert(channel.id, Arc::new(channel));
    }

    /// Drop a guild and every channel that belongs to it.
    pub fn remove_guild(&self, id: Snowflake) -> Option<Arc<Guild>> {
        self.channels.retain(|_, ch| ch.guild_id != Some(id));
        self.guilds.remove(&id).map(|(_, g)| g)
    }

    pub fn remove_channel(&self, id: Snowflake) -> Option<Arc<Channel>> {
        self.channels.remove(&id).map(|(_, ch)| ch)
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channels belonging to a guild.
    pub fn guild_channels(&self, guild_id: Snowflake) -> Vec<Arc<Channel>> {
        self.channels
            .iter()
            .filter(|ch| ch.guild_id == Some(guild_id))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl EntityLookup for EntityCache {
    fn guild(&self, id: Snowflake) -> Option<Arc<Guild>> {
        self.guilds.get(&id).map(|g| g.value().clone())
    }

    fn channel(&self, id: Snowflake) -> Option<Arc<Channel>> {
        self.channels.get(&id).map(|ch| ch.value().clone())
    }
}
