use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::snowflake::Snowflake;
use crate::engine::permissions::Permissions;

/// A guild role with its base permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    /// Not part of the role payload; filled in when the guild is loaded.
    #[serde(default)]
    pub guild_id: Snowflake,
    #[serde(default)]
    pub name: String,
    pub permissions: Permissions,
}

impl Role {
    pub fn new(id: Snowflake, guild_id: Snowflake, permissions: Permissions) -> Self {
        Self {
            id,
            guild_id,
            name: String::new(),
            permissions,
        }
    }

    /// The default ("@everyone") role shares its id with the guild.
    pub fn is_everyone(&self) -> bool {
        self.id == self.guild_id
    }
}

/// Guild snapshot: ownership and the role table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub owner_id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(
        serialize_with = "serialize_roles",
        deserialize_with = "deserialize_roles"
    )]
    pub roles: HashMap<Snowflake, Role>,
}

impl Guild {
    /// Create a guild whose default role carries `everyone` permissions.
    pub fn new(id: Snowflake, owner_id: Snowflake, everyone: Permissions) -> Self {
        let mut roles = HashMap::new();
        roles.insert(id, Role::new(id, id, everyone));
        Self {
            id,
            owner_id,
            name: String::new(),
            roles,
        }
    }

    /// Add or replace a role. The role is re-homed to this guild.
    pub fn insert_role(&mut self, mut role: Role) {
        role.guild_id = self.id;
        self.roles.insert(role.id, role);
    }

    /// Stamp the guild id onto every role. Needed after deserializing a
    /// payload, since role objects don't carry it.
    pub fn link_roles(&mut self) {
        let id = self.id;
        for role in self.roles.values_mut() {
            role.guild_id = id;
        }
    }

    pub fn role(&self, id: Snowflake) -> Option<&Role> {
        self.roles.get(&id)
    }

    /// Base permissions of the default role; empty if the payload omitted it.
    pub fn everyone_permissions(&self) -> Permissions {
        self.roles
            .get(&self.id)
            .map(|r| r.permissions)
            .unwrap_or_else(Permissions::empty)
    }
}

fn serialize_roles<S: Serializer>(
    roles: &HashMap<Snowflake, Role>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(roles.values())
}

fn deserialize_roles<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<Snowflake, Role>, D::Error> {
    let roles = Vec::<Role>::deserialize(deserializer)?;
    Ok(roles.into_iter().map(|r| (r.id, r)).collect())
}

/// A guild member. Role order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Snowflake,
    pub guild_id: Snowflake,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

impl Member {
    pub fn new(user_id: Snowflake, guild_id: Snowflake, roles: Vec<Snowflake>) -> Self {
        Self {
            user_id,
            guild_id,
            roles,
        }
    }
}
