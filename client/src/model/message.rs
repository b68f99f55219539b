use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snowflake::Snowflake;

/// The author fields this client reads from a message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
}

/// A channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(id: Snowflake, channel_id: Snowflake, content: impl Into<String>) -> Self {
        Self {
            id,
            channel_id,
            author: None,
            content: content.into(),
            edited_timestamp: None,
        }
    }

    /// Creation time, decoded from the id.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.id.created_at()
    }
}
