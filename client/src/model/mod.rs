//! Entity snapshots the client core operates on.

pub mod channel;
pub mod guild;
pub mod message;
pub mod snowflake;

pub use channel::{Channel, ChannelType};
pub use guild::{Guild, Member, Role};
pub use message::{Author, Message};
pub use snowflake::Snowflake;
