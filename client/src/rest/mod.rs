//! The REST seam. The core only needs one remote call, a message page fetch;
//! everything else the platform API offers lives outside this crate.

pub mod http;

use std::future::Future;

use crate::error::RestError;
use crate::model::{Message, Snowflake};

/// Largest page the message-list endpoint returns.
pub const MAX_PAGE_SIZE: usize = 100;

/// One message-list request. At most one cursor is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub limit: usize,
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub around: Option<Snowflake>,
}

impl PageRequest {
    /// Query-string pairs in the order the endpoint documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.limit.to_string())];
        if let Some(id) = self.before {
            pairs.push(("before", id.to_string()));
        }
        if let Some(id) = self.after {
            pairs.push(("after", id.to_string()));
        }
        if let Some(id) = self.around {
            pairs.push(("around", id.to_string()));
        }
        pairs
    }
}

/// Fetches one page of a channel's messages. Ordering of the returned page
/// is not guaranteed.
pub trait MessagePageSource {
    fn fetch_message_page(
        &self,
        channel_id: Snowflake,
        request: PageRequest,
    ) -> impl Future<Output = Result<Vec<Message>, RestError>> + Send;
}

impl<S: MessagePageSource + Sync> MessagePageSource for &S {
    fn fetch_message_page(
        &self,
        channel_id: Snowflake,
        request: PageRequest,
    ) -> impl Future<Output = Result<Vec<Message>, RestError>> + Send {
        (**self).fetch_message_page(channel_id, request)
    }
}
