use std::collections::VecDeque;

use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Error, RestError, Result};
use crate::model::{Channel, Message, Snowflake};
use crate::rest::{MAX_PAGE_SIZE, MessagePageSource, PageRequest};

/// Where a history walk starts and which way it moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAnchor {
    /// Newest messages first, starting from the most recent one.
    Latest,
    /// Messages older than the id, newest first.
    Before(Snowflake),
    /// Messages newer than the id, oldest first.
    After(Snowflake),
    /// Messages surrounding the id, oldest first. Single page only.
    Around(Snowflake),
}

impl HistoryAnchor {
    fn is_backward(self) -> bool {
        matches!(self, Self::Latest | Self::Before(_))
    }
}

/// Walk a channel's message history as a lazy stream.
///
/// Arguments are checked up front, before anything is fetched. Pages of up
/// to 100 messages are fetched only as the consumer drains the previous one.
/// Each page is re-sorted by id: backward walks yield newest first, forward
/// walks oldest first. The walk ends when `limit` messages have been yielded,
/// when a page comes back short, or when `cancel` fires before a fetch
/// (silently, no error). A REST failure is yielded once and ends the stream.
pub fn walk<S>(
    source: S,
    channel: &Channel,
    limit: i64,
    anchor: HistoryAnchor,
    cancel: CancellationToken,
) -> Result<impl Stream<Item = Result<Message>> + use<S>>
where
    S: MessagePageSource,
{
    if limit < 0 {
        return Err(Error::invalid(format!(
            "history limit must not be negative, got {limit}"
        )));
    }
    if matches!(anchor, HistoryAnchor::Around(_)) && limit > MAX_PAGE_SIZE as i64 {
        return Err(Error::invalid(format!(
            "around-anchored history is limited to {MAX_PAGE_SIZE} messages, got {limit}"
        )));
    }
    if !channel.kind.is_text_capable() {
        return Err(Error::invalid(format!(
            "channel {} ({:?}) has no message history",
            channel.id, channel.kind
        )));
    }

    let remaining = usize::try_from(limit).unwrap_or(usize::MAX);
    let state = Walk {
        source,
        channel_id: channel.id,
        anchor,
        remaining,
        cursor: None,
        buffered: VecDeque::new(),
        exhausted: remaining == 0,
        cancel,
    };

    Ok(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(message) = state.buffered.pop_front() {
                return Some((Ok::<_, Error>(message), state));
            }
            if state.exhausted {
                return None;
            }
            if state.cancel.is_cancelled() {
                trace!(channel_id = %state.channel_id, "history walk cancelled");
                return None;
            }
            if let Err(e) = state.fetch_page().await {
                state.exhausted = true;
                return Some((Err(Error::from(e)), state));
            }
        }
    }))
}

struct Walk<S> {
    source: S,
    channel_id: Snowflake,
    anchor: HistoryAnchor,
    /// Messages still owed to the consumer.
    remaining: usize,
    /// Last id seen in the walk direction; replaces the anchor after page one.
    cursor: Option<Snowflake>,
    buffered: VecDeque<Message>,
    exhausted: bool,
    cancel: CancellationToken,
}

impl<S: MessagePageSource> Walk<S> {
    fn next_request(&self, limit: usize) -> PageRequest {
        let mut req = PageRequest {
            limit,
            ..Default::default()
        };
        match self.anchor {
            HistoryAnchor::Latest => req.before = self.cursor,
            HistoryAnchor::Before(id) => req.before = Some(self.cursor.unwrap_or(id)),
            HistoryAnchor::After(id) => req.after = Some(self.cursor.unwrap_or(id)),
            HistoryAnchor::Around(id) => req.around = Some(id),
        }
        req
    }

    async fn fetch_page(&mut self) -> std::result::Result<(), RestError> {
        let limit = self.remaining.min(MAX_PAGE_SIZE);
        let request = self.next_request(limit);
        let mut page = self
            .source
            .fetch_message_page(self.channel_id, request)
            .await?;
        let returned = page.len();
        trace!(
            channel_id = %self.channel_id,
            limit,
            before = ?request.before,
            after = ?request.after,
            around = ?request.around,
            returned,
            "fetched history page"
        );

        // The endpoint's ordering is not reliable; normalize before yielding.
        page.sort_unstable_by_key(|m| m.id);
        if self.anchor.is_backward() {
            page.reverse();
        }
        if let HistoryAnchor::Around(id) = self.anchor {
            centre_on(&mut page, id, limit);
        } else {
            page.truncate(limit);
        }

        if let Some(last) = page.last() {
            self.cursor = Some(last.id);
        }
        self.remaining -= page.len();
        self.buffered.extend(page);

        if self.remaining == 0
            || returned < MAX_PAGE_SIZE
            || matches!(self.anchor, HistoryAnchor::Around(_))
        {
            self.exhausted = true;
        }
        Ok(())
    }
}

/// Trim an ascending page to at most `limit` messages, keeping the window
/// centred on `anchor` and shifting it inward at either end.
fn centre_on(page: &mut Vec<Message>, anchor: Snowflake, limit: usize) {
    if page.len() <= limit {
        return;
    }
    let pivot = page.partition_point(|m| m.id < anchor);
    let start = pivot.saturating_sub(limit / 2).min(page.len() - limit);
    page.drain(..start);
    page.truncate(limit);
}
