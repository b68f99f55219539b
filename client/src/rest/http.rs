use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use tracing::{trace, warn};

use super::{MessagePageSource, PageRequest};
use crate::config::{ApiSection, UserAgent};
use crate::error::RestError;
use crate::model::{Message, Snowflake};

/// `reqwest`-backed page source talking to the platform's HTTP API.
#[derive(Clone)]
pub struct HttpRestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpRestClient {
    pub fn new(api: &ApiSection, user_agent: &UserAgent) -> Result<Self, RestError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.as_str())
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: api.token.clone(),
        })
    }

    fn messages_url(&self, channel_id: Snowflake) -> String {
        format!("{}/channels/{}/messages", self.base_url, channel_id)
    }
}

impl MessagePageSource for HttpRestClient {
    async fn fetch_message_page(
        &self,
        channel_id: Snowflake,
        request: PageRequest,
    ) -> Result<Vec<Message>, RestError> {
        let mut req = self
            .http
            .get(self.messages_url(channel_id))
            .query(&request.query_pairs());
        if !self.token.is_empty() {
            req = req.header(AUTHORIZATION, format!("Bot {}", self.token));
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%channel_id, status = status.as_u16(), "message page fetch rejected");
            return Err(RestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let page: Vec<Message> = serde_json::from_slice(&bytes)?;
        trace!(%channel_id, returned = page.len(), "message page fetched");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url_trims_trailing_slash() {
        let api = ApiSection {
            base_url: "https://chat.example.org/api/v10/".into(),
            ..Default::default()
        };
        let client = HttpRestClient::new(&api, &UserAgent::default()).unwrap();
        assert_eq!(
            client.messages_url(Snowflake(81384788765712384)),
            "https://chat.example.org/api/v10/channels/81384788765712384/messages"
        );
    }

    #[tokio::test]
    async fn test_malformed_base_url_is_transport_error() {
        let api = ApiSection {
            base_url: "not a url".into(),
            ..Default::default()
        };
        let client = HttpRestClient::new(&api, &UserAgent::default()).unwrap();
        let err = client
            .fetch_message_page(Snowflake(1), PageRequest { limit: 1, ..Default::default() })
            .await
            .unwrap_err();
        // Rejected while building the request, before any connection.
        assert!(matches!(err, RestError::Transport(ref e) if e.is_builder()));
    }
}
