//! Discord over its REST API.
//!
//! The configured channels are polled for new messages; replies are posted
//! as embeds or plain content and removed with message deletes. Only
//! messages that arrive after the bot starts are seen.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{TransportError, TransportResult};
use crate::reply::Embed;
use crate::transport::{ConversationId, Inbound, MessageId, Outbound, Transport};

/// Discord REST API root.
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Messages fetched per channel poll.
const POLL_LIMIT: &str = "50";

#[derive(Debug, Clone, Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(default)]
    content: String,
    author: ApiUser,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUser {
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Debug, Serialize)]
struct ApiEmbed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<ApiUrl<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<ApiField<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<ApiFooter<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct ApiFooter<'a> {
    text: &'a str,
}

impl<'a> From<&'a Embed> for ApiEmbed<'a> {
    fn from(embed: &'a Embed) -> Self {
        Self {
            title: &embed.title,
            description: embed.description.as_deref(),
            url: embed.url.as_deref(),
            thumbnail: embed.thumbnail.as_deref().map(|url| ApiUrl { url }),
            fields: embed
                .fields
                .iter()
                .map(|f| ApiField {
                    name: &f.name,
                    value: &f.value,
                    inline: f.inline,
                })
                .collect(),
            footer: embed.footer.as_deref().map(|text| ApiFooter { text }),
        }
    }
}

/// The JSON body that posts `message`.
fn message_payload(message: &Outbound) -> serde_json::Value {
    match message {
        Outbound::Embed(embed) => serde_json::json!({ "embeds": [ApiEmbed::from(embed)] }),
        Outbound::Text(text) => serde_json::json!({ "content": text }),
    }
}

fn snowflake(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}

/// Inbound messages from one poll, oldest first, plus the newest id seen.
/// Messages from bots (including this one) are dropped.
fn collect_inbound(
    channel: &str,
    mut messages: Vec<ApiMessage>,
) -> (Vec<Inbound>, Option<String>) {
    messages.sort_by_key(|m| snowflake(&m.id));
    let newest = messages.last().map(|m| m.id.clone());

    let inbound = messages
        .into_iter()
        .filter(|m| !m.author.bot)
        .map(|m| Inbound {
            conversation: ConversationId::new(channel),
            message: MessageId::new(m.id),
            text: m.content,
        })
        .collect();

    (inbound, newest)
}

/// A bot account polling a fixed set of channels.
pub struct DiscordTransport {
    http: Client,
    api_base: String,
    token: String,
    channels: Vec<String>,
    poll_interval: Duration,
    backoff: ExponentialBuilder,

    /// Newest message id seen per channel; absent until the first poll.
    cursors: Mutex<HashMap<String, String>>,
    pending: Mutex<VecDeque<Inbound>>,
}

impl fmt::Debug for DiscordTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordTransport")
            .field("api_base", &self.api_base)
            .field("channels", &self.channels)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl DiscordTransport {
    pub fn new(
        token: impl Into<String>,
        channels: Vec<String>,
        poll_interval: Duration,
    ) -> TransportResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                "DiscordBot (https://github.com/JakeStanger/DGM-Fetcher, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;

        Ok(Self {
            http,
            api_base: API_BASE.to_string(),
            token: token.into(),
            channels,
            poll_interval,
            backoff: ExponentialBuilder::default().with_max_times(3),
            cursors: Mutex::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
        })
    }

    /// Talk to a different API root.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Map error statuses to errors, passing successful responses through.
    async fn check(response: Response) -> TransportResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body: RateLimitBody = response.json().await?;
            return Err(TransportError::RateLimited {
                retry_after: body.retry_after,
            });
        }

        Err(TransportError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }

    async fn get_messages(
        &self,
        channel: &str,
        after: Option<&str>,
    ) -> TransportResult<Vec<ApiMessage>> {
        let mut request = self.request(Method::GET, &format!("/channels/{channel}/messages"));
        request = match after {
            Some(after) => request.query(&[("after", after), ("limit", POLL_LIMIT)]),
            None => request.query(&[("limit", "1")]),
        };

        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn get_messages_with_retry(
        &self,
        channel: &str,
        after: Option<&str>,
    ) -> TransportResult<Vec<ApiMessage>> {
        (|| self.get_messages(channel, after))
            .retry(self.backoff)
            .sleep(tokio::time::sleep)
            .when(TransportError::is_transient)
            .notify(|err: &TransportError, dur: Duration| {
                log::warn!("Polling channel {} failed ({}), retrying in {:?}", channel, err, dur);
            })
            .await
    }

    /// Poll every channel once, queueing new messages.
    /// Fails only when every channel did; a channel that errors is logged
    /// and tried again on the next poll.
    async fn poll(&self) -> TransportResult<()> {
        let mut last_error = None;
        let mut any_ok = false;

        for channel in &self.channels {
            let cursor = self.cursors.lock().await.get(channel).cloned();
            let messages = match self
                .get_messages_with_retry(channel, cursor.as_deref())
                .await
            {
                Ok(messages) => messages,
                Err(e) => {
                    log::warn!("Skipping channel {} this poll: {}", channel, e);
                    last_error = Some(e);
                    continue;
                }
            };
            any_ok = true;
            let (inbound, newest) = collect_inbound(channel, messages);

            match cursor {
                // First poll only marks where the history ends.
                None => {
                    let start = newest.unwrap_or_else(|| "0".to_string());
                    log::debug!("Listening on channel {} after message {}", channel, start);
                    self.cursors.lock().await.insert(channel.clone(), start);
                }
                Some(_) => {
                    if let Some(newest) = newest {
                        self.cursors.lock().await.insert(channel.clone(), newest);
                    }
                    self.pending.lock().await.extend(inbound);
                }
            }
        }

        match last_error {
            Some(e) if !any_ok => Err(e),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    async fn next_inbound(&self) -> TransportResult<Option<Inbound>> {
        if self.channels.is_empty() {
            log::warn!("No channels configured, nothing to listen to");
            return Ok(None);
        }

        loop {
            if let Some(message) = self.pending.lock().await.pop_front() {
                return Ok(Some(message));
            }

            self.poll().await?;

            if self.pending.lock().await.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    async fn send(
        &self,
        conversation: &ConversationId,
        message: &Outbound,
    ) -> TransportResult<MessageId> {
        let response = self
            .request(
                Method::POST,
                &format!("/channels/{}/messages", conversation.as_str()),
            )
            .json(&message_payload(message))
            .send()
            .await?;

        let posted: ApiMessage = Self::check(response).await?.json().await?;
        Ok(MessageId::new(posted.id))
    }

    async fn delete(
        &self,
        conversation: &ConversationId,
        message: &MessageId,
    ) -> TransportResult<()> {
        let response = self
            .request(
                Method::DELETE,
                &format!(
                    "/channels/{}/messages/{}",
                    conversation.as_str(),
                    message.as_str()
                ),
            )
            .send()
            .await?;

        // Already gone is as good as deleted.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}
