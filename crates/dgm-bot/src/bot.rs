//! The bot loop: read a message, dispatch it, keep each conversation down to
//! one live view.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::Catalog;
use crate::dispatch::Dispatcher;
use crate::error::TransportResult;
use crate::reply::{Notice, Reply};
use crate::session::SessionRegistry;
use crate::transport::{ConversationId, Inbound, MessageId, Outbound, Transport};

/// How long notices stay up unless configured otherwise.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(3);

/// How long a quiet conversation keeps its session unless configured
/// otherwise.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(3600);

/// Wait after the first failed read; doubled, tripled and so on after more.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Consecutive failed reads after which [`Bot::run`] gives up.
pub const MAX_READ_FAILURES: u32 = 10;

#[derive(Debug)]
pub struct Bot<C, T> {
    dispatcher: Dispatcher<C>,
    transport: Arc<T>,
    sessions: SessionRegistry,
    notice_ttl: Duration,
    retry_delay: Duration,
}

impl<C, T> Bot<C, T>
where
    C: Catalog,
    T: Transport + 'static,
{
    pub fn new(dispatcher: Dispatcher<C>, transport: Arc<T>) -> Self {
        Self {
            dispatcher,
            transport,
            sessions: SessionRegistry::new(DEFAULT_SESSION_IDLE),
            notice_ttl: DEFAULT_NOTICE_TTL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.sessions = SessionRegistry::new(idle);
        self
    }

    /// Base wait after a failed read; grows with each consecutive failure.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Handle messages until the transport closes.
    ///
    /// Read failures are logged and retried; only [`MAX_READ_FAILURES`]
    /// failures in a row stop the bot. Catalog calls block, so this must
    /// run on a multi-threaded runtime.
    pub async fn run(&mut self) -> TransportResult<()> {
        log::info!(
            "Listening for commands with prefix '{}'",
            self.dispatcher.prefix()
        );

        let mut failures: u32 = 0;
        loop {
            match self.transport.next_inbound().await {
                Ok(Some(inbound)) => {
                    failures = 0;
                    self.handle(inbound).await;
                }
                Ok(None) => break,
                Err(e) => {
                    failures += 1;
                    if failures >= MAX_READ_FAILURES {
                        log::error!("Giving up after {} failed reads: {}", failures, e);
                        return Err(e);
                    }
                    let wait = self.retry_delay * failures;
                    log::warn!(
                        "Reading messages failed ({}), retrying in {:?} (transient: {})",
                        e,
                        wait,
                        e.is_transient()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        log::info!("Transport closed, stopping");
        Ok(())
    }

    /// Dispatch one message and post whatever it produced.
    ///
    /// The command runs against a copy of the session, which replaces the
    /// stored one only once the reply is posted.
    pub async fn handle(&mut self, inbound: Inbound) {
        let now = Instant::now();
        self.sessions.evict_idle(now);

        let session = self.sessions.session(&inbound.conversation, now);
        let mut staged = session.clone();
        let dispatcher = &self.dispatcher;
        let reply =
            tokio::task::block_in_place(|| dispatcher.handle(&mut staged, &inbound.text));

        let Some(reply) = reply else {
            *session = staged;
            return;
        };
        let transport = &*self.transport;
        let conversation = &inbound.conversation;

        match reply {
            Reply::View(embed) => {
                let sent = match transport.send(conversation, &Outbound::Embed(embed)).await {
                    Ok(id) => id,
                    Err(e) => {
                        log::error!("Failed to post view in {}: {}", conversation, e);
                        return;
                    }
                };
                let previous = staged.last_outbound.replace(sent);
                *session = staged;

                if let Some(previous) = previous {
                    delete_quietly(transport, conversation, &previous).await;
                }
                delete_quietly(transport, conversation, &inbound.message).await;
            }
            Reply::Notice(notice) => {
                if Self::post_notice(&self.transport, self.notice_ttl, conversation, notice).await
                {
                    *session = staged;
                    delete_quietly(transport, conversation, &inbound.message).await;
                }
            }
        }
    }

    /// Post a notice and schedule its removal. Returns `false` when it
    /// could not be posted.
    async fn post_notice(
        transport: &Arc<T>,
        ttl: Duration,
        conversation: &ConversationId,
        notice: Notice,
    ) -> bool {
        log::debug!("{:?} notice in {}: {}", notice.kind, conversation, notice.text);

        let sent = match transport
            .send(conversation, &Outbound::Text(notice.text))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                log::error!("Failed to post notice in {}: {}", conversation, e);
                return false;
            }
        };

        let transport = Arc::clone(transport);
        let conversation = conversation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            delete_quietly(&*transport, &conversation, &sent).await;
        });
        true
    }
}

/// Delete a message, logging instead of failing.
async fn delete_quietly<T: Transport + ?Sized>(
    transport: &T,
    conversation: &ConversationId,
    message: &MessageId,
) {
    if let Err(e) = transport.delete(conversation, message).await {
        log::warn!("Could not delete message {} in {}: {}", message, conversation, e);
    }
}
