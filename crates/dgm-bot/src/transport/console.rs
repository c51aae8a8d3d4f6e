//! A single-conversation transport over a terminal.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::error::TransportResult;
use crate::transport::{ConversationId, Inbound, MessageId, Outbound, Transport};
use crate::view::render_text;

/// The one conversation a console carries.
pub const CONSOLE_CONVERSATION: &str = "console";

/// Reads commands line by line and prints replies as plain text. Messages
/// cannot be deleted from a terminal, so deletes do nothing.
#[derive(Debug)]
pub struct ConsoleTransport<R, W> {
    lines: Mutex<Lines<R>>,
    writer: Mutex<W>,
    next_id: AtomicU64,
}

impl ConsoleTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// A console on stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            writer: Mutex::new(writer),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn conversation() -> ConversationId {
        ConversationId::new(CONSOLE_CONVERSATION)
    }

    /// Give back the writer, e.g. to inspect what was printed.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(self.next_id.fetch_add(1, Ordering::Relaxed).to_string())
    }
}

#[async_trait]
impl<R, W> Transport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_inbound(&self) -> TransportResult<Option<Inbound>> {
        let mut lines = self.lines.lock().await;
        loop {
            let Some(line) = lines.next_line().await? else {
                return Ok(None);
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            return Ok(Some(Inbound {
                conversation: Self::conversation(),
                message: self.next_message_id(),
                text: text.to_string(),
            }));
        }
    }

    async fn send(
        &self,
        _conversation: &ConversationId,
        message: &Outbound,
    ) -> TransportResult<MessageId> {
        let text = match message {
            Outbound::Embed(embed) => render_text(embed),
            Outbound::Text(text) => text.clone(),
        };

        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n\n").await?;
        writer.flush().await?;

        Ok(self.next_message_id())
    }

    async fn delete(
        &self,
        _conversation: &ConversationId,
        message: &MessageId,
    ) -> TransportResult<()> {
        log::trace!("Console cannot delete message {}", message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::Embed;

    #[tokio::test]
    async fn test_reads_non_empty_lines() {
        let input: &[u8] = b"$search fripp\n\n   \n$next\n";
        let console = ConsoleTransport::new(input, Vec::new());

        let first = console.next_inbound().await.unwrap().unwrap();
        assert_eq!(first.text, "$search fripp");
        assert_eq!(first.conversation, ConsoleTransport::<&[u8], Vec<u8>>::conversation());

        let second = console.next_inbound().await.unwrap().unwrap();
        assert_eq!(second.text, "$next");
        assert_ne!(first.message, second.message);

        assert!(console.next_inbound().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_renders_text() {
        let input: &[u8] = b"";
        let console = ConsoleTransport::new(input, Vec::new());
        let conversation = ConsoleTransport::<&[u8], Vec<u8>>::conversation();

        console
            .send(&conversation, &Outbound::Embed(Embed::new("Help").description("**x**")))
            .await
            .unwrap();
        console
            .send(&conversation, &Outbound::Text("notice".to_string()))
            .await
            .unwrap();

        let printed = String::from_utf8(console.into_writer()).unwrap();
        assert_eq!(printed, "== Help ==\nx\n\nnotice\n\n");
    }
}
