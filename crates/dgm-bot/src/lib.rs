//! Chat bot for searching and browsing DGM Live shows.
//!
//! Inbound messages are parsed into [`Command`]s and run by the
//! [`Dispatcher`] against a per-conversation [`Session`], producing either a
//! view that replaces the conversation's live message or a short-lived
//! notice. The [`Bot`] ties a dispatcher to a [`Transport`]: Discord over
//! REST, or a plain console.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod bot;
pub mod catalog;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod reply;
pub mod session;
pub mod transport;
pub mod view;

pub use bot::Bot;
pub use catalog::{Catalog, LocalCatalog};
pub use command::Command;
pub use dispatch::Dispatcher;
pub use error::{CatalogError, CatalogResult, DispatchError, TransportError, TransportResult};
pub use reply::{Embed, Notice, NoticeKind, Reply};
pub use session::{Session, SessionRegistry, PAGE_SIZE};
pub use transport::{
    ConsoleTransport, ConversationId, DiscordTransport, Inbound, MessageId, Outbound, Transport,
};
