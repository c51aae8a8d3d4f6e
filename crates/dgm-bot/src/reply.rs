//! What the dispatcher hands back to the transport.

use serde::{Deserialize, Serialize};

/// A rich message: title, body text and labelled fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Embed {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }

    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Value of the first field called `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The user asked for something that cannot be done yet.
    Guidance,

    /// The catalog failed; nothing the user did wrong.
    Unavailable,
}

/// A short-lived plain text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// The outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Replaces the conversation's live message.
    View(Embed),

    /// Posted alongside the live message and removed after a delay.
    Notice(Notice),
}

impl Reply {
    pub fn guidance(text: impl Into<String>) -> Self {
        Self::Notice(Notice {
            kind: NoticeKind::Guidance,
            text: text.into(),
        })
    }

    pub fn unavailable(text: impl Into<String>) -> Self {
        Self::Notice(Notice {
            kind: NoticeKind::Unavailable,
            text: text.into(),
        })
    }

    pub fn as_view(&self) -> Option<&Embed> {
        match self {
            Self::View(embed) => Some(embed),
            Self::Notice(_) => None,
        }
    }

    pub fn as_notice(&self) -> Option<&Notice> {
        match self {
            Self::Notice(notice) => Some(notice),
            Self::View(_) => None,
        }
    }
}
