//! Block content - discriminated union for the content types a block can
//! carry.
//!
//! Containers (content kinds that can hold child blocks) matter to the
//! editor layer: a newly created container must exist remotely before its
//! children can be appended beneath it.

use serde_json::{json, Value as Json};

use crate::richtext::RichText;

/// Content of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Paragraph { text: RichText },
    Heading { level: u8, text: RichText },
    BulletedListItem { text: RichText },
    NumberedListItem { text: RichText },
    ToDo { text: RichText, checked: bool },
    Toggle { text: RichText },
    Quote { text: RichText },
    Code { text: RichText, language: String },
    Divider,
    /// A kind this library does not model. Round-trips the raw payload.
    Unsupported { kind: String, raw: Json },
}

impl Default for BlockContent {
    fn default() -> Self {
        BlockContent::Paragraph {
            text: RichText::new(),
        }
    }
}

impl BlockContent {
    pub fn paragraph(text: impl Into<RichText>) -> Self {
        BlockContent::Paragraph { text: text.into() }
    }

    /// Heading levels are clamped to 1..=3, the range the wire supports.
    pub fn heading(level: u8, text: impl Into<RichText>) -> Self {
        BlockContent::Heading {
            level: level.clamp(1, 3),
            text: text.into(),
        }
    }

    pub fn bulleted(text: impl Into<RichText>) -> Self {
        BlockContent::BulletedListItem { text: text.into() }
    }

    pub fn numbered(text: impl Into<RichText>) -> Self {
        BlockContent::NumberedListItem { text: text.into() }
    }

    pub fn todo(text: impl Into<RichText>, checked: bool) -> Self {
        BlockContent::ToDo {
            text: text.into(),
            checked,
        }
    }

    pub fn toggle(text: impl Into<RichText>) -> Self {
        BlockContent::Toggle { text: text.into() }
    }

    pub fn quote(text: impl Into<RichText>) -> Self {
        BlockContent::Quote { text: text.into() }
    }

    pub fn code(text: impl Into<RichText>, language: impl Into<String>) -> Self {
        BlockContent::Code {
            text: text.into(),
            language: language.into(),
        }
    }

    pub fn divider() -> Self {
        BlockContent::Divider
    }

    /// The wire name of this content kind.
    pub fn wire_type(&self) -> &str {
        match self {
            BlockContent::Paragraph { .. } => "paragraph",
            BlockContent::Heading { level: 1, .. } => "heading_1",
            BlockContent::Heading { level: 2, .. } => "heading_2",
            BlockContent::Heading { .. } => "heading_3",
            BlockContent::BulletedListItem { .. } => "bulleted_list_item",
            BlockContent::NumberedListItem { .. } => "numbered_list_item",
            BlockContent::ToDo { .. } => "to_do",
            BlockContent::Toggle { .. } => "toggle",
            BlockContent::Quote { .. } => "quote",
            BlockContent::Code { .. } => "code",
            BlockContent::Divider => "divider",
            BlockContent::Unsupported { kind, .. } => kind,
        }
    }

    /// Whether blocks of this content kind may hold children remotely.
    pub fn can_have_children(&self) -> bool {
        matches!(
            self,
            BlockContent::Paragraph { .. }
                | BlockContent::BulletedListItem { .. }
                | BlockContent::NumberedListItem { .. }
                | BlockContent::ToDo { .. }
                | BlockContent::Toggle { .. }
                | BlockContent::Quote { .. }
        )
    }

    pub fn rich_text(&self) -> Option<&RichText> {
        match self {
            BlockContent::Paragraph { text }
            | BlockContent::Heading { text, .. }
            | BlockContent::BulletedListItem { text }
            | BlockContent::NumberedListItem { text }
            | BlockContent::ToDo { text, .. }
            | BlockContent::Toggle { text }
            | BlockContent::Quote { text }
            | BlockContent::Code { text, .. } => Some(text),
            BlockContent::Divider | BlockContent::Unsupported { .. } => None,
        }
    }

    pub fn rich_text_mut(&mut self) -> Option<&mut RichText> {
        match self {
            BlockContent::Paragraph { text }
            | BlockContent::Heading { text, .. }
            | BlockContent::BulletedListItem { text }
            | BlockContent::NumberedListItem { text }
            | BlockContent::ToDo { text, .. }
            | BlockContent::Toggle { text }
            | BlockContent::Quote { text }
            | BlockContent::Code { text, .. } => Some(text),
            BlockContent::Divider | BlockContent::Unsupported { .. } => None,
        }
    }

    /// Plain-text rendering, used for caches and display.
    pub fn plain_text(&self) -> String {
        self.rich_text().map(RichText::plain_text).unwrap_or_default()
    }

    /// Encode into a full block entry suitable for an append-children call.
    pub fn encode(&self) -> Json {
        let wire_type = self.wire_type().to_string();
        let payload = match self {
            BlockContent::ToDo { text, checked } => {
                json!({ "rich_text": text.encode(), "checked": checked })
            }
            BlockContent::Code { text, language } => {
                json!({ "rich_text": text.encode(), "language": language })
            }
            BlockContent::Divider => json!({}),
            BlockContent::Unsupported { raw, .. } => raw.clone(),
            other => {
                let text = other.rich_text().cloned().unwrap_or_default();
                json!({ "rich_text": text.encode() })
            }
        };
        json!({
            "object": "block",
            "type": wire_type,
            wire_type: payload,
        })
    }

    /// Parse a content payload for a block of the given wire type.
    ///
    /// Unrecognized types become `Unsupported` and never an error.
    pub fn parse(wire_type: &str, payload: &Json) -> Self {
        let text = || RichText::parse(payload.get("rich_text").unwrap_or(&Json::Null));
        match wire_type {
            "paragraph" => BlockContent::Paragraph { text: text() },
            "heading_1" => BlockContent::Heading {
                level: 1,
                text: text(),
            },
            "heading_2" => BlockContent::Heading {
                level: 2,
                text: text(),
            },
            "heading_3" => BlockContent::Heading {
                level: 3,
                text: text(),
            },
            "bulleted_list_item" => BlockContent::BulletedListItem { text: text() },
            "numbered_list_item" => BlockContent::NumberedListItem { text: text() },
            "to_do" => BlockContent::ToDo {
                text: text(),
                checked: payload
                    .get("checked")
                    .and_then(Json::as_bool)
                    .unwrap_or(false),
            },
            "toggle" => BlockContent::Toggle { text: text() },
            "quote" => BlockContent::Quote { text: text() },
            "code" => BlockContent::Code {
                text: text(),
                language: payload
                    .get("language")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "divider" => BlockContent::Divider,
            other => BlockContent::Unsupported {
                kind: other.to_string(),
                raw: payload.clone(),
            },
        }
    }
}

impl std::fmt::Display for BlockContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockContent::Code { language, text } => {
                write!(f, "[{}] {}", language, text.plain_text())
            }
            other => write!(f, "{}", other.plain_text()),
        }
    }
}
