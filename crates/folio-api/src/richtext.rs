//! Rich-text run model.
//!
//! A rich-text value is an ordered list of runs. Encoding appends runs in
//! call order; decoding returns both the structured run list and a flattened
//! plain string.

use serde_json::{json, Value as Json};

use crate::value::DateValue;

/// One run inside a rich-text value.
#[derive(Debug, Clone, PartialEq)]
pub enum RichTextRun {
    /// Plain text with an optional hyperlink.
    Text { content: String, link: Option<String> },

    /// An inline equation expression.
    Equation { expression: String },

    /// A mention of another object or a date.
    Mention(Mention),
}

/// Target of a mention run.
#[derive(Debug, Clone, PartialEq)]
pub enum Mention {
    Page { id: String },
    Database { id: String },
    User { id: String },
    Date(DateValue),
}

impl RichTextRun {
    /// Plain-text rendering of this run.
    pub fn plain_text(&self) -> String {
        match self {
            RichTextRun::Text { content, .. } => content.clone(),
            RichTextRun::Equation { expression } => expression.clone(),
            RichTextRun::Mention(Mention::Page { id })
            | RichTextRun::Mention(Mention::Database { id })
            | RichTextRun::Mention(Mention::User { id }) => id.clone(),
            RichTextRun::Mention(Mention::Date(date)) => date.display(),
        }
    }

    /// Encode this run into its wire fragment.
    pub fn encode(&self) -> Json {
        match self {
            RichTextRun::Text { content, link } => {
                let link = link
                    .as_ref()
                    .map(|url| json!({ "url": url }))
                    .unwrap_or(Json::Null);
                json!({
                    "type": "text",
                    "text": { "content": content, "link": link },
                })
            }
            RichTextRun::Equation { expression } => json!({
                "type": "equation",
                "equation": { "expression": expression },
            }),
            RichTextRun::Mention(mention) => {
                let body = match mention {
                    Mention::Page { id } => json!({ "type": "page", "page": { "id": id } }),
                    Mention::Database { id } => {
                        json!({ "type": "database", "database": { "id": id } })
                    }
                    Mention::User { id } => json!({ "type": "user", "user": { "id": id } }),
                    Mention::Date(date) => json!({ "type": "date", "date": date.encode() }),
                };
                json!({ "type": "mention", "mention": body })
            }
        }
    }

    /// Parse one wire run fragment.
    ///
    /// Fragments of an unrecognized run type fall back to a plain-text run
    /// built from their `plain_text` field so a response never fails to
    /// parse here.
    pub fn parse(fragment: &Json) -> Self {
        let run_type = fragment.get("type").and_then(Json::as_str).unwrap_or("");
        match run_type {
            "text" => {
                let text = fragment.get("text");
                let content = text
                    .and_then(|t| t.get("content"))
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string();
                let link = text
                    .and_then(|t| t.get("link"))
                    .and_then(|l| l.get("url"))
                    .and_then(Json::as_str)
                    .map(String::from);
                RichTextRun::Text { content, link }
            }
            "equation" => {
                let expression = fragment
                    .get("equation")
                    .and_then(|e| e.get("expression"))
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string();
                RichTextRun::Equation { expression }
            }
            "mention" => {
                let mention = fragment.get("mention");
                let mention_type = mention
                    .and_then(|m| m.get("type"))
                    .and_then(Json::as_str)
                    .unwrap_or("");
                let id_of = |key: &str| {
                    mention
                        .and_then(|m| m.get(key))
                        .and_then(|t| t.get("id"))
                        .and_then(Json::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                match mention_type {
                    "page" => RichTextRun::Mention(Mention::Page { id: id_of("page") }),
                    "database" => RichTextRun::Mention(Mention::Database {
                        id: id_of("database"),
                    }),
                    "user" => RichTextRun::Mention(Mention::User { id: id_of("user") }),
                    "date" => {
                        let date = mention
                            .and_then(|m| m.get("date"))
                            .map(DateValue::parse)
                            .unwrap_or_default();
                        RichTextRun::Mention(Mention::Date(date))
                    }
                    _ => RichTextRun::Text {
                        content: plain_text_of(fragment),
                        link: None,
                    },
                }
            }
            _ => RichTextRun::Text {
                content: plain_text_of(fragment),
                link: None,
            },
        }
    }
}

fn plain_text_of(fragment: &Json) -> String {
    fragment
        .get("plain_text")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string()
}

/// An ordered list of rich-text runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichText {
    runs: Vec<RichTextRun>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rich-text value holding a single plain run.
    pub fn plain(content: impl Into<String>) -> Self {
        Self::new().text(content)
    }

    /// Append a plain-text run.
    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.runs.push(RichTextRun::Text {
            content: content.into(),
            link: None,
        });
        self
    }

    /// Append a hyperlinked text run.
    pub fn link(mut self, content: impl Into<String>, url: impl Into<String>) -> Self {
        self.runs.push(RichTextRun::Text {
            content: content.into(),
            link: Some(url.into()),
        });
        self
    }

    /// Append an equation run.
    pub fn equation(mut self, expression: impl Into<String>) -> Self {
        self.runs.push(RichTextRun::Equation {
            expression: expression.into(),
        });
        self
    }

    /// Append a page mention.
    pub fn mention_page(mut self, id: impl Into<String>) -> Self {
        self.runs
            .push(RichTextRun::Mention(Mention::Page { id: id.into() }));
        self
    }

    /// Append a database mention.
    pub fn mention_database(mut self, id: impl Into<String>) -> Self {
        self.runs
            .push(RichTextRun::Mention(Mention::Database { id: id.into() }));
        self
    }

    /// Append a user mention.
    pub fn mention_user(mut self, id: impl Into<String>) -> Self {
        self.runs
            .push(RichTextRun::Mention(Mention::User { id: id.into() }));
        self
    }

    /// Append a date mention.
    pub fn mention_date(mut self, date: DateValue) -> Self {
        self.runs.push(RichTextRun::Mention(Mention::Date(date)));
        self
    }

    pub fn push(&mut self, run: RichTextRun) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[RichTextRun] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Flatten all runs into one plain string.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(RichTextRun::plain_text).collect()
    }

    /// Encode into a wire run array.
    pub fn encode(&self) -> Json {
        Json::Array(self.runs.iter().map(RichTextRun::encode).collect())
    }

    /// Parse a wire run array. Non-array fragments parse as empty.
    pub fn parse(fragment: &Json) -> Self {
        let runs = fragment
            .as_array()
            .map(|arr| arr.iter().map(RichTextRun::parse).collect())
            .unwrap_or_default();
        Self { runs }
    }
}

impl std::fmt::Display for RichText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.plain_text())
    }
}

impl From<&str> for RichText {
    fn from(s: &str) -> Self {
        RichText::plain(s)
    }
}

impl From<String> for RichText {
    fn from(s: String) -> Self {
        RichText::plain(s)
    }
}
