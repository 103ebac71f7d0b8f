//! Content identity and metadata types.
//!
//! Every indexed item is owned by an external subsystem (directory, events,
//! learning, knowledge base) and referenced here by a [`ContentKey`]: the kind
//! of entity plus an opaque id. The key is the identity of an indexed item and
//! is never reused for a different underlying entity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};

/// The kind of entity an indexed item refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A member's public directory profile.
    MemberProfile,
    /// A chapter or national event.
    Event,
    /// A course in the learning catalog.
    Course,
    /// A single lesson within a course.
    Lesson,
    /// A document from the knowledge base.
    #[default]
    Document,
    /// A frequently-asked question.
    Faq,
    /// A published article.
    Article,
}

impl ContentType {
    /// All content types, in declaration order.
    pub const ALL: [ContentType; 7] = [
        ContentType::MemberProfile,
        ContentType::Event,
        ContentType::Course,
        ContentType::Lesson,
        ContentType::Document,
        ContentType::Faq,
        ContentType::Article,
    ];

    /// Get the canonical name of this content type.
    pub fn name(&self) -> &'static str {
        match self {
            ContentType::MemberProfile => "member_profile",
            ContentType::Event => "event",
            ContentType::Course => "course",
            ContentType::Lesson => "lesson",
            ContentType::Document => "document",
            ContentType::Faq => "faq",
            ContentType::Article => "article",
        }
    }

    /// Parse a content type from its canonical name.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "member_profile" | "member" => Ok(ContentType::MemberProfile),
            "event" => Ok(ContentType::Event),
            "course" => Ok(ContentType::Course),
            "lesson" => Ok(ContentType::Lesson),
            "document" => Ok(ContentType::Document),
            "faq" => Ok(ContentType::Faq),
            "article" => Ok(ContentType::Article),
            _ => Err(TesseraError::invalid_operation(format!(
                "unknown content type: {s}"
            ))),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The identity of an indexed item: content type plus opaque entity id.
///
/// Keys order by content type first, then id; that ordering is the
/// deterministic tie-break used everywhere a ranked list must resolve equal
/// scores.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    /// The kind of entity this item refers to.
    pub content_type: ContentType,
    /// Opaque reference to the owning entity.
    pub content_id: String,
}

impl ContentKey {
    /// Create a new content key.
    pub fn new<S: Into<String>>(content_type: ContentType, content_id: S) -> Self {
        Self {
            content_type,
            content_id: content_id.into(),
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_type, self.content_id)
    }
}

/// A metadata value attached to an indexed item.
///
/// Metadata serves both display (title, dates) and filter predicates
/// (ownership scope, categorical attributes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A string value.
    Str(String),
    /// A numeric value.
    Num(f64),
    /// A boolean value.
    Bool(bool),
}

impl MetadataValue {
    /// Get the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a number, if it is one.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            MetadataValue::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Str(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Str(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Num(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// The open key-value metadata map carried by every indexed item.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Raw lexical fields of a content item, prior to analysis.
///
/// Field weights at scoring time follow the order below: title highest, then
/// description, then body, tags lowest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalFields {
    /// The item's title.
    pub title: String,
    /// A short description or summary.
    #[serde(default)]
    pub description: String,
    /// The main body text.
    #[serde(default)]
    pub body: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LexicalFields {
    /// Create lexical fields with just a title.
    pub fn with_title<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Set the body.
    pub fn body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = body.into();
        self
    }

    /// Set the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// True when every field is empty.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.body.is_empty()
            && self.tags.is_empty()
    }
}
