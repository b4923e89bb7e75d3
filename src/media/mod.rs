//! Media record model.
//!
//! A [`MediaRecord`] is one bookmarked resource. Records live in exactly one
//! [`Partition`] at a time; `is_hidden` mirrors which one.

pub mod classify;

pub use self::classify::detect_format;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse, user-supplied kind of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    #[default]
    Other,
}

impl MediaType {
    /// Parses a type hint, mapping anything unrecognized to `Other`.
    ///
    /// ```
    /// use mediashelf::media::MediaType;
    ///
    /// assert_eq!(MediaType::from_hint(Some(" Video ")), MediaType::Video);
    /// assert_eq!(MediaType::from_hint(Some("gif")), MediaType::Other);
    /// assert_eq!(MediaType::from_hint(None), MediaType::Other);
    /// ```
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_lowercase()).as_deref() {
            Some("image") => MediaType::Image,
            Some("video") => MediaType::Video,
            _ => MediaType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Other => "other",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived classification of a record, see [`detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Image,
    Video,
    Website,
    Document,
    Other,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Image => "image",
            MediaFormat::Video => "video",
            MediaFormat::Website => "website",
            MediaFormat::Document => "document",
            MediaFormat::Other => "other",
        }
    }

    /// Parses a stored format name; `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaFormat::Image),
            "video" => Some(MediaFormat::Video),
            "website" => Some(MediaFormat::Website),
            "document" => Some(MediaFormat::Document),
            "other" => Some(MediaFormat::Other),
            _ => None,
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two independent record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Public,
    Hidden,
}

impl Partition {
    pub fn is_hidden(&self) -> bool {
        matches!(self, Partition::Hidden)
    }
}

/// A bookmarked resource.
///
/// Serialized in camelCase with `type` for the media type, matching the
/// export document layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub format: MediaFormat,
    pub name: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub is_hidden: bool,
}

impl MediaRecord {
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Input for creating a record. Validation (non-empty url, at least one tag)
/// belongs to the caller; the store only normalizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaDraft {
    pub url: String,
    pub media_type: Option<MediaType>,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
}

impl MediaDraft {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// Partial update for [`crate::store::MediaStore::update_item`].
///
/// `thumbnail: Some(None)` clears the thumbnail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPatch {
    pub url: Option<String>,
    pub media_type: Option<MediaType>,
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub thumbnail: Option<Option<String>>,
}

impl MediaPatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.media_type.is_none()
            && self.name.is_none()
            && self.tags.is_none()
            && self.thumbnail.is_none()
    }
}

/// Deduplication key for URLs: trimmed and lowercased.
pub fn normalize_url_key(url: &str) -> String {
    url.trim().to_lowercase()
}

/// Display name fallback: the URL host without a leading `www.`, or the
/// trimmed URL when no host can be parsed.
///
/// ```
/// use mediashelf::media::name_from_url;
///
/// assert_eq!(name_from_url("https://www.example.com/a/b"), "example.com");
/// assert_eq!(name_from_url("not a url"), "not a url");
/// ```
pub fn name_from_url(url: &str) -> String {
    let trimmed = url.trim();
    match url::Url::parse(trimmed) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => host.trim_start_matches("www.").to_string(),
            _ => trimmed.to_string(),
        },
        Err(_) => trimmed.to_string(),
    }
}

/// Trims tags, drops empty ones and repeats, keeping first-seen order.
pub fn clean_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}
