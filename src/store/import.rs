//! Normalization of loosely shaped records coming from import files.

use crate::media::{
    clean_tags, detect_format, name_from_url, MediaRecord, MediaType,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// A record as found in an import document, before normalization.
///
/// Every field is optional; [`ImportCandidate::from_value`] accepts whatever
/// it can read and ignores the rest. `format` and `isHidden` are never taken
/// from the input: format is recomputed and the target partition decides
/// visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCandidate {
    pub id: Option<String>,
    pub url: Option<String>,
    pub media_type: Option<String>,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
    pub created_at: Option<i64>,
}

impl ImportCandidate {
    /// Reads a candidate out of an arbitrary JSON value.
    ///
    /// Non-object values produce an empty candidate, which import skips for
    /// lack of a URL. Numeric ids are accepted and stringified. Tags that are
    /// not strings are dropped.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let string_field = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        let id = match obj.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let tags = obj
            .get("tags")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let created_at = obj.get("createdAt").and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
        });

        Self {
            id,
            url: string_field("url"),
            media_type: string_field("type"),
            name: string_field("name"),
            tags,
            thumbnail: string_field("thumbnail"),
            created_at,
        }
    }
}

impl From<&MediaRecord> for ImportCandidate {
    fn from(record: &MediaRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            url: Some(record.url.clone()),
            media_type: Some(record.media_type.as_str().to_string()),
            name: Some(record.name.clone()),
            tags: record.tags.clone(),
            thumbnail: record.thumbnail.clone(),
            created_at: Some(record.created_at),
        }
    }
}

/// Outcome of [`MediaStore::import_items`](super::MediaStore::import_items).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Returns `base` if unused, otherwise the first free `base-N`.
pub(crate) fn unique_id(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1u64..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Turns a candidate into a public record, claiming its id in `taken`.
///
/// Returns `None` when the candidate has no usable URL.
pub(crate) fn normalize_candidate(
    candidate: &ImportCandidate,
    now_ms: i64,
    taken: &mut HashSet<String>,
) -> Option<MediaRecord> {
    let url = candidate.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;

    let media_type = MediaType::from_hint(candidate.media_type.as_deref());
    let name = candidate
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| name_from_url(url));

    let requested = candidate
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let id = match requested {
        Some(id) if !taken.contains(id) => id.to_string(),
        _ => unique_id(&now_ms.to_string(), taken),
    };
    taken.insert(id.clone());

    Some(MediaRecord {
        id,
        url: url.to_string(),
        media_type,
        format: detect_format(url, media_type),
        name,
        tags: clean_tags(&candidate.tags),
        thumbnail: candidate
            .thumbnail
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        created_at: candidate.created_at.unwrap_or(now_ms),
        is_hidden: false,
    })
}
