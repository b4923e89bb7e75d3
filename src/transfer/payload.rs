//! Export document model and the import document parser.

use crate::constants::EXPORT_VERSION;
use crate::crypto::VaultConfig;
use crate::errors::ImportError;
use crate::media::MediaRecord;
use crate::store::{ImportCandidate, MediaStore};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Current export document.
///
/// ```json
/// { "version": 2, "exportedAt": "...", "items": [...],
///   "hiddenItems": [...], "vaultConfig": {...} }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub version: u32,
    pub exported_at: String,
    pub items: Vec<MediaRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_items: Option<Vec<MediaRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_config: Option<VaultConfig>,
}

/// Builds an export of the store.
///
/// Hidden records are only exported together with the verifier that protects
/// them: pass the vault's config to include them, `None` to export the public
/// partition alone.
pub fn export_payload(
    store: &MediaStore,
    vault_config: Option<&VaultConfig>,
    now: DateTime<Utc>,
) -> ExportPayload {
    let items = store.items();
    let (hidden_items, vault_config) = match vault_config {
        Some(config) => (Some(store.hidden_items()), Some(config.clone())),
        None => (None, None),
    };

    debug!(
        "Exporting {} public and {} hidden records",
        items.len(),
        hidden_items.as_ref().map_or(0, Vec::len)
    );

    ExportPayload {
        version: EXPORT_VERSION,
        exported_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        items,
        hidden_items,
        vault_config,
    }
}

/// Versioned import document after shape detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionedImport {
    pub version: Option<u64>,
    pub items: Vec<Value>,
    pub hidden_items: Vec<Value>,
    pub vault_config: Option<VaultConfig>,
}

/// An import document, classified once by [`ImportRequest::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ImportRequest {
    /// A bare array of records.
    Legacy(Vec<Value>),
    /// An object with an `items` array and optional vault data.
    Versioned(VersionedImport),
}

impl ImportRequest {
    /// Parses and classifies an import document.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Json` for malformed JSON and
    /// `ImportError::UnrecognizedShape` for anything that is neither an array
    /// nor an object with an `items` array.
    ///
    /// ```
    /// use mediashelf::transfer::ImportRequest;
    ///
    /// assert!(matches!(ImportRequest::parse("[]"), Ok(ImportRequest::Legacy(_))));
    /// assert!(matches!(
    ///     ImportRequest::parse(r#"{"version": 2, "items": []}"#),
    ///     Ok(ImportRequest::Versioned(_))
    /// ));
    /// assert!(ImportRequest::parse(r#"{"records": []}"#).is_err());
    /// ```
    pub fn parse(json: &str) -> Result<Self, ImportError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ImportError> {
        match value {
            Value::Array(items) => Ok(ImportRequest::Legacy(items)),
            Value::Object(mut obj) => {
                let items = match obj.remove("items") {
                    Some(Value::Array(items)) => items,
                    Some(other) => {
                        return Err(ImportError::UnrecognizedShape(format!(
                            "an object whose `items` is {}",
                            describe(&other)
                        )))
                    }
                    None => {
                        return Err(ImportError::UnrecognizedShape(
                            "an object without `items`".to_string(),
                        ))
                    }
                };

                let hidden_items = match obj.remove("hiddenItems") {
                    Some(Value::Array(hidden)) => hidden,
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => {
                        warn!("Ignoring hiddenItems of type {}", describe(&other));
                        Vec::new()
                    }
                };

                let vault_config = match obj.remove("vaultConfig") {
                    Some(Value::Null) | None => None,
                    Some(raw) => match serde_json::from_value::<VaultConfig>(raw) {
                        Ok(config) => Some(config),
                        Err(e) => {
                            warn!("Ignoring unreadable vaultConfig: {}", e);
                            None
                        }
                    },
                };

                Ok(ImportRequest::Versioned(VersionedImport {
                    version: obj.get("version").and_then(Value::as_u64),
                    items,
                    hidden_items,
                    vault_config,
                }))
            }
            other => Err(ImportError::UnrecognizedShape(describe(&other).to_string())),
        }
    }

    /// Public record candidates.
    pub fn candidates(&self) -> Vec<ImportCandidate> {
        let values = match self {
            ImportRequest::Legacy(items) => items,
            ImportRequest::Versioned(doc) => &doc.items,
        };
        values.iter().map(ImportCandidate::from_value).collect()
    }

    /// Hidden record candidates; always empty for legacy documents.
    pub fn hidden_candidates(&self) -> Vec<ImportCandidate> {
        match self {
            ImportRequest::Legacy(_) => Vec::new(),
            ImportRequest::Versioned(doc) => doc
                .hidden_items
                .iter()
                .map(ImportCandidate::from_value)
                .collect(),
        }
    }

    pub fn vault_config(&self) -> Option<&VaultConfig> {
        match self {
            ImportRequest::Legacy(_) => None,
            ImportRequest::Versioned(doc) => doc.vault_config.as_ref(),
        }
    }
}

impl From<&ExportPayload> for ImportRequest {
    fn from(payload: &ExportPayload) -> Self {
        let to_values = |records: &[MediaRecord]| {
            records
                .iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect::<Vec<_>>()
        };
        ImportRequest::Versioned(VersionedImport {
            version: Some(u64::from(payload.version)),
            items: to_values(&payload.items),
            hidden_items: payload
                .hidden_items
                .as_deref()
                .map(to_values)
                .unwrap_or_default(),
            vault_config: payload.vault_config.clone(),
        })
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_array() {
        let request = ImportRequest::parse(r#"[{"url": "https://a.test"}, 3]"#).unwrap();
        let candidates = request.candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url.as_deref(), Some("https://a.test"));
        assert!(candidates[1].url.is_none());
        assert!(request.hidden_candidates().is_empty());
        assert!(request.vault_config().is_none());
    }

    #[test]
    fn test_parse_versioned_with_vault() {
        let json = r#"{
            "version": 2,
            "exportedAt": "2024-01-01T00:00:00.000Z",
            "items": [{"url": "https://a.test"}],
            "hiddenItems": [{"url": "https://h.test", "tags": ["s"]}],
            "vaultConfig": {"salt": "c2FsdA==", "derivedHash": "aGFzaA==", "iterations": 1000, "algorithm": "PBKDF2-SHA256"}
        }"#;
        let request = ImportRequest::parse(json).unwrap();

        let ImportRequest::Versioned(doc) = &request else {
            panic!("expected versioned document");
        };
        assert_eq!(doc.version, Some(2));
        assert_eq!(request.candidates().len(), 1);
        assert_eq!(request.hidden_candidates()[0].tags, vec!["s"]);
        assert_eq!(request.vault_config().unwrap().iterations, 1000);
    }

    #[test]
    fn test_parse_rejects_unknown_shapes() {
        for json in [r#"{"records": []}"#, r#"{"items": {}}"#, "42", r#""text""#, "null"] {
            assert!(
                matches!(
                    ImportRequest::parse(json),
                    Err(ImportError::UnrecognizedShape(_))
                ),
                "should reject {}",
                json
            );
        }
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(
            ImportRequest::parse("[{"),
            Err(ImportError::Json(_))
        ));
    }

    #[test]
    fn test_unreadable_vault_config_is_dropped() {
        let request =
            ImportRequest::parse(r#"{"items": [], "vaultConfig": {"salt": 1}}"#).unwrap();
        assert!(request.vault_config().is_none());
    }

    #[test]
    fn test_export_payload_layout() {
        let payload = ExportPayload {
            version: EXPORT_VERSION,
            exported_at: "2024-01-01T00:00:00.000Z".to_string(),
            items: Vec::new(),
            hidden_items: None,
            vault_config: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["version"], 2);
        assert!(json.get("exportedAt").is_some());
        assert!(json.get("hiddenItems").is_none());
        assert!(json.get("vaultConfig").is_none());
    }
}
