//! Bibliographic record model
//!
//! A record is held as its raw JSON object so that every field the repository
//! stores — known to this tool or not — survives a load → mutate → save cycle
//! unmodified. Typed accessors cover only the fields the QA pipeline reads or
//! rewrites.

use serde_json::{json, Map, Value};
use std::path::Path;

use crate::{Error, Result};

/// Custom field carrying the QA-checked marker
pub const QA_CHECKED_FIELD: &str = "qa:checked";

/// One bibliographic record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    raw: Map<String, Value>,
}

impl Record {
    /// Wrap a parsed JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: Map<String, Value> = serde_json::from_value(value).map_err(Error::Json)?;
        Ok(Self { raw })
    }

    /// Read a record from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_value(value)
    }

    /// Write the record back as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&Value::Object(self.raw.clone()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The full JSON object
    pub fn as_value(&self) -> Value {
        Value::Object(self.raw.clone())
    }

    /// Immutable record identifier
    pub fn id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }

    /// `metadata.title`
    pub fn title(&self) -> Option<&str> {
        self.metadata()?.get("title").and_then(Value::as_str)
    }

    /// Overwrite `metadata.title`. Returns false when the value is unchanged.
    pub fn set_title(&mut self, title: &str) -> bool {
        let metadata = self.metadata_mut();
        if metadata.get("title").and_then(Value::as_str) == Some(title) {
            return false;
        }
        metadata.insert("title".to_string(), Value::String(title.to_string()));
        true
    }

    /// `metadata.description` (the abstract)
    pub fn description(&self) -> Option<&str> {
        self.metadata()?.get("description").and_then(Value::as_str)
    }

    /// `metadata.publication_date`
    pub fn publication_date(&self) -> Option<&str> {
        self.metadata()?
            .get("publication_date")
            .and_then(Value::as_str)
    }

    /// Replace every creator affiliation named `old` with `new`.
    /// Returns the number of affiliations rewritten.
    pub fn replace_affiliation(&mut self, old: &str, new: &str) -> usize {
        let mut replaced = 0;
        for creator in self.creators_mut() {
            let Some(affiliations) = creator
                .get_mut("affiliations")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            for affiliation in affiliations {
                if affiliation.get("name").and_then(Value::as_str) == Some(old) {
                    if let Some(obj) = affiliation.as_object_mut() {
                        obj.insert("name".to_string(), Value::String(new.to_string()));
                        replaced += 1;
                    }
                }
            }
        }
        replaced
    }

    /// Rename organizational creators named `old` to `new`.
    /// Personal creators are never touched.
    pub fn rename_organizational_author(&mut self, old: &str, new: &str) -> usize {
        let mut renamed = 0;
        for creator in self.creators_mut() {
            let Some(person_or_org) = creator
                .get_mut("person_or_org")
                .and_then(Value::as_object_mut)
            else {
                continue;
            };
            let is_org = person_or_org.get("type").and_then(Value::as_str)
                == Some("organizational");
            let name_matches =
                person_or_org.get("name").and_then(Value::as_str) == Some(old);
            if is_org && name_matches {
                person_or_org.insert("name".to_string(), Value::String(new.to_string()));
                renamed += 1;
            }
        }
        renamed
    }

    /// Whether the record already carries the QA-checked marker
    pub fn qa_checked(&self) -> bool {
        self.raw
            .get("custom_fields")
            .and_then(|cf| cf.get(QA_CHECKED_FIELD))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Set the QA-checked marker. The marker is only ever set, never cleared.
    pub fn mark_qa_checked(&mut self) {
        let custom_fields = self
            .raw
            .entry("custom_fields".to_string())
            .or_insert_with(|| json!({}));
        if let Some(obj) = custom_fields.as_object_mut() {
            obj.insert(QA_CHECKED_FIELD.to_string(), Value::Bool(true));
        }
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.raw.get("metadata").and_then(Value::as_object)
    }

    fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .raw
            .entry("metadata".to_string())
            .or_insert_with(|| json!({}));
        if !entry.is_object() {
            *entry = json!({});
        }
        entry.as_object_mut().expect("metadata is an object here")
    }

    fn creators_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.raw
            .get_mut("metadata")
            .and_then(|m| m.get_mut("creators"))
            .and_then(Value::as_array_mut)
            .map(|v| v.iter_mut())
            .into_iter()
            .flatten()
    }
}
