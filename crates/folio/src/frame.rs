//! Property frames: the schema registry between internal keys and remote
//! field names.
//!
//! A frame starts under-specified, seeded with only the keys the
//! application cares about, and self-completes from live data: every parse
//! of a remote response can teach it field kinds it did not know yet.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value as Json;
use tracing::debug;

use folio_api::PropertyKind;

use crate::error::{EditorError, Result};

/// One frame entry: internal key, remote name, detected kind, and optional
/// value groupings (e.g. select options bucketed by meaning).
#[derive(Debug, Clone)]
pub struct FrameUnit {
    pub key: String,
    pub name: String,
    pub kind: Option<PropertyKind>,
    pub value_groups: HashMap<String, BTreeSet<String>>,
}

impl FrameUnit {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            kind: None,
            value_groups: HashMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: PropertyKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Add option values under a named group.
    pub fn with_value_group<I, S>(mut self, group: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_groups
            .entry(group.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// The group a value belongs to, if any.
    pub fn group_of(&self, value: &str) -> Option<&str> {
        self.value_groups
            .iter()
            .find(|(_, members)| members.contains(value))
            .map(|(group, _)| group.as_str())
    }
}

/// Ordered collection of frame units. Keys are unique; names need not be,
/// since aliases share a name.
#[derive(Debug, Clone, Default)]
pub struct PropertyFrame {
    units: Vec<FrameUnit>,
}

impl PropertyFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a frame from `(key, name)` pairs.
    pub fn seeded<I, K, N>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        let mut frame = Self::new();
        for (key, name) in pairs {
            frame.push(FrameUnit::new(key, name))?;
        }
        Ok(frame)
    }

    pub fn push(&mut self, unit: FrameUnit) -> Result<()> {
        if self.units.iter().any(|u| u.key == unit.key) {
            return Err(EditorError::DuplicateKey { key: unit.key });
        }
        self.units.push(unit);
        Ok(())
    }

    pub fn units(&self) -> &[FrameUnit] {
        &self.units
    }

    pub fn unit(&self, key: &str) -> Option<&FrameUnit> {
        self.units.iter().find(|u| u.key == key)
    }

    pub fn unit_mut(&mut self, key: &str) -> Option<&mut FrameUnit> {
        self.units.iter_mut().find(|u| u.key == key)
    }

    /// Remote field name for an internal key.
    pub fn key_to_name(&self, key: &str) -> Option<&str> {
        self.unit(key).map(|u| u.name.as_str())
    }

    /// Detected kind for a remote field name, if any unit carries it.
    pub fn name_to_kind(&self, name: &str) -> Option<PropertyKind> {
        self.units
            .iter()
            .filter(|u| u.name == name)
            .find_map(|u| u.kind.clone())
    }

    /// Clone a unit under a new key with the same name and kind. Used when
    /// one physical field serves two logical roles.
    pub fn add_alias(&mut self, existing_key: &str, new_key: impl Into<String>) -> Result<()> {
        let new_key = new_key.into();
        let source = self
            .unit(existing_key)
            .ok_or_else(|| EditorError::UnknownKey {
                key: existing_key.to_string(),
            })?;
        let mut clone = source.clone();
        clone.key = new_key;
        self.push(clone)
    }

    /// Record the kind observed for `name` in a live response: unknown
    /// names append a unit keyed by the name itself, known names backfill
    /// a previously unset kind.
    pub fn learn(&mut self, name: &str, kind: PropertyKind) {
        let mut seen = false;
        for unit in self.units.iter_mut().filter(|u| u.name == name) {
            seen = true;
            if unit.kind.is_none() {
                unit.kind = Some(kind.clone());
            }
        }
        if !seen {
            debug!("[PropertyFrame] Learned new field '{}' ({})", name, kind);
            self.units.push(FrameUnit::new(name, name).with_kind(kind));
        }
    }

    /// Seed kinds from a database schema response, where each property
    /// fragment carries a `type` field.
    pub fn learn_schema(&mut self, properties: &serde_json::Map<String, Json>) {
        for (name, fragment) in properties {
            if let Some(kind) = fragment.get("type").and_then(Json::as_str) {
                self.learn(name, PropertyKind::from_wire(kind));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_shares_name_and_kind() {
        let mut frame = PropertyFrame::new();
        frame
            .push(FrameUnit::new("title", "Name").with_kind(PropertyKind::Title))
            .unwrap();
        frame.add_alias("title", "lookup").unwrap();

        assert_eq!(frame.key_to_name("lookup"), Some("Name"));
        assert_eq!(frame.unit("lookup").unwrap().kind, Some(PropertyKind::Title));
        // Two keys, one name.
        assert_eq!(frame.units().len(), 2);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut frame = PropertyFrame::new();
        frame.push(FrameUnit::new("a", "A")).unwrap();
        let err = frame.push(FrameUnit::new("a", "B")).unwrap_err();
        assert!(matches!(err, EditorError::DuplicateKey { .. }));
    }

    #[test]
    fn test_learn_appends_unknown_names() {
        let mut frame = PropertyFrame::new();
        frame.learn("Stage", PropertyKind::Select);

        assert_eq!(frame.key_to_name("Stage"), Some("Stage"));
        assert_eq!(frame.name_to_kind("Stage"), Some(PropertyKind::Select));
    }

    #[test]
    fn test_learn_backfills_unset_kind_only() {
        let mut frame = PropertyFrame::seeded([("due", "Due")]).unwrap();
        assert_eq!(frame.name_to_kind("Due"), None);

        frame.learn("Due", PropertyKind::Date);
        assert_eq!(frame.name_to_kind("Due"), Some(PropertyKind::Date));

        // A later observation does not replace a known kind.
        frame.learn("Due", PropertyKind::RichText);
        assert_eq!(frame.name_to_kind("Due"), Some(PropertyKind::Date));
        // And does not duplicate the unit.
        assert_eq!(frame.units().len(), 1);
    }

    #[test]
    fn test_learn_schema_from_database_fragments() {
        let mut frame = PropertyFrame::new();
        let properties = serde_json::json!({
            "Name": { "id": "title", "type": "title", "title": {} },
            "Score": { "id": "sc", "type": "number", "number": {} }
        });
        frame.learn_schema(properties.as_object().unwrap());

        assert_eq!(frame.name_to_kind("Name"), Some(PropertyKind::Title));
        assert_eq!(frame.name_to_kind("Score"), Some(PropertyKind::Number));
    }

    #[test]
    fn test_value_groups() {
        let unit = FrameUnit::new("period", "Period")
            .with_value_group("quarters", ["Q1", "Q2", "Q3", "Q4"])
            .with_value_group("halves", ["H1", "H2"]);
        assert_eq!(unit.group_of("Q2"), Some("quarters"));
        assert_eq!(unit.group_of("H1"), Some("halves"));
        assert_eq!(unit.group_of("Y1"), None);
    }
}
