//! Typed property values and their wire encoders/parsers.
//!
//! `PropertyValue::encode` produces the fragment the remote API expects for
//! one named property; `parse_property` is the inverse and additionally
//! reports the detected kind so schema frames can learn live types.
//! Parsing never fails: fragments of an unrecognized kind become
//! `PropertyValue::Unsupported`, which round-trips its raw payload but
//! exposes no writable surface.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value as Json};
use tracing::debug;

use crate::error::ApiError;
use crate::richtext::RichText;

/// The data type of a remote property, as the wire names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Checkbox,
    Select,
    MultiSelect,
    Status,
    Date,
    People,
    Files,
    Relation,
    Formula,
    Rollup,
    /// A kind this library does not model; the wire name is kept verbatim.
    Unsupported(String),
}

impl PropertyKind {
    /// The payload key used on the wire for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Number => "number",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Status => "status",
            PropertyKind::Date => "date",
            PropertyKind::People => "people",
            PropertyKind::Files => "files",
            PropertyKind::Relation => "relation",
            PropertyKind::Formula => "formula",
            PropertyKind::Rollup => "rollup",
            PropertyKind::Unsupported(name) => name,
        }
    }

    pub fn from_wire(name: &str) -> Self {
        match name {
            "title" => PropertyKind::Title,
            "rich_text" => PropertyKind::RichText,
            "number" => PropertyKind::Number,
            "checkbox" => PropertyKind::Checkbox,
            "select" => PropertyKind::Select,
            "multi_select" => PropertyKind::MultiSelect,
            "status" => PropertyKind::Status,
            "date" => PropertyKind::Date,
            "people" => PropertyKind::People,
            "files" => PropertyKind::Files,
            "relation" => PropertyKind::Relation,
            "formula" => PropertyKind::Formula,
            "rollup" => PropertyKind::Rollup,
            other => PropertyKind::Unsupported(other.to_string()),
        }
    }

    /// Whether this kind accepts text-affix filter operations.
    pub fn is_text_like(&self) -> bool {
        matches!(self, PropertyKind::Title | PropertyKind::RichText)
    }

    /// Whether this kind accepts date filter operations.
    pub fn is_date_like(&self) -> bool {
        matches!(self, PropertyKind::Date)
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A date or date range, optionally time-zoned.
///
/// `start`/`end` hold the wire strings (`2024-05-01` or RFC 3339).
/// Datetime strings carrying a UTC offset are normalized to UTC when
/// encoded; date-only strings pass through untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateValue {
    pub start: String,
    pub end: Option<String>,
    pub time_zone: Option<String>,
}

impl DateValue {
    /// A single day, no time component.
    pub fn day(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
            time_zone: None,
        }
    }

    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: Some(end.into()),
            time_zone: None,
        }
    }

    pub fn with_time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = Some(tz.into());
        self
    }

    /// Parsed start instant, if `start` is a datetime.
    pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.start)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Parsed start day, if `start` is date-only.
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.start, "%Y-%m-%d").ok()
    }

    fn normalize(value: &str) -> String {
        match DateTime::parse_from_rfc3339(value) {
            Ok(dt) => dt.with_timezone(&Utc).to_rfc3339(),
            Err(_) => value.to_string(),
        }
    }

    pub fn display(&self) -> String {
        match &self.end {
            Some(end) => format!("{} -> {}", self.start, end),
            None => self.start.clone(),
        }
    }

    pub fn encode(&self) -> Json {
        let mut body = json!({ "start": Self::normalize(&self.start) });
        if let Some(end) = &self.end {
            body["end"] = json!(Self::normalize(end));
        }
        if let Some(tz) = &self.time_zone {
            body["time_zone"] = json!(tz);
        }
        body
    }

    pub fn parse(fragment: &Json) -> Self {
        let field = |key: &str| {
            fragment
                .get(key)
                .and_then(Json::as_str)
                .map(String::from)
        };
        Self {
            start: field("start").unwrap_or_default(),
            end: field("end"),
            time_zone: field("time_zone"),
        }
    }
}

/// A file attachment reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRef {
    pub name: String,
    pub url: String,
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(RichText),
    Text(RichText),
    Number(Option<f64>),
    Checkbox(bool),
    Select(Option<String>),
    MultiSelect(Vec<String>),
    Status(Option<String>),
    Date(Option<DateValue>),
    /// User ids.
    People(Vec<String>),
    Files(Vec<FileRef>),
    /// Target entity ids.
    Relation(Vec<String>),
    /// Computed server-side; read-only. Wraps the result value.
    Formula(Box<PropertyValue>),
    /// Aggregated server-side; read-only. Wraps the aggregated values.
    Rollup(Vec<PropertyValue>),
    /// A kind this library does not model. Round-trips the raw fragment.
    Unsupported { kind: String, raw: Json },
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Title(_) => PropertyKind::Title,
            PropertyValue::Text(_) => PropertyKind::RichText,
            PropertyValue::Number(_) => PropertyKind::Number,
            PropertyValue::Checkbox(_) => PropertyKind::Checkbox,
            PropertyValue::Select(_) => PropertyKind::Select,
            PropertyValue::MultiSelect(_) => PropertyKind::MultiSelect,
            PropertyValue::Status(_) => PropertyKind::Status,
            PropertyValue::Date(_) => PropertyKind::Date,
            PropertyValue::People(_) => PropertyKind::People,
            PropertyValue::Files(_) => PropertyKind::Files,
            PropertyValue::Relation(_) => PropertyKind::Relation,
            PropertyValue::Formula(_) => PropertyKind::Formula,
            PropertyValue::Rollup(_) => PropertyKind::Rollup,
            PropertyValue::Unsupported { kind, .. } => {
                PropertyKind::Unsupported(kind.clone())
            }
        }
    }

    /// Whether this value can appear in a write request.
    pub fn is_writable(&self) -> bool {
        !matches!(
            self,
            PropertyValue::Formula(_)
                | PropertyValue::Rollup(_)
                | PropertyValue::Unsupported { .. }
        )
    }

    /// Flattened display form, used for read caches and lookup indexes.
    pub fn plain_text(&self) -> String {
        match self {
            PropertyValue::Title(rt) | PropertyValue::Text(rt) => rt.plain_text(),
            PropertyValue::Number(Some(n)) => format_number(*n),
            PropertyValue::Number(None) => String::new(),
            PropertyValue::Checkbox(b) => b.to_string(),
            PropertyValue::Select(opt) | PropertyValue::Status(opt) => {
                opt.clone().unwrap_or_default()
            }
            PropertyValue::MultiSelect(names) => names.join(","),
            PropertyValue::Date(Some(date)) => date.display(),
            PropertyValue::Date(None) => String::new(),
            PropertyValue::People(ids) | PropertyValue::Relation(ids) => ids.join(","),
            PropertyValue::Files(files) => files
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
            PropertyValue::Formula(inner) => inner.plain_text(),
            PropertyValue::Rollup(values) => values
                .iter()
                .map(PropertyValue::plain_text)
                .collect::<Vec<_>>()
                .join(","),
            PropertyValue::Unsupported { .. } => String::new(),
        }
    }

    /// Encode into the wire fragment for one named property.
    ///
    /// Read-only values (formula, rollup, unsupported) refuse to encode.
    pub fn encode(&self) -> Result<Json, ApiError> {
        let body = match self {
            PropertyValue::Title(rt) => json!({ "title": rt.encode() }),
            PropertyValue::Text(rt) => json!({ "rich_text": rt.encode() }),
            PropertyValue::Number(n) => json!({ "number": n }),
            PropertyValue::Checkbox(b) => json!({ "checkbox": b }),
            PropertyValue::Select(opt) => match opt {
                Some(name) => json!({ "select": { "name": name } }),
                None => json!({ "select": Json::Null }),
            },
            PropertyValue::Status(opt) => match opt {
                Some(name) => json!({ "status": { "name": name } }),
                None => json!({ "status": Json::Null }),
            },
            PropertyValue::MultiSelect(names) => {
                let options: Vec<Json> =
                    names.iter().map(|n| json!({ "name": n })).collect();
                json!({ "multi_select": options })
            }
            PropertyValue::Date(opt) => match opt {
                Some(date) => json!({ "date": date.encode() }),
                None => json!({ "date": Json::Null }),
            },
            PropertyValue::People(ids) => {
                let people: Vec<Json> = ids.iter().map(|id| json!({ "id": id })).collect();
                json!({ "people": people })
            }
            PropertyValue::Files(files) => {
                let entries: Vec<Json> = files
                    .iter()
                    .map(|f| json!({ "name": f.name, "external": { "url": f.url } }))
                    .collect();
                json!({ "files": entries })
            }
            PropertyValue::Relation(ids) => {
                let targets: Vec<Json> = ids.iter().map(|id| json!({ "id": id })).collect();
                json!({ "relation": targets })
            }
            PropertyValue::Formula(_)
            | PropertyValue::Rollup(_)
            | PropertyValue::Unsupported { .. } => {
                return Err(ApiError::ReadOnlyValue {
                    kind: self.kind().to_string(),
                })
            }
        };
        Ok(body)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Result of parsing one property fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProperty {
    pub kind: PropertyKind,
    pub value: PropertyValue,
    pub plain: String,
}

/// Parse one property fragment into its typed value plus detected kind.
///
/// The kind is read from the fragment's `type` field when present, otherwise
/// probed from the payload keys. Unrecognized kinds yield `Unsupported` and
/// never an error.
pub fn parse_property(fragment: &Json) -> ParsedProperty {
    let kind = detect_kind(fragment);
    let value = parse_payload(&kind, fragment);
    let plain = value.plain_text();
    ParsedProperty { kind, value, plain }
}

fn detect_kind(fragment: &Json) -> PropertyKind {
    if let Some(name) = fragment.get("type").and_then(Json::as_str) {
        return PropertyKind::from_wire(name);
    }
    const PROBES: [&str; 13] = [
        "title",
        "rich_text",
        "number",
        "checkbox",
        "select",
        "multi_select",
        "status",
        "date",
        "people",
        "files",
        "relation",
        "formula",
        "rollup",
    ];
    for key in PROBES {
        if fragment.get(key).is_some() {
            return PropertyKind::from_wire(key);
        }
    }
    debug!("[PropertyParse] No recognizable payload key in fragment");
    PropertyKind::Unsupported("unknown".to_string())
}

fn parse_payload(kind: &PropertyKind, fragment: &Json) -> PropertyValue {
    let payload = fragment.get(kind.as_str()).unwrap_or(&Json::Null);
    match kind {
        PropertyKind::Title => PropertyValue::Title(RichText::parse(payload)),
        PropertyKind::RichText => PropertyValue::Text(RichText::parse(payload)),
        PropertyKind::Number => PropertyValue::Number(payload.as_f64()),
        PropertyKind::Checkbox => {
            PropertyValue::Checkbox(payload.as_bool().unwrap_or(false))
        }
        PropertyKind::Select => PropertyValue::Select(option_name(payload)),
        PropertyKind::Status => PropertyValue::Status(option_name(payload)),
        PropertyKind::MultiSelect => PropertyValue::MultiSelect(
            payload
                .as_array()
                .map(|arr| arr.iter().filter_map(option_name_ref).collect())
                .unwrap_or_default(),
        ),
        PropertyKind::Date => {
            if payload.is_null() {
                PropertyValue::Date(None)
            } else {
                PropertyValue::Date(Some(DateValue::parse(payload)))
            }
        }
        PropertyKind::People => PropertyValue::People(id_list(payload)),
        PropertyKind::Files => PropertyValue::Files(
            payload
                .as_array()
                .map(|arr| arr.iter().map(parse_file).collect())
                .unwrap_or_default(),
        ),
        PropertyKind::Relation => PropertyValue::Relation(id_list(payload)),
        PropertyKind::Formula => {
            // The wrapped result is itself a property-shaped fragment.
            let inner = parse_property(payload);
            PropertyValue::Formula(Box::new(inner.value))
        }
        PropertyKind::Rollup => PropertyValue::Rollup(parse_rollup(payload)),
        PropertyKind::Unsupported(name) => {
            debug!("[PropertyParse] Unsupported property kind '{}'", name);
            PropertyValue::Unsupported {
                kind: name.clone(),
                raw: fragment.clone(),
            }
        }
    }
}

fn parse_rollup(payload: &Json) -> Vec<PropertyValue> {
    // Array rollups aggregate one fragment per source page; scalar rollups
    // reuse the property dispatch directly.
    match payload.get("array").and_then(Json::as_array) {
        Some(items) => items.iter().map(|f| parse_property(f).value).collect(),
        None => vec![parse_property(payload).value],
    }
}

fn option_name(payload: &Json) -> Option<String> {
    payload
        .get("name")
        .and_then(Json::as_str)
        .map(String::from)
}

fn option_name_ref(entry: &Json) -> Option<String> {
    entry.get("name").and_then(Json::as_str).map(String::from)
}

fn id_list(payload: &Json) -> Vec<String> {
    payload
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|e| e.get("id").and_then(Json::as_str).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_file(entry: &Json) -> FileRef {
    let name = entry
        .get("name")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string();
    let url = entry
        .get("url")
        .or_else(|| entry.get("external").and_then(|e| e.get("url")))
        .or_else(|| entry.get("file").and_then(|f| f.get("url")))
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string();
    FileRef { name, url }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: PropertyValue) {
        let encoded = value.encode().unwrap();
        let parsed = parse_property(&encoded);
        assert_eq!(parsed.value, value, "round trip failed for {:?}", value);
    }

    #[test]
    fn test_round_trip_all_writable_kinds() {
        round_trip(PropertyValue::Title(RichText::plain("A page")));
        round_trip(PropertyValue::Text(
            RichText::new().text("see ").mention_page("p-1"),
        ));
        round_trip(PropertyValue::Number(Some(12.5)));
        round_trip(PropertyValue::Number(None));
        round_trip(PropertyValue::Checkbox(true));
        round_trip(PropertyValue::Select(Some("done".to_string())));
        round_trip(PropertyValue::Select(None));
        round_trip(PropertyValue::MultiSelect(vec![
            "a".to_string(),
            "b".to_string(),
        ]));
        round_trip(PropertyValue::Status(Some("live".to_string())));
        round_trip(PropertyValue::Date(Some(DateValue::day("2024-05-01"))));
        round_trip(PropertyValue::Date(None));
        round_trip(PropertyValue::People(vec!["u-1".to_string()]));
        round_trip(PropertyValue::Files(vec![FileRef {
            name: "cover.png".to_string(),
            url: "https://example.com/cover.png".to_string(),
        }]));
        round_trip(PropertyValue::Relation(vec![
            "r-1".to_string(),
            "r-2".to_string(),
        ]));
    }

    #[test]
    fn test_start_only_date_range_round_trips() {
        let value = PropertyValue::Date(Some(DateValue::day("2024-02-29")));
        let encoded = value.encode().unwrap();
        assert_eq!(encoded["date"]["start"], "2024-02-29");
        assert!(encoded["date"].get("end").is_none());
        let parsed = parse_property(&encoded);
        assert_eq!(parsed.value, value);
    }

    #[test]
    fn test_datetime_normalizes_to_utc() {
        let date = DateValue::day("2024-05-01T10:00:00+02:00");
        let encoded = date.encode();
        assert_eq!(encoded["start"], "2024-05-01T08:00:00+00:00");
    }

    #[test]
    fn test_unsupported_kind_parses_without_error() {
        let fragment = serde_json::json!({
            "type": "verification",
            "verification": { "state": "verified" }
        });
        let parsed = parse_property(&fragment);
        assert_eq!(
            parsed.kind,
            PropertyKind::Unsupported("verification".to_string())
        );
        assert!(!parsed.value.is_writable());
        assert!(parsed.value.encode().is_err());
        match parsed.value {
            PropertyValue::Unsupported { raw, .. } => assert_eq!(raw, fragment),
            other => panic!("expected Unsupported, got {:?}", other),
        }
    }

    #[test]
    fn test_formula_parses_recursively() {
        let fragment = serde_json::json!({
            "type": "formula",
            "formula": { "type": "number", "number": 42.0 }
        });
        let parsed = parse_property(&fragment);
        assert_eq!(
            parsed.value,
            PropertyValue::Formula(Box::new(PropertyValue::Number(Some(42.0))))
        );
        assert_eq!(parsed.plain, "42");
    }

    #[test]
    fn test_rollup_array_parses_each_fragment() {
        let fragment = serde_json::json!({
            "type": "rollup",
            "rollup": { "type": "array", "array": [
                { "type": "number", "number": 1.0 },
                { "type": "number", "number": 2.0 }
            ]}
        });
        let parsed = parse_property(&fragment);
        assert_eq!(parsed.plain, "1,2");
        assert!(!parsed.value.is_writable());
    }

    #[test]
    fn test_kind_detection_without_type_field() {
        let fragment = serde_json::json!({ "checkbox": true });
        let parsed = parse_property(&fragment);
        assert_eq!(parsed.kind, PropertyKind::Checkbox);
        assert_eq!(parsed.value, PropertyValue::Checkbox(true));
    }
}
