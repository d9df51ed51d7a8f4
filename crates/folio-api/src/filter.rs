//! Boolean predicate trees for server-side queries.
//!
//! Leaves are built through kind-scoped condition builders (`text`,
//! `number`, `date`, ...) so an operation can only be requested for a
//! property kind the remote API accepts it on. Composition merges same-kind
//! compound nodes by concatenating children; mixing kinds nests by exactly
//! one level. The remote API rejects filters nested deeper than
//! `MAX_FILTER_NESTING`, so construction fails first.

use serde_json::{json, Value as Json};

/// Maximum nesting depth of compound filter nodes the remote API accepts.
pub const MAX_FILTER_NESTING: usize = 2;

/// Filter construction errors, raised before any network call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FilterError {
    #[error("Filter nesting {nesting} exceeds the maximum of {max}: {structure}")]
    TooDeep {
        nesting: usize,
        max: usize,
        structure: String,
    },
}

/// A server-side query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    /// One property condition.
    Leaf(Json),
    /// An already-built raw predicate; always reports nesting 0.
    Plain(Json),
}

#[derive(Clone, Copy, PartialEq)]
enum Compound {
    And,
    Or,
}

impl Filter {
    /// Wrap a raw predicate built elsewhere.
    pub fn plain(raw: Json) -> Self {
        Filter::Plain(raw)
    }

    /// Nesting depth of compound wrapping: leaves are 0.
    pub fn nesting(&self) -> usize {
        match self {
            Filter::Leaf(_) | Filter::Plain(_) => 0,
            Filter::And(children) | Filter::Or(children) => {
                1 + children.iter().map(Filter::nesting).max().unwrap_or(0)
            }
        }
    }

    /// Conjunction. Same-kind children are merged flat.
    pub fn and(self, other: Filter) -> Result<Filter, FilterError> {
        Self::compose(Compound::And, vec![self, other])
    }

    /// Disjunction. Same-kind children are merged flat.
    pub fn or(self, other: Filter) -> Result<Filter, FilterError> {
        Self::compose(Compound::Or, vec![self, other])
    }

    /// Conjunction over any number of filters.
    pub fn all(filters: Vec<Filter>) -> Result<Filter, FilterError> {
        Self::compose(Compound::And, filters)
    }

    /// Disjunction over any number of filters.
    pub fn any(filters: Vec<Filter>) -> Result<Filter, FilterError> {
        Self::compose(Compound::Or, filters)
    }

    fn compose(kind: Compound, parts: Vec<Filter>) -> Result<Filter, FilterError> {
        let mut children = Vec::with_capacity(parts.len());
        for part in parts {
            match (kind, part) {
                (Compound::And, Filter::And(inner)) => children.extend(inner),
                (Compound::Or, Filter::Or(inner)) => children.extend(inner),
                (_, other) => children.push(other),
            }
        }
        let combined = match kind {
            Compound::And => Filter::And(children),
            Compound::Or => Filter::Or(children),
        };
        let nesting = combined.nesting();
        if nesting > MAX_FILTER_NESTING {
            return Err(FilterError::TooDeep {
                nesting,
                max: MAX_FILTER_NESTING,
                structure: combined.describe(),
            });
        }
        Ok(combined)
    }

    /// Short structural description used in error messages.
    fn describe(&self) -> String {
        match self {
            Filter::Leaf(body) => body
                .get("property")
                .and_then(Json::as_str)
                .map(|p| format!("leaf({})", p))
                .unwrap_or_else(|| "leaf".to_string()),
            Filter::Plain(_) => "plain".to_string(),
            Filter::And(children) => format!(
                "and({})",
                children
                    .iter()
                    .map(Filter::describe)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Filter::Or(children) => format!(
                "or({})",
                children
                    .iter()
                    .map(Filter::describe)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Encode into the wire predicate body.
    pub fn encode(&self) -> Json {
        match self {
            Filter::Leaf(body) => body.clone(),
            Filter::Plain(raw) => raw.clone(),
            Filter::And(children) => {
                json!({ "and": children.iter().map(Filter::encode).collect::<Vec<_>>() })
            }
            Filter::Or(children) => {
                json!({ "or": children.iter().map(Filter::encode).collect::<Vec<_>>() })
            }
        }
    }
}

fn leaf(property: &str, kind_key: &str, body: Json) -> Filter {
    Filter::Leaf(json!({ "property": property, kind_key: body }))
}

// =============================================================================
// Kind-scoped condition builders
// =============================================================================

/// Conditions on a title property.
pub fn title(property: impl Into<String>) -> TextCondition {
    TextCondition {
        property: property.into(),
        kind_key: "title",
    }
}

/// Conditions on a rich-text property.
pub fn text(property: impl Into<String>) -> TextCondition {
    TextCondition {
        property: property.into(),
        kind_key: "rich_text",
    }
}

pub struct TextCondition {
    property: String,
    kind_key: &'static str,
}

impl TextCondition {
    pub fn equals(self, value: impl Into<String>) -> Filter {
        leaf(&self.property, self.kind_key, json!({ "equals": value.into() }))
    }

    pub fn not_equals(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            self.kind_key,
            json!({ "does_not_equal": value.into() }),
        )
    }

    pub fn contains(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            self.kind_key,
            json!({ "contains": value.into() }),
        )
    }

    pub fn not_contains(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            self.kind_key,
            json!({ "does_not_contain": value.into() }),
        )
    }

    pub fn starts_with(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            self.kind_key,
            json!({ "starts_with": value.into() }),
        )
    }

    pub fn ends_with(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            self.kind_key,
            json!({ "ends_with": value.into() }),
        )
    }

    pub fn is_empty(self) -> Filter {
        leaf(&self.property, self.kind_key, json!({ "is_empty": true }))
    }

    pub fn is_not_empty(self) -> Filter {
        leaf(&self.property, self.kind_key, json!({ "is_not_empty": true }))
    }

    /// OR of per-value equals.
    pub fn equals_any<I, S>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let property = self.property;
        let kind_key = self.kind_key;
        Filter::Or(
            values
                .into_iter()
                .map(|v| leaf(&property, kind_key, json!({ "equals": v.into() })))
                .collect(),
        )
    }

    /// AND of per-value not-equals: the De Morgan dual of [`equals_any`].
    pub fn equals_none<I, S>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let property = self.property;
        let kind_key = self.kind_key;
        Filter::And(
            values
                .into_iter()
                .map(|v| leaf(&property, kind_key, json!({ "does_not_equal": v.into() })))
                .collect(),
        )
    }
}

/// Conditions on a number property.
pub fn number(property: impl Into<String>) -> NumberCondition {
    NumberCondition {
        property: property.into(),
    }
}

pub struct NumberCondition {
    property: String,
}

impl NumberCondition {
    pub fn equals(self, value: f64) -> Filter {
        leaf(&self.property, "number", json!({ "equals": value }))
    }

    pub fn not_equals(self, value: f64) -> Filter {
        leaf(&self.property, "number", json!({ "does_not_equal": value }))
    }

    pub fn greater_than(self, value: f64) -> Filter {
        leaf(&self.property, "number", json!({ "greater_than": value }))
    }

    pub fn less_than(self, value: f64) -> Filter {
        leaf(&self.property, "number", json!({ "less_than": value }))
    }

    pub fn greater_or_equal(self, value: f64) -> Filter {
        leaf(
            &self.property,
            "number",
            json!({ "greater_than_or_equal_to": value }),
        )
    }

    pub fn less_or_equal(self, value: f64) -> Filter {
        leaf(
            &self.property,
            "number",
            json!({ "less_than_or_equal_to": value }),
        )
    }

    pub fn is_empty(self) -> Filter {
        leaf(&self.property, "number", json!({ "is_empty": true }))
    }

    pub fn is_not_empty(self) -> Filter {
        leaf(&self.property, "number", json!({ "is_not_empty": true }))
    }
}

/// Conditions on a checkbox property.
pub fn checkbox(property: impl Into<String>) -> CheckboxCondition {
    CheckboxCondition {
        property: property.into(),
    }
}

pub struct CheckboxCondition {
    property: String,
}

impl CheckboxCondition {
    pub fn equals(self, value: bool) -> Filter {
        leaf(&self.property, "checkbox", json!({ "equals": value }))
    }

    pub fn not_equals(self, value: bool) -> Filter {
        leaf(&self.property, "checkbox", json!({ "does_not_equal": value }))
    }
}

/// Conditions on a select property.
pub fn select(property: impl Into<String>) -> SelectCondition {
    SelectCondition {
        property: property.into(),
    }
}

pub struct SelectCondition {
    property: String,
}

impl SelectCondition {
    pub fn equals(self, value: impl Into<String>) -> Filter {
        leaf(&self.property, "select", json!({ "equals": value.into() }))
    }

    pub fn not_equals(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            "select",
            json!({ "does_not_equal": value.into() }),
        )
    }

    pub fn is_empty(self) -> Filter {
        leaf(&self.property, "select", json!({ "is_empty": true }))
    }

    pub fn is_not_empty(self) -> Filter {
        leaf(&self.property, "select", json!({ "is_not_empty": true }))
    }

    /// OR of per-value equals.
    pub fn equals_any<I, S>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let property = self.property;
        Filter::Or(
            values
                .into_iter()
                .map(|v| leaf(&property, "select", json!({ "equals": v.into() })))
                .collect(),
        )
    }

    /// AND of per-value not-equals.
    pub fn equals_none<I, S>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let property = self.property;
        Filter::And(
            values
                .into_iter()
                .map(|v| leaf(&property, "select", json!({ "does_not_equal": v.into() })))
                .collect(),
        )
    }
}

/// Conditions on a multi-select property.
pub fn multi_select(property: impl Into<String>) -> MultiSelectCondition {
    MultiSelectCondition {
        property: property.into(),
    }
}

pub struct MultiSelectCondition {
    property: String,
}

impl MultiSelectCondition {
    pub fn contains(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            "multi_select",
            json!({ "contains": value.into() }),
        )
    }

    pub fn not_contains(self, value: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            "multi_select",
            json!({ "does_not_contain": value.into() }),
        )
    }

    pub fn is_empty(self) -> Filter {
        leaf(&self.property, "multi_select", json!({ "is_empty": true }))
    }

    pub fn is_not_empty(self) -> Filter {
        leaf(
            &self.property,
            "multi_select",
            json!({ "is_not_empty": true }),
        )
    }
}

/// Conditions on a date property.
pub fn date(property: impl Into<String>) -> DateCondition {
    DateCondition {
        property: property.into(),
    }
}

pub struct DateCondition {
    property: String,
}

impl DateCondition {
    pub fn equals(self, value: impl Into<String>) -> Filter {
        leaf(&self.property, "date", json!({ "equals": value.into() }))
    }

    pub fn before(self, value: impl Into<String>) -> Filter {
        leaf(&self.property, "date", json!({ "before": value.into() }))
    }

    pub fn after(self, value: impl Into<String>) -> Filter {
        leaf(&self.property, "date", json!({ "after": value.into() }))
    }

    pub fn on_or_before(self, value: impl Into<String>) -> Filter {
        leaf(&self.property, "date", json!({ "on_or_before": value.into() }))
    }

    pub fn on_or_after(self, value: impl Into<String>) -> Filter {
        leaf(&self.property, "date", json!({ "on_or_after": value.into() }))
    }

    pub fn within_past_week(self) -> Filter {
        leaf(&self.property, "date", json!({ "past_week": {} }))
    }

    pub fn within_past_month(self) -> Filter {
        leaf(&self.property, "date", json!({ "past_month": {} }))
    }

    pub fn within_past_year(self) -> Filter {
        leaf(&self.property, "date", json!({ "past_year": {} }))
    }

    pub fn within_next_week(self) -> Filter {
        leaf(&self.property, "date", json!({ "next_week": {} }))
    }

    pub fn within_next_month(self) -> Filter {
        leaf(&self.property, "date", json!({ "next_month": {} }))
    }

    pub fn within_next_year(self) -> Filter {
        leaf(&self.property, "date", json!({ "next_year": {} }))
    }

    pub fn is_empty(self) -> Filter {
        leaf(&self.property, "date", json!({ "is_empty": true }))
    }

    pub fn is_not_empty(self) -> Filter {
        leaf(&self.property, "date", json!({ "is_not_empty": true }))
    }
}

/// Conditions on a relation property.
pub fn relation(property: impl Into<String>) -> RelationCondition {
    RelationCondition {
        property: property.into(),
    }
}

pub struct RelationCondition {
    property: String,
}

impl RelationCondition {
    pub fn contains(self, id: impl Into<String>) -> Filter {
        leaf(&self.property, "relation", json!({ "contains": id.into() }))
    }

    pub fn not_contains(self, id: impl Into<String>) -> Filter {
        leaf(
            &self.property,
            "relation",
            json!({ "does_not_contain": id.into() }),
        )
    }

    pub fn is_empty(self) -> Filter {
        leaf(&self.property, "relation", json!({ "is_empty": true }))
    }

    pub fn is_not_empty(self) -> Filter {
        leaf(&self.property, "relation", json!({ "is_not_empty": true }))
    }
}

// =============================================================================
// Sorts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSort {
    CreatedTime,
    LastEditedTime,
}

impl TimestampSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampSort::CreatedTime => "created_time",
            TimestampSort::LastEditedTime => "last_edited_time",
        }
    }
}

/// One sort criterion for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    key: SortKey,
    direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Property(String),
    Timestamp(TimestampSort),
}

impl Sort {
    pub fn by(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: SortKey::Property(property.into()),
            direction,
        }
    }

    pub fn by_timestamp(timestamp: TimestampSort, direction: SortDirection) -> Self {
        Self {
            key: SortKey::Timestamp(timestamp),
            direction,
        }
    }

    pub fn encode(&self) -> Json {
        match &self.key {
            SortKey::Property(property) => json!({
                "property": property,
                "direction": self.direction.as_str(),
            }),
            SortKey::Timestamp(timestamp) => json!({
                "timestamp": timestamp.as_str(),
                "direction": self.direction.as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn l(name: &str) -> Filter {
        select(name).equals("x")
    }

    #[test]
    fn test_same_kind_composition_stays_flat() {
        let a = l("A").and(l("B")).unwrap();
        let b = l("C").and(l("D")).unwrap();
        assert_eq!(a.nesting(), 1);

        let combined = a.clone().and(b.clone()).unwrap();
        assert_eq!(combined.nesting(), a.nesting().max(b.nesting()));
        match &combined {
            Filter::And(children) => assert_eq!(children.len(), 4),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_kind_composition_nests_by_one() {
        let a = l("A").and(l("B")).unwrap();
        let b = l("C").and(l("D")).unwrap();
        let combined = a.clone().or(b.clone()).unwrap();
        assert_eq!(combined.nesting(), 1 + a.nesting().max(b.nesting()));
    }

    #[test]
    fn test_too_deep_fails_at_construction() {
        let inner_or = l("A").or(l("B")).unwrap();
        let mid_and = inner_or.and(l("C")).unwrap();
        assert_eq!(mid_and.nesting(), 2);

        // A different compound kind around a depth-2 tree would reach 3.
        let err = mid_and.or(l("D")).unwrap_err();
        match err {
            FilterError::TooDeep {
                nesting,
                max,
                structure,
            } => {
                assert_eq!(nesting, 3);
                assert_eq!(max, MAX_FILTER_NESTING);
                assert!(structure.contains("leaf(A)"), "structure: {}", structure);
            }
        }
    }

    #[test]
    fn test_equals_any_builds_or_of_equals() {
        let filter = select("Stage").equals_any(["draft", "review"]);
        let encoded = filter.encode();
        let arms = encoded["or"].as_array().unwrap();
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0]["select"]["equals"], "draft");
        assert_eq!(arms[1]["select"]["equals"], "review");
    }

    #[test]
    fn test_equals_none_builds_and_of_not_equals() {
        let filter = select("Stage").equals_none(["draft", "review"]);
        let encoded = filter.encode();
        let arms = encoded["and"].as_array().unwrap();
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0]["select"]["does_not_equal"], "draft");
        assert_eq!(arms[1]["select"]["does_not_equal"], "review");
    }

    #[test]
    fn test_plain_filter_reports_nesting_zero() {
        let raw = serde_json::json!({ "or": [{ "and": [] }] });
        let filter = Filter::plain(raw);
        assert_eq!(filter.nesting(), 0);
    }

    #[test]
    fn test_leaf_encoding_carries_property_and_kind() {
        let encoded = date("Due").within_past_week().encode();
        assert_eq!(encoded["property"], "Due");
        assert_eq!(encoded["date"]["past_week"], serde_json::json!({}));

        let encoded = title("Name").starts_with("The").encode();
        assert_eq!(encoded["title"]["starts_with"], "The");
    }

    prop_compose! {
        fn arb_leaf()(name in "[A-Z][a-z]{1,6}") -> Filter {
            select(name.as_str()).equals("v")
        }
    }

    prop_compose! {
        // A compound of nesting exactly 1, either kind.
        fn arb_compound()(
            leaves in prop::collection::vec(arb_leaf(), 2..5),
            is_and in any::<bool>(),
        ) -> Filter {
            if is_and {
                Filter::And(leaves)
            } else {
                Filter::Or(leaves)
            }
        }
    }

    proptest! {
        #[test]
        fn prop_same_kind_keeps_nesting(a in arb_compound(), b in arb_compound()) {
            let same_kind = matches!(
                (&a, &b),
                (Filter::And(_), Filter::And(_)) | (Filter::Or(_), Filter::Or(_))
            );
            let expected = if same_kind {
                a.nesting().max(b.nesting())
            } else {
                1 + a.nesting().max(b.nesting())
            };
            let composed = match &a {
                Filter::And(_) => a.clone().and(b.clone()),
                _ => a.clone().or(b.clone()),
            };
            prop_assert_eq!(composed.unwrap().nesting(), expected);
        }
    }
}
