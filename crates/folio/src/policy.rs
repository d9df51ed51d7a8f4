//! The write-if-absent policy.
//!
//! Repeated synchronization runs must not clobber manually edited remote
//! data: unless overwrite mode is on, a write applies only when the cached
//! remote value is empty. What counts as empty is a per-field choice; the
//! legacy sentinel list is an explicit opt-in, not the default, because it
//! swallows genuine `"0"`/`"1"` values.

use std::collections::HashMap;

use folio_api::PropertyValue;

/// How to decide that a cached value is "empty" and safe to overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptinessRule {
    /// Empty means: no runs, `false`, `[]`, `{}`, `""` or absent.
    #[default]
    Standard,
    /// `Standard`, plus the legacy placeholder strings `0`, `1`, `.`, `-`.
    LegacySentinels,
    /// Nothing is empty; the field is never overwritten without force.
    Preserve,
}

const LEGACY_SENTINELS: [&str; 4] = ["0", "1", ".", "-"];

impl EmptinessRule {
    pub fn is_empty(&self, value: &PropertyValue) -> bool {
        match self {
            EmptinessRule::Preserve => false,
            EmptinessRule::Standard => standard_empty(value),
            EmptinessRule::LegacySentinels => {
                standard_empty(value) || LEGACY_SENTINELS.contains(&value.plain_text().as_str())
            }
        }
    }
}

fn standard_empty(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Title(rt) | PropertyValue::Text(rt) => rt.plain_text().is_empty(),
        PropertyValue::Number(n) => n.is_none(),
        PropertyValue::Checkbox(b) => !b,
        PropertyValue::Select(opt) | PropertyValue::Status(opt) => {
            opt.as_deref().unwrap_or("").is_empty()
        }
        PropertyValue::MultiSelect(items) => items.is_empty(),
        PropertyValue::Date(d) => d.is_none(),
        PropertyValue::People(items) | PropertyValue::Relation(items) => items.is_empty(),
        PropertyValue::Files(files) => files.is_empty(),
        // Read-only values are never a reason to write.
        PropertyValue::Formula(_)
        | PropertyValue::Rollup(_)
        | PropertyValue::Unsupported { .. } => false,
    }
}

/// Per-editor write policy: global overwrite switch plus per-field
/// emptiness rules.
#[derive(Debug, Clone, Default)]
pub struct WritePolicy {
    overwrite: bool,
    default_rule: EmptinessRule,
    rules: HashMap<String, EmptinessRule>,
}

impl WritePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always apply writes, regardless of cached state.
    pub fn overwrite() -> Self {
        Self {
            overwrite: true,
            ..Self::default()
        }
    }

    pub fn set_overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    pub fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn with_rule(mut self, name: impl Into<String>, rule: EmptinessRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    pub fn with_default_rule(mut self, rule: EmptinessRule) -> Self {
        self.default_rule = rule;
        self
    }

    pub fn rule_for(&self, name: &str) -> EmptinessRule {
        self.rules.get(name).copied().unwrap_or(self.default_rule)
    }

    /// Whether a write to `name` should reach the stash given the cached
    /// remote value.
    pub fn should_apply(&self, name: &str, cached: Option<&PropertyValue>) -> bool {
        if self.overwrite {
            return true;
        }
        match cached {
            None => true,
            Some(value) => self.rule_for(name).is_empty(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_api::RichText;

    #[test]
    fn test_standard_rule() {
        let rule = EmptinessRule::Standard;
        assert!(rule.is_empty(&PropertyValue::Text(RichText::new())));
        assert!(rule.is_empty(&PropertyValue::Number(None)));
        assert!(rule.is_empty(&PropertyValue::Checkbox(false)));
        assert!(rule.is_empty(&PropertyValue::MultiSelect(vec![])));

        assert!(!rule.is_empty(&PropertyValue::Text(RichText::plain("0"))));
        assert!(!rule.is_empty(&PropertyValue::Checkbox(true)));
    }

    #[test]
    fn test_legacy_sentinels_are_opt_in() {
        let zero = PropertyValue::Text(RichText::plain("0"));
        assert!(!EmptinessRule::Standard.is_empty(&zero));
        assert!(EmptinessRule::LegacySentinels.is_empty(&zero));
    }

    #[test]
    fn test_policy_respects_per_field_rules() {
        let policy = WritePolicy::new().with_rule("Score", EmptinessRule::LegacySentinels);
        let zero = PropertyValue::Text(RichText::plain("0"));

        // "Score" opts into the sentinel list; other fields keep Standard.
        assert!(policy.should_apply("Score", Some(&zero)));
        assert!(!policy.should_apply("Name", Some(&zero)));
        assert!(policy.should_apply("Name", None));
    }

    #[test]
    fn test_overwrite_wins() {
        let policy = WritePolicy::overwrite();
        let value = PropertyValue::Text(RichText::plain("existing"));
        assert!(policy.should_apply("Name", Some(&value)));
    }
}
