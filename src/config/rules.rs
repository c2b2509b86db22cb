//! Condition list and opacity rule options.
//!
//! Each of these options accepts either a single pattern string or an array
//! of them; both forms produce entries in the order they were written.

use tracing::warn;

use crate::config::document::{Document, Value};
use crate::config::error::{ConfigError, ConfigWarning};
use crate::models::{ConditionEntry, ConditionList, OpacityRule, OpacityRuleList, Options};

/// Condition list options and the field each one fills
pub const CONDITION_LISTS: [(&str, fn(&mut Options) -> &mut ConditionList); 6] = [
    ("shadow-exclude", |o| &mut o.shadow_blacklist),
    ("fade-exclude", |o| &mut o.fade_blacklist),
    ("focus-exclude", |o| &mut o.focus_blacklist),
    ("invert-color-include", |o| &mut o.invert_color_list),
    ("blur-background-exclude", |o| &mut o.blur_background_blacklist),
    ("unredir-if-possible-exclude", |o| &mut o.unredir_if_possible_blacklist),
];

pub const OPACITY_RULE_OPTION: &str = "opacity-rule";

/// Entries of a string-or-array option, `None` when absent or of another type
fn pattern_values<'d>(doc: &'d Document, path: &str) -> Option<Vec<&'d Value>> {
    let value = doc.lookup(path)?;
    match value {
        Value::Str(_) => Some(vec![value]),
        Value::Array(items) | Value::List(items) => Some(items.iter().collect()),
        _ => None,
    }
}

/// Build the condition list stored at `path`.
///
/// Entries that are not strings or do not compile are skipped with a warning.
pub fn build_condition_list(
    doc: &Document,
    path: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> ConditionList {
    let mut list = ConditionList::new();
    let Some(values) = pattern_values(doc, path) else {
        if let Some(value) = doc.lookup(path) {
            let message = format!(
                "Option `{}` expects a string or an array of strings, found {}; ignored",
                path,
                value.type_name()
            );
            warn!("{}", message);
            warnings.push(ConfigWarning::new(path, message));
        }
        return list;
    };

    for value in values {
        let Some(source) = value.as_str() else {
            let message = format!("Non-string entry ({}) in `{}` skipped", value.type_name(), path);
            warn!("{}", message);
            warnings.push(ConfigWarning::new(path, message));
            continue;
        };
        match ConditionEntry::parse(source) {
            Ok(entry) => list.push(entry),
            Err(e) => {
                let message = format!("Invalid condition in `{}` skipped: {}", path, e);
                warn!("{}", message);
                warnings.push(ConfigWarning::new(path, message));
            }
        }
    }
    list
}

/// Append the opacity rules stored at `path` to `rules`.
///
/// Every entry must parse; on the first malformed one nothing is appended.
pub fn build_opacity_rules(
    doc: &Document,
    path: &str,
    rules: &mut OpacityRuleList,
) -> Result<(), ConfigError> {
    let Some(values) = pattern_values(doc, path) else {
        return Ok(());
    };

    let mut parsed = Vec::with_capacity(values.len());
    for value in values {
        let source = value
            .as_str()
            .ok_or_else(|| ConfigError::MalformedOpacityRule {
                rule: format!("<{}>", value.type_name()),
                reason: "entry is not a string".to_string(),
            })?;
        let rule = OpacityRule::parse(source).map_err(|e| ConfigError::MalformedOpacityRule {
            rule: source.to_string(),
            reason: e.to_string(),
        })?;
        parsed.push(rule);
    }

    rules.extend(parsed);
    Ok(())
}

/// Fill every condition list and the opacity rules of `options`
pub fn build_rule_lists(
    doc: &Document,
    options: &mut Options,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigError> {
    for (path, field) in CONDITION_LISTS {
        let list = build_condition_list(doc, path, warnings);
        field(options).append(list);
    }
    build_opacity_rules(doc, OPACITY_RULE_OPTION, &mut options.opacity_rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str) -> Document {
        Document::parse(source, None, None).unwrap()
    }

    #[test]
    fn test_string_and_array_equivalent() {
        let mut warnings = Vec::new();
        let single = build_condition_list(
            &doc(r#"shadow-exclude = "name = 'A'";"#),
            "shadow-exclude",
            &mut warnings,
        );
        let array = build_condition_list(
            &doc(r#"shadow-exclude = [ "name = 'A'" ];"#),
            "shadow-exclude",
            &mut warnings,
        );
        assert_eq!(single.sources(), vec!["name = 'A'"]);
        assert_eq!(single.sources(), array.sources());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_array_order_preserved() {
        let mut warnings = Vec::new();
        let list = build_condition_list(
            &doc(r#"fade-exclude = [ "class_g = 'A'", "class_g = 'B'", "class_g = 'C'" ];"#),
            "fade-exclude",
            &mut warnings,
        );
        assert_eq!(list.sources(), vec!["class_g = 'A'", "class_g = 'B'", "class_g = 'C'"]);
    }

    #[test]
    fn test_absent_is_empty() {
        let mut warnings = Vec::new();
        let list = build_condition_list(&doc("shadow = true;"), "focus-exclude", &mut warnings);
        assert!(list.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_bad_entries_skipped() {
        let mut warnings = Vec::new();
        let list = build_condition_list(
            &doc(r#"focus-exclude = ( "focused", 3, "name ~= '['", "argb" );"#),
            "focus-exclude",
            &mut warnings,
        );
        assert_eq!(list.sources(), vec!["focused", "argb"]);
        assert_eq!(warnings.len(), 2);

        let list = build_condition_list(&doc("focus-exclude = 7;"), "focus-exclude", &mut warnings);
        assert!(list.is_empty());
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_opacity_rules() {
        let mut rules = OpacityRuleList::new();
        build_opacity_rules(
            &doc(r#"opacity-rule = [ "90:class_g = 'URxvt'", "80 : focused" ];"#),
            "opacity-rule",
            &mut rules,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].opacity, 90);
        assert_eq!(rules[1].opacity, 80);
        assert_eq!(rules[1].source, "focused");
    }

    #[test]
    fn test_malformed_opacity_rule_is_fatal() {
        let mut rules = OpacityRuleList::new();
        let err = build_opacity_rules(
            &doc(r#"opacity-rule = [ "90:focused", "150:argb" ];"#),
            "opacity-rule",
            &mut rules,
        )
        .unwrap_err();
        assert!(err.is_fatal());
        assert!(rules.is_empty());

        let source = doc(r#"opacity-rule = ( "90:focused", 1 );"#);
        let err = build_opacity_rules(&source, "opacity-rule", &mut rules).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedOpacityRule { .. }));
        assert!(rules.is_empty());
    }

    #[test]
    fn test_build_rule_lists() {
        let mut options = Options::default();
        let mut warnings = Vec::new();
        build_rule_lists(
            &doc(r#"
                shadow-exclude = [ "name = 'Notification'" ];
                invert-color-include = "class_g = 'Xterm'";
                opacity-rule = "50:!focused";
            "#),
            &mut options,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(options.shadow_blacklist.len(), 1);
        assert_eq!(options.invert_color_list.len(), 1);
        assert!(options.fade_blacklist.is_empty());
        assert_eq!(options.opacity_rules.len(), 1);
    }
}
