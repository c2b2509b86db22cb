use serde::{Serialize, Serializer};

use crate::models::condition::{Condition, ConditionError};
use crate::models::render::parse_c_integer;

/// A compiled condition together with the text it was compiled from
#[derive(Debug, Clone)]
pub struct ConditionEntry {
    pub source: String,
    pub condition: Condition,
}

impl ConditionEntry {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        Ok(Self {
            source: source.to_string(),
            condition: Condition::parse(source)?,
        })
    }
}

impl Serialize for ConditionEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Ordered list of window conditions, e.g. `shadow-exclude`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ConditionList {
    entries: Vec<ConditionEntry>,
}

impl ConditionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ConditionEntry) {
        self.entries.push(entry);
    }

    /// Move every entry of `other` to the end of this list
    pub fn append(&mut self, mut other: ConditionList) {
        self.entries.append(&mut other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConditionEntry> {
        self.entries.iter()
    }

    /// Source text of every entry, in list order
    pub fn sources(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.source.as_str()).collect()
    }
}

/// Target opacity for windows matching a condition
#[derive(Debug, Clone, Serialize)]
pub struct OpacityRule {
    /// Percentage, `0..=100`
    pub opacity: u8,
    #[serde(rename = "condition")]
    pub source: String,
    #[serde(skip)]
    pub condition: Condition,
}

/// Errors from parsing an `opacity-rule` entry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpacityRuleError {
    #[error("No opacity specified")]
    MissingOpacity,

    #[error("Opacity {0} invalid, must be between 0 and 100")]
    OutOfRange(i64),

    #[error("Opacity terminator `:` not found")]
    MissingTerminator,

    #[error("Invalid condition: {0}")]
    Condition(#[from] ConditionError),
}

impl OpacityRule {
    /// Parse `PERCENT:CONDITION`, e.g. `90:class_g = 'URxvt'`
    pub fn parse(src: &str) -> Result<Self, OpacityRuleError> {
        let (number, rest) = split_leading_integer(src.trim_start());
        if number.is_empty() {
            return Err(OpacityRuleError::MissingOpacity);
        }
        let value = parse_c_integer(number).ok_or(OpacityRuleError::MissingOpacity)?;
        if !(0..=100).contains(&value) {
            return Err(OpacityRuleError::OutOfRange(value));
        }

        let pattern = rest
            .trim_start()
            .strip_prefix(':')
            .ok_or(OpacityRuleError::MissingTerminator)?;
        let condition = Condition::parse(pattern)?;

        Ok(Self {
            opacity: value as u8,
            source: pattern.trim().to_string(),
            condition,
        })
    }

    /// Opacity as a fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        f64::from(self.opacity) / 100.0
    }
}

/// Split off the prefix `strtol(.., 0)` would consume
fn split_leading_integer(s: &str) -> (&str, &str) {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    let digits = &bytes[end..];
    let is_hex = (digits.starts_with(b"0x") || digits.starts_with(b"0X"))
        && digits.get(2).is_some_and(u8::is_ascii_hexdigit);
    if is_hex {
        end += 2;
        while bytes.get(end).is_some_and(u8::is_ascii_hexdigit) {
            end += 1;
        }
    } else {
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
    }
    s.split_at(end)
}

/// Opacity rules in the order they were configured
pub type OpacityRuleList = Vec<OpacityRule>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opacity_rule() {
        let rule = OpacityRule::parse("90:class_g = 'URxvt'").unwrap();
        assert_eq!(rule.opacity, 90);
        assert_eq!(rule.source, "class_g = 'URxvt'");
        assert!((rule.fraction() - 0.9).abs() < f64::EPSILON);

        let spaced = OpacityRule::parse("  0x32 : focused").unwrap();
        assert_eq!(spaced.opacity, 50);
    }

    #[test]
    fn test_malformed_opacity_rules() {
        assert_eq!(
            OpacityRule::parse("class_g = 'URxvt'").unwrap_err(),
            OpacityRuleError::MissingOpacity
        );
        assert_eq!(
            OpacityRule::parse("101:focused").unwrap_err(),
            OpacityRuleError::OutOfRange(101)
        );
        assert_eq!(
            OpacityRule::parse("-5:focused").unwrap_err(),
            OpacityRuleError::OutOfRange(-5)
        );
        assert_eq!(
            OpacityRule::parse("80 focused").unwrap_err(),
            OpacityRuleError::MissingTerminator
        );
        assert!(matches!(
            OpacityRule::parse("80:name ~= '['"),
            Err(OpacityRuleError::Condition(_))
        ));
    }

    #[test]
    fn test_condition_list_keeps_order() {
        let mut list = ConditionList::new();
        for source in ["focused", "argb", "fullscreen"] {
            list.push(ConditionEntry::parse(source).unwrap());
        }
        assert_eq!(list.sources(), vec!["focused", "argb", "fullscreen"]);
        assert_eq!(list.len(), 3);
    }
}
