use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Lowest priority a Site Engineer may assign.
pub const MIN_PRIORITY: i32 = 1;
/// Highest priority a Site Engineer may assign. Only 1..=4 carry a colour.
pub const MAX_PRIORITY: i32 = 10;

/// Display metadata for the numeric priorities used when ranking allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityLevel {
    pub value: i32,
    pub label: &'static str,
    pub color: &'static str,
}

pub const PRIORITY_LEVELS: [PriorityLevel; 4] = [
    PriorityLevel {
        value: 1,
        label: "High",
        color: "#FF5252",
    },
    PriorityLevel {
        value: 2,
        label: "Medium",
        color: "#FFAB40",
    },
    PriorityLevel {
        value: 3,
        label: "Low",
        color: "#69F0AE",
    },
    PriorityLevel {
        value: 4,
        label: "Very low",
        color: "#B388FF",
    },
];

impl PriorityLevel {
    pub fn of(priority: i32) -> Option<PriorityLevel> {
        PRIORITY_LEVELS.iter().copied().find(|l| l.value == priority)
    }

    /// Finds a level by its label, ignoring case (`"high"` -> 1).
    pub fn from_label(label: &str) -> Option<PriorityLevel> {
        PRIORITY_LEVELS
            .iter()
            .copied()
            .find(|l| l.label.eq_ignore_ascii_case(label.trim()))
    }

    /// Short marker shown next to a ranked row, e.g. `[1 High]`.
    pub fn marker(priority: i32) -> String {
        match Self::of(priority) {
            Some(level) => format!("[{} {}]", level.value, level.label),
            None => priority.to_string(),
        }
    }
}

/// Marker for an optional priority, `-` when unset.
pub fn priority_marker(priority: Option<i32>) -> String {
    priority
        .map(PriorityLevel::marker)
        .unwrap_or_else(|| "-".to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPriority {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accepts a number, a numeric string or a level label such as `"High"`.
///
/// Anything else becomes `None` with a warning, so one malformed row does not
/// fail a whole list response.
pub fn deserialize_priority<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<RawPriority>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let parsed = match &raw {
        RawPriority::Int(v) => i32::try_from(*v).ok(),
        RawPriority::Float(v) if v.fract() == 0.0 && v.abs() <= i32::MAX as f64 => Some(*v as i32),
        RawPriority::Float(_) => None,
        RawPriority::Text(text) if text.trim().is_empty() => return Ok(None),
        RawPriority::Text(text) => text
            .trim()
            .parse::<i32>()
            .ok()
            .or_else(|| PriorityLevel::from_label(text).map(|l| l.value)),
    };

    if parsed.is_none() {
        let shown = match raw {
            RawPriority::Int(v) => v.to_string(),
            RawPriority::Float(v) => v.to_string(),
            RawPriority::Text(text) => text,
        };
        warn!(priority = %shown, "ignoring unrecognised priority");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels_have_markers() {
        assert_eq!(PriorityLevel::of(1).unwrap().color, "#FF5252");
        assert_eq!(PriorityLevel::marker(3), "[3 Low]");
    }

    #[test]
    fn out_of_range_priorities_fall_back_to_number() {
        assert!(PriorityLevel::of(0).is_none());
        assert_eq!(PriorityLevel::marker(7), "7");
    }

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "deserialize_priority")]
        priority: Option<i32>,
    }

    fn parse(raw: &str) -> Option<i32> {
        serde_json::from_str::<Row>(raw).unwrap().priority
    }

    #[test]
    fn priorities_parse_leniently() {
        assert_eq!(parse(r#"{"priority": 2}"#), Some(2));
        assert_eq!(parse(r#"{"priority": "7"}"#), Some(7));
        assert_eq!(parse(r#"{"priority": "High"}"#), Some(1));
        assert_eq!(parse(r#"{"priority": "very low"}"#), Some(4));
        assert_eq!(parse(r#"{"priority": "urgent"}"#), None);
        assert_eq!(parse(r#"{"priority": 1.5}"#), None);
        assert_eq!(parse(r#"{"priority": ""}"#), None);
        assert_eq!(parse(r#"{"priority": null}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }

    #[test]
    fn optional_marker() {
        assert_eq!(priority_marker(Some(2)), "[2 Medium]");
        assert_eq!(priority_marker(None), "-");
    }
}
