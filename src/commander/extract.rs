//! Pattern extraction from free-form command output.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{IcotestError, IcotestResult};

/// Values captured by the first match of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    matched: String,
    named: HashMap<String, String>,
}

impl Extracted {
    /// Complete text of the match
    pub fn matched(&self) -> &str {
        &self.matched
    }

    /// Text captured by the named group `name`, if it took part in the match
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// Search `output` of the command to `description` for the first match of `pattern`.
///
/// # Errors
/// Returns [`IcotestError::OutputMismatch`] carrying the complete output and the
/// pattern if the pattern matches nowhere.
pub fn extract(description: &str, output: &str, pattern: &Regex) -> IcotestResult<Extracted> {
    let captures = pattern
        .captures(output)
        .ok_or_else(|| IcotestError::OutputMismatch {
            description: description.to_string(),
            output: output.to_string(),
            pattern: pattern.as_str().to_string(),
        })?;
    let named = pattern
        .capture_names()
        .flatten()
        .filter_map(|name| {
            captures
                .name(name)
                .map(|group| (name.to_string(), group.as_str().to_string()))
        })
        .collect();

    Ok(Extracted {
        matched: captures
            .get(0)
            .map_or_else(String::new, |m| m.as_str().to_string()),
        named,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_groups_become_fields() {
        let pattern = Regex::new(r"Power\s*\[mW\]\s*:\s*(?P<milliwatts>\d+\.\d+)").unwrap();
        let extracted = extract("read power usage", "AEM\nPower [mW] : 45.230\nDone", &pattern).unwrap();
        assert_eq!(extracted.get("milliwatts"), Some("45.230"));
        assert_eq!(extracted.matched(), "Power [mW] : 45.230");
        assert_eq!(extracted.get("volts"), None);
    }

    #[test]
    fn first_match_wins() {
        let pattern = Regex::new(r"value=(?P<value>\d+)").unwrap();
        let extracted = extract("read value", "value=1 value=2", &pattern).unwrap();
        assert_eq!(extracted.get("value"), Some("1"));
    }

    #[test]
    fn missing_pattern_is_output_mismatch() {
        let pattern = Regex::new("Chip successfully unlocked").unwrap();
        let err = extract("unlock device", "Error", &pattern).unwrap_err();
        match err {
            IcotestError::OutputMismatch {
                description,
                output,
                pattern,
            } => {
                assert_eq!(description, "unlock device");
                assert_eq!(output, "Error");
                assert_eq!(pattern, "Chip successfully unlocked");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
