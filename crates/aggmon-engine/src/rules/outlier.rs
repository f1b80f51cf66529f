use regex::Regex;
use std::collections::HashMap;

/// Regex-based outlier detection over collected output strings.
///
/// The first capture group is the grouping key; the remaining groups form
/// the value compared within that group. Designed to catch configuration
/// drift (say, mismatched version strings) across an otherwise homogeneous
/// fleet.
#[derive(Debug, Clone)]
pub struct OutlierRule {
    pattern: Regex,
}

impl OutlierRule {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Scan outputs for a key whose captured value differs from the value
    /// first seen for that key, returning the offending key.
    ///
    /// First divergence wins: scanning stops at the first mismatch and
    /// later divergent keys go unreported for this run. Outputs that do
    /// not match the pattern are skipped silently.
    pub fn evaluate(&self, outputs: &[String]) -> Option<String> {
        let mut seen: HashMap<String, Vec<Option<String>>> = HashMap::new();

        for output in outputs {
            let Some(captures) = self.pattern.captures(output) else {
                continue;
            };
            let Some(key) = captures.get(1) else {
                continue;
            };
            let key = key.as_str().to_string();
            let value: Vec<Option<String>> = captures
                .iter()
                .skip(2)
                .map(|m| m.map(|m| m.as_str().to_string()))
                .collect();

            if let Some(first) = seen.get(&key) {
                if *first != value {
                    tracing::debug!(key = %key, "Outlier detected, value diverges from first-seen");
                    return Some(key);
                }
            }
            seen.insert(key, value);
        }

        None
    }
}
