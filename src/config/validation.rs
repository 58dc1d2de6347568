//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility checks.
//!
//! The raw TOML is first walked as a `toml::Value` tree and compared against
//! the known field names, emitting warnings with "did you mean?" suggestions.
//! Warnings never break an existing config.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `EngineConfig`.
///
/// Any new field added to `EngineConfig` must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        "engine",
        "engine.tick_mode",
        "engine.tick_interval_ms",
        "engine.stale_frame_ms",
        "classifier",
        "classifier.margin",
        "hold",
        "hold.cap_ms",
        "hold.decay",
        "hold.decay_factor",
        "thresholds",
        "thresholds.one_leg",
        "thresholds.one_leg.warn_secs",
        "thresholds.one_leg.pass_secs",
        "ledger",
        "ledger.capacity",
        "ledger.data_dir",
        "server",
        "server.addr",
    ];
    keys.iter().copied().collect()
}

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(k, d)| (*d, *k))
        .map(|(k, _)| k.to_string())
}

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

/// Plausibility checks that warn but never reject.
pub fn validate_ranges(config: &super::EngineConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if config.hold.cap_ms > 30_000.0 {
        warnings.push(ValidationWarning {
            field: "hold.cap_ms".to_string(),
            message: format!(
                "hold.cap_ms = {:.0} is unusually long for a hold-to-pass task",
                config.hold.cap_ms
            ),
            suggestion: None,
        });
    }

    if config.engine.stale_frame_ms < config.engine.tick_interval_ms {
        warnings.push(ValidationWarning {
            field: "engine.stale_frame_ms".to_string(),
            message: format!(
                "engine.stale_frame_ms ({}) is shorter than tick_interval_ms ({}); most ticks will be indeterminate",
                config.engine.stale_frame_ms, config.engine.tick_interval_ms
            ),
            suggestion: None,
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_unknown_key_suggests_correction() {
        let warnings = validate_unknown_keys("[hold]\ncap_mss = 2000.0\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "hold.cap_mss");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("hold.cap_ms"));
    }

    #[test]
    fn test_known_keys_produce_no_warnings() {
        let toml_str = r#"
[engine]
tick_mode = "per_frame"

[thresholds.one_leg]
warn_secs = 2.0
"#;
        assert!(validate_unknown_keys(toml_str).is_empty());
    }

    #[test]
    fn test_range_warning_for_short_staleness() {
        let mut config = super::super::EngineConfig::default();
        config.engine.stale_frame_ms = 50;
        let warnings = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "engine.stale_frame_ms"));
    }
}
