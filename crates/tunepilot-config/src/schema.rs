//! Setting schema: the registry of known keys, their validation rules
//! and their defaults.
//!
//! Every key a provider configuration may contain is declared here.
//! Mutations go through [`ValueRule::check`] so a stored document can
//! never hold a value the schema rejects.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tunepilot_models::ConfigValue;

/// Validation rule attached to a setting key.
#[derive(Debug, Clone)]
pub enum ValueRule {
    /// Boolean flag.
    Bool,
    /// Integer within an inclusive range.
    IntRange { min: i64, max: i64 },
    /// One of a fixed set of string values.
    Enum(&'static [&'static str]),
    /// Any non-empty string.
    NonEmptyStr,
}

impl ValueRule {
    /// The type a raw user string should be parsed as for this rule.
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueRule::Bool => "bool",
            ValueRule::IntRange { .. } => "int",
            ValueRule::Enum(_) | ValueRule::NonEmptyStr => "string",
        }
    }

    /// Checks a value against the rule, returning a human-readable
    /// reason on failure.
    pub fn check(&self, value: &ConfigValue) -> std::result::Result<(), String> {
        match self {
            ValueRule::Bool => match value {
                ConfigValue::Bool(_) => Ok(()),
                other => Err(format!("expected a boolean, got {}", other.type_name())),
            },
            ValueRule::IntRange { min, max } => match value {
                ConfigValue::Int(n) if (*min..=*max).contains(n) => Ok(()),
                ConfigValue::Int(n) => {
                    Err(format!("must be between {} and {}, got {}", min, max, n))
                }
                other => Err(format!("expected an integer, got {}", other.type_name())),
            },
            ValueRule::Enum(allowed) => match value {
                ConfigValue::Str(s) if allowed.contains(&s.as_str()) => Ok(()),
                ConfigValue::Str(s) => Err(format!(
                    "must be one of {}, got {:?}",
                    allowed.join(", "),
                    s
                )),
                other => Err(format!("expected a string, got {}", other.type_name())),
            },
            ValueRule::NonEmptyStr => match value {
                ConfigValue::Str(s) if !s.trim().is_empty() => Ok(()),
                ConfigValue::Str(_) => Err("must not be empty".to_string()),
                other => Err(format!("expected a string, got {}", other.type_name())),
            },
        }
    }
}

/// A registered setting: key, section for display grouping, rule and
/// default value.
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub key: &'static str,
    pub section: &'static str,
    pub rule: ValueRule,
    pub default: ConfigValue,
}

/// Audio quality tiers, lowest to highest.
pub const AUDIO_QUALITIES: &[&str] = &["LOW", "HIGH", "LOSSLESS", "HI_RES_LOSSLESS"];

/// Video quality tiers (vertical resolution).
pub const VIDEO_QUALITIES: &[&str] = &["360", "480", "720", "1080"];

fn build_registry() -> Vec<KeySpec> {
    use ValueRule::*;

    let spec = |key, section, rule, default| KeySpec {
        key,
        section,
        rule,
        default,
    };

    vec![
        // Paths
        spec(
            "download_base_path",
            "paths",
            NonEmptyStr,
            ConfigValue::from("~/download"),
        ),
        spec(
            "path_binary_ffmpeg",
            "paths",
            NonEmptyStr,
            ConfigValue::from("/usr/bin/ffmpeg"),
        ),
        // Quality
        spec(
            "quality_audio",
            "quality",
            Enum(AUDIO_QUALITIES),
            ConfigValue::from("LOSSLESS"),
        ),
        spec(
            "quality_video",
            "quality",
            Enum(VIDEO_QUALITIES),
            ConfigValue::from("1080"),
        ),
        // Performance
        spec(
            "downloads_concurrent_max",
            "performance",
            IntRange { min: 1, max: 10 },
            ConfigValue::from(3),
        ),
        spec(
            "downloads_simultaneous_per_track_max",
            "performance",
            IntRange { min: 1, max: 10 },
            ConfigValue::from(1),
        ),
        spec(
            "download_delay",
            "performance",
            Bool,
            ConfigValue::from(false),
        ),
        spec(
            "retry_attempts",
            "performance",
            IntRange { min: 0, max: 10 },
            ConfigValue::from(3),
        ),
        spec(
            "timeout_seconds",
            "performance",
            IntRange { min: 1, max: 3600 },
            ConfigValue::from(300),
        ),
        // Metadata
        spec("lyrics_embed", "metadata", Bool, ConfigValue::from(true)),
        spec("lyrics_file", "metadata", Bool, ConfigValue::from(true)),
        spec(
            "metadata_cover_embed",
            "metadata",
            Bool,
            ConfigValue::from(true),
        ),
        spec(
            "metadata_cover_dimension",
            "metadata",
            IntRange { min: 1, max: 5000 },
            ConfigValue::from(1200),
        ),
        spec(
            "cover_album_file",
            "metadata",
            Bool,
            ConfigValue::from(true),
        ),
        spec(
            "metadata_replay_gain",
            "metadata",
            Bool,
            ConfigValue::from(true),
        ),
        // Files
        spec("skip_existing", "files", Bool, ConfigValue::from(true)),
        spec("extract_flac", "files", Bool, ConfigValue::from(true)),
        spec(
            "symlink_to_track",
            "files",
            Bool,
            ConfigValue::from(false),
        ),
        spec(
            "album_track_num_pad_min",
            "files",
            IntRange { min: 1, max: 10 },
            ConfigValue::from(2),
        ),
        // Video
        spec("video_download", "video", Bool, ConfigValue::from(true)),
        spec(
            "video_convert_mp4",
            "video",
            Bool,
            ConfigValue::from(true),
        ),
        // Playlists
        spec(
            "playlist_create",
            "playlists",
            Bool,
            ConfigValue::from(true),
        ),
    ]
}

/// All registered setting keys in display order.
pub fn registry() -> &'static [KeySpec] {
    static REGISTRY: OnceLock<Vec<KeySpec>> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

/// Looks up a key's spec, if registered.
pub fn spec_for(key: &str) -> Option<&'static KeySpec> {
    registry().iter().find(|s| s.key == key)
}

/// The default value for every registered key.
pub fn default_settings() -> BTreeMap<String, ConfigValue> {
    registry()
        .iter()
        .map(|s| (s.key.to_string(), s.default.clone()))
        .collect()
}

/// Display sections in a stable order.
pub fn sections() -> Vec<&'static str> {
    let mut out = Vec::new();
    for spec in registry() {
        if !out.contains(&spec.section) {
            out.push(spec.section);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_their_own_rules() {
        for spec in registry() {
            assert!(
                spec.rule.check(&spec.default).is_ok(),
                "default for {} fails its rule",
                spec.key
            );
        }
    }

    #[test]
    fn test_int_range_bounds() {
        let rule = ValueRule::IntRange { min: 1, max: 10 };
        assert!(rule.check(&ConfigValue::from(1)).is_ok());
        assert!(rule.check(&ConfigValue::from(10)).is_ok());
        assert!(rule.check(&ConfigValue::from(0)).is_err());
        assert!(rule.check(&ConfigValue::from(11)).is_err());
        assert!(rule.check(&ConfigValue::from(true)).is_err());
    }

    #[test]
    fn test_enum_rule() {
        let rule = ValueRule::Enum(AUDIO_QUALITIES);
        assert!(rule.check(&ConfigValue::from("LOSSLESS")).is_ok());
        assert!(rule.check(&ConfigValue::from("lossless")).is_err());
        assert!(rule.check(&ConfigValue::from(3)).is_err());
    }

    #[test]
    fn test_non_empty_str_rule() {
        let rule = ValueRule::NonEmptyStr;
        assert!(rule.check(&ConfigValue::from("/usr/bin/ffmpeg")).is_ok());
        assert!(rule.check(&ConfigValue::from("")).is_err());
        assert!(rule.check(&ConfigValue::from("   ")).is_err());
    }

    #[test]
    fn test_spec_for_unknown() {
        assert!(spec_for("quality_audio").is_some());
        assert!(spec_for("no_such_key").is_none());
    }

    #[test]
    fn test_every_key_has_a_section() {
        let sections = sections();
        for spec in registry() {
            assert!(sections.contains(&spec.section));
        }
    }
}
