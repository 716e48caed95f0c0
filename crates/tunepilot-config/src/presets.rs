//! Named configuration presets.
//!
//! A preset is a partial settings overlay: applying one overwrites the
//! keys it names and leaves every other key untouched.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tunepilot_models::ConfigValue;

/// A shipped preset: name, short description and the keys it sets.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub values: BTreeMap<String, ConfigValue>,
}

fn overlay(pairs: &[(&str, ConfigValue)]) -> BTreeMap<String, ConfigValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn build_presets() -> Vec<Preset> {
    vec![
        Preset {
            name: "high_quality",
            description: "Hi-res lossless audio with full metadata",
            values: overlay(&[
                ("quality_audio", ConfigValue::from("HI_RES_LOSSLESS")),
                ("quality_video", ConfigValue::from("1080")),
                ("metadata_cover_embed", ConfigValue::from(true)),
                ("metadata_cover_dimension", ConfigValue::from(2000)),
                ("lyrics_embed", ConfigValue::from(true)),
                ("lyrics_file", ConfigValue::from(true)),
                ("extract_flac", ConfigValue::from(true)),
                ("downloads_concurrent_max", ConfigValue::from(2)),
                ("retry_attempts", ConfigValue::from(5)),
            ]),
        },
        Preset {
            name: "fast_download",
            description: "Prioritize speed over quality and metadata",
            values: overlay(&[
                ("quality_audio", ConfigValue::from("HIGH")),
                ("quality_video", ConfigValue::from("720")),
                ("downloads_concurrent_max", ConfigValue::from(5)),
                ("downloads_simultaneous_per_track_max", ConfigValue::from(2)),
                ("metadata_cover_embed", ConfigValue::from(false)),
                ("lyrics_embed", ConfigValue::from(false)),
                ("extract_flac", ConfigValue::from(false)),
                ("retry_attempts", ConfigValue::from(2)),
                ("timeout_seconds", ConfigValue::from(180)),
            ]),
        },
        Preset {
            name: "minimal",
            description: "Audio only, no extras",
            values: overlay(&[
                ("quality_audio", ConfigValue::from("HIGH")),
                ("quality_video", ConfigValue::from("480")),
                ("metadata_cover_embed", ConfigValue::from(false)),
                ("lyrics_embed", ConfigValue::from(false)),
                ("lyrics_file", ConfigValue::from(false)),
                ("extract_flac", ConfigValue::from(false)),
                ("playlist_create", ConfigValue::from(false)),
                ("downloads_concurrent_max", ConfigValue::from(1)),
            ]),
        },
        Preset {
            name: "archive_quality",
            description: "Maximum quality for long-term archival",
            values: overlay(&[
                ("quality_audio", ConfigValue::from("HI_RES_LOSSLESS")),
                ("quality_video", ConfigValue::from("1080")),
                ("metadata_cover_embed", ConfigValue::from(true)),
                ("metadata_cover_dimension", ConfigValue::from(3000)),
                ("lyrics_embed", ConfigValue::from(true)),
                ("lyrics_file", ConfigValue::from(true)),
                ("extract_flac", ConfigValue::from(true)),
                ("metadata_replay_gain", ConfigValue::from(true)),
                ("download_delay", ConfigValue::from(true)),
                ("downloads_concurrent_max", ConfigValue::from(1)),
                ("retry_attempts", ConfigValue::from(5)),
                ("timeout_seconds", ConfigValue::from(600)),
            ]),
        },
        Preset {
            name: "balanced",
            description: "Sensible middle ground for everyday use",
            values: overlay(&[
                ("quality_audio", ConfigValue::from("LOSSLESS")),
                ("quality_video", ConfigValue::from("720")),
                ("metadata_cover_embed", ConfigValue::from(true)),
                ("metadata_cover_dimension", ConfigValue::from(1200)),
                ("lyrics_embed", ConfigValue::from(true)),
                ("lyrics_file", ConfigValue::from(false)),
                ("extract_flac", ConfigValue::from(true)),
                ("downloads_concurrent_max", ConfigValue::from(3)),
                ("retry_attempts", ConfigValue::from(3)),
            ]),
        },
    ]
}

/// All shipped presets.
pub fn presets() -> &'static [Preset] {
    static PRESETS: OnceLock<Vec<Preset>> = OnceLock::new();
    PRESETS.get_or_init(build_presets)
}

/// Looks up a preset by name.
pub fn preset(name: &str) -> Option<&'static Preset> {
    presets().iter().find(|p| p.name == name)
}
