use std::path::Path;

use anyhow::Context;

use tutor_core::model::{PracticeSettings, SettingsDraft};

/// Resolve practice settings: defaults, then the optional TOML file, then
/// `overrides` (flags and `TUTOR_*` variables).
pub fn load_settings(
    path: Option<&Path>,
    overrides: SettingsDraft,
) -> anyhow::Result<PracticeSettings> {
    let file = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;
            parse_settings(&raw)
                .with_context(|| format!("invalid settings file {}", path.display()))?
        }
        None => SettingsDraft::default(),
    };

    let settings = file
        .merge(overrides)
        .validate()
        .map_err(tutor_core::Error::from)?;
    Ok(settings)
}

pub fn parse_settings(raw: &str) -> anyhow::Result<SettingsDraft> {
    Ok(toml::from_str(raw)?)
}
