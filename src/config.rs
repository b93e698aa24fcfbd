use std::fs;
use std::path::Path;

use crate::bottleneck::BottleneckCatalog;
use crate::cli::{resolve_jitter, SimArgs};
use crate::error::{Error, Result};
use crate::models::{JitterConfig, MultiplierStep, SimSettings};

pub fn load_config(path: &Path) -> Result<SimSettings> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

/// File settings (or defaults) overlaid with CLI flags, then validated.
pub fn build_settings(args: &SimArgs) -> Result<SimSettings> {
    let mut settings = match &args.config {
        Some(path) => load_config(path)?,
        None => SimSettings::default(),
    };

    if let Some(multiplier) = args.multiplier {
        settings.multiplier = multiplier;
    }
    if let Some(base_users) = args.base_users {
        settings.base_users = base_users;
    }
    if let Some(tick_rate_ms) = args.tick_rate_ms {
        settings.tick_rate_ms = tick_rate_ms;
    }
    if let Some(ticks) = args.ticks {
        settings.ticks = ticks;
    }
    if let Some(jitter) = resolve_jitter(args.jitter, args.seed) {
        settings.jitter = jitter;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }

    validate_settings(&settings)?;
    Ok(settings)
}

pub fn validate_settings(settings: &SimSettings) -> Result<()> {
    if settings.base_users == 0 {
        return Err(Error::BaseUsersZero);
    }
    if settings.tick_rate_ms == 0 {
        return Err(Error::InvalidTickRate(settings.tick_rate_ms));
    }
    if settings.ticks == 0 {
        return Err(Error::TicksZero);
    }
    MultiplierStep::new(settings.multiplier)?;
    if settings.jitter == JitterConfig::Seeded && settings.seed.is_none() {
        return Err(Error::InvalidJitterSeed);
    }
    if let Some(entries) = &settings.bottlenecks {
        BottleneckCatalog::new(entries.clone())?;
    }
    Ok(())
}

pub fn load_catalog(path: Option<&Path>) -> Result<BottleneckCatalog> {
    let entries = match path {
        Some(path) => load_config(path)?.bottlenecks,
        None => None,
    };
    match entries {
        Some(entries) => BottleneckCatalog::new(entries),
        None => Ok(BottleneckCatalog::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn write_temp_config(contents: &str, extension: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be available")
            .as_nanos();
        path.push(format!("scale-sim-unit-{}.{}", nanos, extension));
        fs::write(&path, contents).expect("config write should succeed");
        path
    }

    #[test]
    fn toml_config_loads_custom_catalog() {
        let path = write_temp_config(
            r#"
multiplier = 50
tick_rate_ms = 250

[[bottlenecks]]
id = "queue"
name = "Queue Saturation"
description = "Workers fall behind."
severity = "high"
triggers_at = 300
solution = "Add workers."
"#,
            "toml",
        );
        let settings = load_config(&path).unwrap();
        assert_eq!(settings.multiplier, 50);
        assert_eq!(settings.tick_rate_ms, 250);
        let catalog = load_catalog(Some(&path)).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].triggers_at, 300);
        fs::remove_file(path).ok();
    }

    #[test]
    fn json_config_loads() {
        let path = write_temp_config(r#"{ "base_users": 20, "jitter": "zero" }"#, "json");
        let settings = load_config(&path).unwrap();
        assert_eq!(settings.base_users, 20);
        assert_eq!(settings.jitter, JitterConfig::Zero);
        fs::remove_file(path).ok();
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let path = write_temp_config("multiplier = 1", "yaml");
        let err = load_config(&path).unwrap_err();
        assert_eq!(err.to_string(), "unsupported config format 'yaml'");
        fs::remove_file(path).ok();
    }

    #[test]
    fn flags_override_file_values() {
        let path = write_temp_config("multiplier = 50\nticks = 3\n", "toml");
        let args = SimArgs {
            config: Some(path.clone()),
            multiplier: Some(250),
            seed: Some(9),
            ..SimArgs::default()
        };
        let settings = build_settings(&args).unwrap();
        assert_eq!(settings.multiplier, 250);
        assert_eq!(settings.ticks, 3);
        assert_eq!(settings.jitter, JitterConfig::Seeded);
        assert_eq!(settings.seed, Some(9));
        fs::remove_file(path).ok();
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases = [
            (
                SimSettings {
                    base_users: 0,
                    ..SimSettings::default()
                },
                "base users must be greater than 0",
            ),
            (
                SimSettings {
                    tick_rate_ms: 0,
                    ..SimSettings::default()
                },
                "tick rate must be > 0 (got 0ms)",
            ),
            (
                SimSettings {
                    ticks: 0,
                    ..SimSettings::default()
                },
                "ticks must be greater than 0",
            ),
            (
                SimSettings {
                    jitter: JitterConfig::Seeded,
                    ..SimSettings::default()
                },
                "jitter seed required when jitter is seeded",
            ),
            (
                SimSettings {
                    bottlenecks: Some(Vec::new()),
                    ..SimSettings::default()
                },
                "bottleneck catalog must not be empty",
            ),
        ];
        for (settings, message) in cases {
            let err = validate_settings(&settings).unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }
}
