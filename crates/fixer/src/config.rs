use std::{fs, path::Path};

use anyhow::{Context as _, Result, anyhow};
use fixer_core::{DEFAULT_NAME_SUFFIX, FixSettings, TieBreak};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct FixerConfig {
    pub(crate) matrix: MatrixConfig,
    #[serde(default)]
    pub(crate) fixer: RoomSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct MatrixConfig {
    /// Full URL of the homeserver to contact, e.g. `https://matrix.org/`.
    pub(crate) homeserver_url: String,
    /// Server name used in user and room IDs, e.g. `matrix.org`.
    pub(crate) server_name: String,
    /// Localpart of the operating account's Matrix ID.
    pub(crate) localpart: String,
    pub(crate) access_token: String,
    /// Device the access token belongs to.
    #[serde(default)]
    pub(crate) device_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct RoomSettings {
    #[serde(default = "default_name_suffix")]
    pub(crate) name_suffix: String,
    #[serde(default)]
    pub(crate) strict_room_id_validation: bool,
    #[serde(default)]
    pub(crate) tie_break: TieBreak,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            name_suffix: default_name_suffix(),
            strict_room_id_validation: false,
            tie_break: TieBreak::default(),
        }
    }
}

impl RoomSettings {
    pub(crate) fn fix_settings(&self) -> FixSettings {
        FixSettings {
            name_suffix: self.name_suffix.clone(),
            tie_break: self.tie_break,
        }
    }
}

fn default_name_suffix() -> String {
    DEFAULT_NAME_SUFFIX.to_owned()
}

pub(crate) fn load_config(path: &Path) -> Result<FixerConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "config file not found at {}. Create one or set --config",
            path.display()
        ));
    }
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    let cfg: FixerConfig = serde_yaml::from_str(&yaml).context("parsing YAML config")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let file = write_config(
            "matrix:\n  homeserver_url: https://matrix.example.org\n  server_name: example.org\n  localpart: alice\n  access_token: syt_secret\n",
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.matrix.server_name, "example.org");
        assert_eq!(cfg.matrix.localpart, "alice");
        assert!(cfg.matrix.device_id.is_none());
        assert_eq!(cfg.fixer.name_suffix, "(Facebook)");
        assert!(!cfg.fixer.strict_room_id_validation);
        assert_eq!(cfg.fixer.tie_break, TieBreak::LastWins);
    }

    #[test]
    fn fixer_section_overrides_defaults() {
        let file = write_config(
            r#"
matrix:
  homeserver_url: https://matrix.example.org
  server_name: example.org
  localpart: alice
  access_token: syt_secret
  device_id: ABCDEFGH
fixer:
  name_suffix: "[Messenger]"
  strict_room_id_validation: true
  tie_break: reject_ambiguous
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.matrix.device_id.as_deref(), Some("ABCDEFGH"));
        let settings = cfg.fixer.fix_settings();
        assert_eq!(settings.name_suffix, "[Messenger]");
        assert_eq!(settings.tie_break, TieBreak::RejectAmbiguous);
        assert!(cfg.fixer.strict_room_id_validation);
    }

    #[test]
    fn missing_file_points_at_the_flag() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("config.yaml")).unwrap_err();
        assert!(err.to_string().contains("--config"));
    }

    #[test]
    fn missing_access_token_is_rejected() {
        let file = write_config(
            "matrix:\n  homeserver_url: https://matrix.example.org\n  server_name: example.org\n  localpart: alice\n",
        );
        assert!(load_config(file.path()).is_err());
    }
}
