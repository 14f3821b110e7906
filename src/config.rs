use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ini::{Ini, ParseOption, Properties};

pub const DEFAULT_RESOLUTION: &str = "1024x768";
pub const DEFAULT_POSITION: &str = "auto";
pub const DEFAULT_SCALE: &str = "1";

const SECTION: &str = "Settings";
// Keys here apply to every section, as long as that section exists.
const DEFAULT_SECTION: &str = "DEFAULT";

/// Output mode for the headless screen. Values are passed to Hyprland as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub resolution: String,
    pub position: String,
    pub scale: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION.into(),
            position: DEFAULT_POSITION.into(),
            scale: DEFAULT_SCALE.into(),
        }
    }
}

impl Settings {
    /// Reads `[Settings]` from INI text, values untouched apart from trimming.
    /// A key missing from `[Settings]` is taken from `[DEFAULT]`, then from the
    /// built-in defaults. Without a `[Settings]` section everything is default.
    pub fn from_ini(contents: &str) -> Result<Self> {
        let ini = Ini::load_from_str_opt(
            contents,
            ParseOption {
                enabled_quote: false,
                enabled_escape: false,
                ..Default::default()
            },
        )?;
        let section = ini.section(Some(SECTION));
        let fallback = ini.section(Some(DEFAULT_SECTION));
        // Key names match case-insensitively; the section name does not.
        let find = |props: &Properties, key: &str| {
            props
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.to_owned())
        };
        let lookup = |key: &str, default: &str| {
            section
                .and_then(|props| {
                    find(props, key).or_else(|| fallback.and_then(|props| find(props, key)))
                })
                .unwrap_or_else(|| default.to_owned())
        };

        Ok(Self {
            resolution: lookup("resolution", DEFAULT_RESOLUTION),
            position: lookup("position", DEFAULT_POSITION),
            scale: lookup("scale", DEFAULT_SCALE),
        })
    }
}

/// `~/.config/virtual-screen/config.ini`
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".config")
            .join("virtual-screen")
            .join("config.ini")
    })
}

/// Loads settings from `path`. A missing file means defaults; an unreadable or
/// malformed one is an error.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path.filter(|p| p.exists()) else {
        log::warn!("Config file not found or values not set. Using default values.");
        return Ok(Settings::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let settings = Settings::from_ini(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    log::debug!("Loaded {:?} from {}", settings, path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn all_keys_are_taken_verbatim() {
        let settings = Settings::from_ini(
            "[Settings]\nresolution = 2560x1440@120\nposition = 1920x0\nscale = 1.25\n",
        )
        .unwrap();
        assert_eq!(
            settings,
            Settings {
                resolution: "2560x1440@120".into(),
                position: "1920x0".into(),
                scale: "1.25".into(),
            }
        );
    }

    #[test]
    fn missing_keys_use_defaults() {
        let settings = Settings::from_ini("[Settings]\nscale = 2\n").unwrap();
        assert_eq!(settings.resolution, DEFAULT_RESOLUTION);
        assert_eq!(settings.position, DEFAULT_POSITION);
        assert_eq!(settings.scale, "2");
    }

    #[test]
    fn missing_section_uses_defaults() {
        let settings = Settings::from_ini("[Other]\nresolution = 800x600\n").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn key_names_ignore_case() {
        let settings = Settings::from_ini("[Settings]\nResolution = 800x600\n").unwrap();
        assert_eq!(settings.resolution, "800x600");
    }

    #[test]
    fn backslashes_are_not_unescaped() {
        let settings = Settings::from_ini("[Settings]\nposition = a\\tb\n").unwrap();
        assert_eq!(settings.position, "a\\tb");
    }

    #[test]
    fn quoted_values_are_kept() {
        let settings = Settings::from_ini("[Settings]\nresolution = \"1920x1080\"\nposition = 'auto'\n")
            .unwrap();
        assert_eq!(settings.resolution, "\"1920x1080\"");
        assert_eq!(settings.position, "'auto'");
    }

    #[test]
    fn default_section_supplies_missing_keys() {
        let settings =
            Settings::from_ini("[DEFAULT]\nscale = 2\nposition = 0x0\n[Settings]\nposition = 1920x0\n")
                .unwrap();
        assert_eq!(settings.scale, "2");
        assert_eq!(settings.position, "1920x0");
        assert_eq!(settings.resolution, DEFAULT_RESOLUTION);
    }

    #[test]
    fn default_section_alone_is_ignored() {
        let settings = Settings::from_ini("[DEFAULT]\nscale = 2\n").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file.
        let err = load(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load(Some(dir.path().join("config.ini").as_path())).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(load(None).unwrap(), Settings::default());
    }

    #[test]
    fn file_on_disk_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[Settings]\nresolution = 1920x1080").unwrap();
        let settings = load(Some(file.path())).unwrap();
        assert_eq!(settings.resolution, "1920x1080");
        assert_eq!(settings.scale, DEFAULT_SCALE);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[Settings\nresolution = 1920x1080").unwrap();
        let err = load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
