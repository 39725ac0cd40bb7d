//! INI file configuration adapter.

use crate::domain::error::GbceError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

/// Every `[section] key` the engine reads.
pub const KNOWN_KEYS: &[(&str, &str)] = &[
    ("cache", "ttl_ms"),
    ("cache", "sweep_interval_ms"),
    ("catalog", "capacity"),
    ("catalog", "instruments_file"),
    ("index", "scope"),
    ("logging", "level"),
    ("logging", "ansi"),
];

pub struct FileConfigAdapter {
    config: Ini,
    origin: String,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GbceError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| GbceError::ConfigParse {
            file: origin.clone(),
            reason,
        })?;
        Ok(Self { config, origin })
    }

    pub fn from_string(content: &str) -> Result<Self, GbceError> {
        let origin = "<inline>".to_string();
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| GbceError::ConfigParse {
                file: origin.clone(),
                reason,
            })?;
        Ok(Self { config, origin })
    }

    /// An adapter with no sections; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self {
            config: Ini::new(),
            origin: "<defaults>".to_string(),
        }
    }

    /// Where the settings came from: a file path, `<inline>` or `<defaults>`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `section.key` names present in the file that the engine never reads,
    /// sorted. Usually a typo.
    pub fn unknown_keys(&self) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .config
            .get_map_ref()
            .iter()
            .flat_map(|(section, keys)| {
                keys.keys()
                    .filter(move |key| !is_known(section, key))
                    .map(move |key| format!("{section}.{key}"))
            })
            .collect();
        unknown.sort();
        unknown
    }
}

fn is_known(section: &str, key: &str) -> bool {
    KNOWN_KEYS.iter().any(|&(s, k)| s == section && k == key)
}

impl ConfigPort for FileConfigAdapter {
    /// Trimmed value; a key set to nothing counts as absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// `ansi = on` reads the same as `ansi = true`.
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get_string(section, key).map(|v| v.to_lowercase()).as_deref() {
            Some("true" | "yes" | "on" | "1") => true,
            Some("false" | "no" | "off" | "0") => false,
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn reads_every_engine_key() {
        let adapter = FileConfigAdapter::from_string(
            r#"
[cache]
ttl_ms = 2000
sweep_interval_ms = 250

[catalog]
capacity = 5
instruments_file = /data/instruments.csv

[index]
scope = recent

[logging]
level = debug
ansi = off
"#,
        )
        .unwrap();
        assert_eq!(adapter.get_int("cache", "ttl_ms", 0), 2000);
        assert_eq!(adapter.get_int("cache", "sweep_interval_ms", 0), 250);
        assert_eq!(
            adapter.get_string("catalog", "instruments_file"),
            Some("/data/instruments.csv".to_string())
        );
        assert_eq!(adapter.get_string("index", "scope"), Some("recent".to_string()));
        assert!(!adapter.get_bool("logging", "ansi", true));
        assert!(adapter.unknown_keys().is_empty());
    }

    #[test]
    fn blank_value_counts_as_absent() {
        let adapter =
            FileConfigAdapter::from_string("[catalog]\ninstruments_file =   \n").unwrap();
        assert_eq!(adapter.get_string("catalog", "instruments_file"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_falls_back_on_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[cache]\nttl_ms = soon\n").unwrap();
        assert_eq!(adapter.get_int("cache", "ttl_ms", 42), 42);
        assert_eq!(adapter.get_int("cache", "sweep_interval_ms", 7), 7);
    }

    #[test]
    fn ansi_accepts_switch_spellings() {
        for (raw, expected) in [("on", true), ("YES", true), ("off", false), ("0", false)] {
            let adapter =
                FileConfigAdapter::from_string(&format!("[logging]\nansi = {raw}\n")).unwrap();
            assert_eq!(adapter.get_bool("logging", "ansi", !expected), expected, "{raw}");
        }
        let adapter = FileConfigAdapter::from_string("[logging]\nansi = colourful\n").unwrap();
        assert!(adapter.get_bool("logging", "ansi", true));
    }

    #[test]
    fn misspelled_keys_are_reported() {
        let adapter = FileConfigAdapter::from_string(
            "[cache]\nttl = 100\nttl_ms = 100\n[index]\nscope = ledger\n[pricing]\nmode = fast\n",
        )
        .unwrap();
        assert_eq!(adapter.unknown_keys(), vec!["cache.ttl", "pricing.mode"]);
    }

    #[test]
    fn empty_adapter_uses_defaults() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.origin(), "<defaults>");
        assert_eq!(adapter.get_string("cache", "ttl_ms"), None);
        assert_eq!(adapter.get_int("cache", "ttl_ms", 7), 7);
        assert!(adapter.unknown_keys().is_empty());
    }

    #[test]
    fn from_file_records_its_origin() {
        let file = create_temp_config("[index]\nscope = recent\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.origin(), file.path().display().to_string());
        assert_eq!(adapter.get_string("index", "scope"), Some("recent".to_string()));
    }

    #[test]
    fn missing_file_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/gbce.ini");
        match result {
            Err(GbceError::ConfigParse { file, .. }) => {
                assert_eq!(file, "/nonexistent/path/gbce.ini")
            }
            _ => panic!("expected ConfigParse"),
        }
    }
}
