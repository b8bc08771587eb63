use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed yaml configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration lists no branches")]
    NoBranches,

    #[error("configuration lists no particle types")]
    NoParticleTypes,

    #[error("configuration has nr_halos = 0")]
    NoHalos,

    #[error("{kind} name {name:?} is not a safe path segment")]
    UnsafeName { kind: &'static str, name: String },

    #[error("particle type {0:?} is listed twice")]
    DuplicateParticleType(String),
}

/// Branch and particle-type names end up as path segments and control ids.
static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.+-]*$").expect("static regex"));

#[derive(Clone, Debug, Deserialize, Serialize)]
struct Document {
    snap_nr: u32,
    nr_halos: u32,
    branches: Map<String, Value>,
    ptypes: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Describes the rendered images available for browsing. Immutable once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    pub snap_nr: u32,
    pub nr_halos: u32,
    branches: Map<String, Value>,
    ptypes: Vec<String>,
    extra: Map<String, Value>,
}

impl Configuration {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let doc: Document = serde_json::from_str(text)?;
        Self::validate(doc)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let doc: Document = serde_yaml::from_str(text)?;
        Self::validate(doc)
    }

    /// Reads a configuration file; `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if is_yaml(path) {
            Self::from_yaml(&text)
        } else {
            Self::from_json(&text)
        }
    }

    fn validate(doc: Document) -> Result<Self, ConfigError> {
        if doc.branches.is_empty() {
            return Err(ConfigError::NoBranches);
        }
        if doc.ptypes.is_empty() {
            return Err(ConfigError::NoParticleTypes);
        }
        if doc.nr_halos == 0 {
            return Err(ConfigError::NoHalos);
        }
        for name in doc.branches.keys() {
            check_segment("branch", name)?;
        }
        for (i, name) in doc.ptypes.iter().enumerate() {
            check_segment("particle type", name)?;
            if doc.ptypes[..i].contains(name) {
                return Err(ConfigError::DuplicateParticleType(name.clone()));
            }
        }

        Ok(Configuration {
            snap_nr: doc.snap_nr,
            nr_halos: doc.nr_halos,
            branches: doc.branches,
            ptypes: doc.ptypes,
            extra: doc.extra,
        })
    }

    /// Branch names in document order.
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    pub fn ptypes(&self) -> &[String] {
        &self.ptypes
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn out_dir(&self) -> Option<PathBuf> {
        self.extra("out_dir").and_then(Value::as_str).map(PathBuf::from)
    }

    /// Pretty JSON carrying every key of the source document.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        let doc = Document {
            snap_nr: self.snap_nr,
            nr_halos: self.nr_halos,
            branches: self.branches.clone(),
            ptypes: self.ptypes.clone(),
            extra: self.extra.clone(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

fn check_segment(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if SEGMENT_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::UnsafeName {
            kind,
            name: name.to_string(),
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Where the page controller gets its configuration from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Url(String),
}

impl ConfigSource {
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            ConfigSource::Url(value.to_string())
        } else {
            ConfigSource::File(PathBuf::from(value))
        }
    }

    pub async fn load(&self) -> Result<Configuration, ConfigError> {
        info!("loading configuration from {self}");
        let config = match self {
            ConfigSource::File(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                if is_yaml(path) {
                    Configuration::from_yaml(&text)?
                } else {
                    Configuration::from_json(&text)?
                }
            }
            ConfigSource::Url(url) => {
                let fetch = |source: reqwest::Error| ConfigError::Fetch {
                    url: url.clone(),
                    source,
                };
                let text = reqwest::get(url)
                    .await
                    .map_err(fetch)?
                    .error_for_status()
                    .map_err(fetch)?
                    .text()
                    .await
                    .map_err(fetch)?;
                Configuration::from_json(&text)?
            }
        };
        debug!(
            snap_nr = config.snap_nr,
            nr_halos = config.nr_halos,
            branches = config.branches.len(),
            ptypes = config.ptypes.len(),
            "configuration loaded"
        );
        Ok(config)
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Url(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"snap_nr":7,"nr_halos":3,"branches":{"default":{},"alt":{}},"ptypes":["stars","dark_matter"]}"#;

    #[test]
    fn branch_order_follows_document() {
        let config = Configuration::from_json(
            r#"{"snap_nr":1,"nr_halos":1,"branches":{"zeta":{},"alpha":{},"mid":{}},"ptypes":["stars"]}"#,
        )
        .unwrap();
        let names: Vec<&str> = config.branch_names().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn sample_document_parses() {
        let config = Configuration::from_json(SAMPLE).unwrap();
        assert_eq!(config.snap_nr, 7);
        assert_eq!(config.nr_halos, 3);
        assert_eq!(config.ptypes(), ["stars", "dark_matter"]);
        let names: Vec<&str> = config.branch_names().collect();
        assert_eq!(names, ["default", "alt"]);
    }

    #[test]
    fn missing_keys_are_malformed() {
        let err = Configuration::from_json(r#"{"snap_nr":7,"branches":{},"ptypes":[]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("nr_halos"));
    }

    #[test]
    fn empty_collections_are_rejected() {
        let err = Configuration::from_json(r#"{"snap_nr":7,"nr_halos":3,"branches":{},"ptypes":["stars"]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoBranches));

        let err = Configuration::from_json(r#"{"snap_nr":7,"nr_halos":3,"branches":{"a":{}},"ptypes":[]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoParticleTypes));

        let err = Configuration::from_json(r#"{"snap_nr":7,"nr_halos":0,"branches":{"a":{}},"ptypes":["stars"]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoHalos));
    }

    #[test]
    fn path_escaping_names_are_rejected() {
        let err = Configuration::from_json(
            r#"{"snap_nr":7,"nr_halos":3,"branches":{"../etc":{}},"ptypes":["stars"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsafeName { kind: "branch", .. }));

        let err = Configuration::from_json(
            r#"{"snap_nr":7,"nr_halos":3,"branches":{"a":{}},"ptypes":["dark matter"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsafeName { kind: "particle type", .. }));
    }

    #[test]
    fn duplicate_ptypes_are_rejected() {
        let err = Configuration::from_json(
            r#"{"snap_nr":7,"nr_halos":3,"branches":{"a":{}},"ptypes":["stars","stars"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateParticleType(name) if name == "stars"));
    }

    #[test]
    fn yaml_run_config_keeps_extra_keys() {
        let yaml = "\
out_dir: /data/web
snap_nr: 123
nr_halos: 10
branches:
  default:
    path: /runs/default
  reassign_gas_multi_fixed:
    path: /runs/reassign
ptypes:
  - stars
  - dark_matter
";
        let config = Configuration::from_yaml(yaml).unwrap();
        assert_eq!(config.out_dir(), Some(PathBuf::from("/data/web")));
        let names: Vec<&str> = config.branch_names().collect();
        assert_eq!(names, ["default", "reassign_gas_multi_fixed"]);

        let json = config.to_json_pretty().unwrap();
        let reparsed = Configuration::from_json(&json).unwrap();
        assert_eq!(reparsed, config);
        assert!(json.contains("\"out_dir\""));
        assert!(json.contains("/runs/reassign"));
    }

    #[test]
    fn source_parse_distinguishes_urls() {
        assert_eq!(
            ConfigSource::parse("https://example.org/params.json"),
            ConfigSource::Url("https://example.org/params.json".to_string())
        );
        assert_eq!(
            ConfigSource::parse("params.json"),
            ConfigSource::File(PathBuf::from("params.json"))
        );
    }

    #[tokio::test]
    async fn load_reads_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, SAMPLE).unwrap();
        let config = ConfigSource::File(path).load().await.unwrap();
        assert_eq!(config.nr_halos, 3);
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigSource::File(dir.path().join("nope.json"))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
