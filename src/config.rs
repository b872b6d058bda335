use std::{
    collections::{BTreeMap, HashMap},
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::model::{Protocol, SourceTemplate, Sources};

const DEFAULT_DIRECTORY: &str = ".repodex";
const DEFAULT_SOURCE: (&str, &str) = ("github", "git@github.com:");

pub struct RepodexConfig {
    pub clone_root: PathBuf,
    pub default_protocol: Protocol,
    pub sources: Sources,
    pub index_path: PathBuf,
    pub go_path: PathBuf,
}

impl RepodexConfig {
    /// Loads `file` (default `~/.repodex/config.toml`, optional) overlaid
    /// with `REPODEX_*` environment variables.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let home = home::home_dir()
            .context("Could not find home dir. Please define $HOME env variable.")?;
        let file = file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| home.join(DEFAULT_DIRECTORY).join("config.toml"));

        let raw_config = RawConfig::load(Some(&file), None)
            .with_context(|| format!("Could not load configuration from {}", file.display()))?;

        Ok(Self::from_raw(raw_config, &home, env::var_os("GOPATH").map(PathBuf::from)))
    }

    fn from_raw(raw_config: RawConfig, home: &Path, gopath: Option<PathBuf>) -> Self {
        let sources = if raw_config.clone.sources.is_empty() {
            Sources::from([(
                DEFAULT_SOURCE.0.to_owned(),
                SourceTemplate::from(DEFAULT_SOURCE.1),
            )])
        } else {
            raw_config
                .clone
                .sources
                .into_iter()
                .map(|(name, template)| (name, SourceTemplate::new(template)))
                .collect()
        };

        Self {
            clone_root: raw_config.clone.root.unwrap_or_else(|| home.join("src")),
            default_protocol: raw_config.clone.protocol.unwrap_or(Protocol::Ssh),
            sources,
            index_path: raw_config
                .index
                .path
                .unwrap_or_else(|| home.join(DEFAULT_DIRECTORY).join("index.toml")),
            go_path: raw_config
                .go
                .path
                .or(gopath)
                .unwrap_or_else(|| home.join("go")),
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    clone: CloneConfig,
    #[serde(default)]
    index: IndexConfig,
    #[serde(default)]
    go: GoConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct CloneConfig {
    root: Option<PathBuf>,
    protocol: Option<Protocol>,
    #[serde(default)]
    sources: BTreeMap<String, String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct IndexConfig {
    path: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct GoConfig {
    path: Option<PathBuf>,
}

impl RawConfig {
    fn load(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("REPODEX")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
