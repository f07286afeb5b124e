// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line flags, the optional TOML config file, and their merge.
//!
//! Precedence: flag, then file, then built-in default.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ap_adapters::{
    DownloadError, Downloader, HttpAuth, HttpDownloader, LocatorDownloader, ObjectLocation,
    ObjectStoreDownloader, S3ObjectStore,
};
use ap_core::{EnvironmentSpec, ErrorKind};
use ap_engine::{PipelineConfig, Schedule, ScheduleError};
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::env;

const DEFAULT_LISTEN: &str = "0.0.0.0:31836";
const DEFAULT_PROTO: &str = "https";
const DEFAULT_CACHE_FILE: &str = "/tmp/ansible-puller.tgz";
const DEFAULT_LOG_DIR: &str = "/var/log/ansible-puller";
const DEFAULT_PLAYBOOK: &str = "site.yml";
const DEFAULT_PYTHON: &str = "/usr/bin/python3";
const DEFAULT_REQUIREMENTS: &str = "requirements.txt";
const DEFAULT_SLEEP_MINUTES: u64 = 30;

/// Pull an Ansible bundle on a schedule and apply it to this host.
#[derive(Parser, Debug, Default)]
#[command(name = "ansible-puller", version, about, long_about = None)]
pub struct Args {
    /// Config file (default: first ansible-puller.toml in /etc/ansible-puller, ~/.ansible-puller, .)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Control surface bind address
    #[arg(long)]
    pub http_listen_string: Option<String>,

    /// Scheme for --http-url
    #[arg(long)]
    pub http_proto: Option<String>,

    /// Bundle URL without scheme
    #[arg(long)]
    pub http_url: Option<String>,

    #[arg(long)]
    pub http_user: Option<String>,

    #[arg(long)]
    pub http_pass: Option<String>,

    /// Extra request header name (e.g. an auth token header)
    #[arg(long)]
    pub http_header_name: Option<String>,

    #[arg(long)]
    pub http_header_value: Option<String>,

    /// Bundle object as s3://bucket/key
    #[arg(long)]
    pub s3_uri: Option<String>,

    /// Bundle object as an ARN
    #[arg(long)]
    pub s3_arn: Option<String>,

    #[arg(long)]
    pub s3_region: Option<String>,

    /// Object-store endpoint (default: https://s3.<region>.amazonaws.com)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Bundle as a generic locator (http(s)://, s3://, arn:, file:// or absolute path)
    #[arg(long)]
    pub locator: Option<String>,

    /// Checksum locator (default: bundle locator + .md5)
    #[arg(long)]
    pub checksum_locator: Option<String>,

    /// Local cache of the downloaded bundle
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Directory for playbook output logs
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Directory inside the bundle to run ansible from
    #[arg(long)]
    pub ansible_dir: Option<PathBuf>,

    /// Playbook, relative to --ansible-dir
    #[arg(long)]
    pub ansible_playbook: Option<String>,

    /// Inventories to search, comma-separated or repeated, relative to --ansible-dir
    #[arg(long, value_delimiter = ',')]
    pub ansible_inventory: Vec<String>,

    /// Relay playbook output to stdout/stderr while it runs
    #[arg(long)]
    pub ansible_stream_output: bool,

    /// Interpreter used to create the virtualenv
    #[arg(long)]
    pub venv_python: Option<PathBuf>,

    #[arg(long)]
    pub venv_path: Option<PathBuf>,

    /// Requirements file, relative to the bundle root
    #[arg(long)]
    pub venv_requirements_file: Option<PathBuf>,

    /// Minutes between runs
    #[arg(long)]
    pub sleep: Option<u64>,

    /// Maximum minutes of random jitter around --sleep
    #[arg(long)]
    pub sleep_jitter: Option<u64>,

    /// Start with runs disabled
    #[arg(long)]
    pub start_disabled: bool,

    /// Debug logging; keep run directories
    #[arg(long)]
    pub debug: bool,

    /// Run once and exit
    #[arg(long)]
    pub once: bool,

    /// Log filter (e.g. info, debug, ap_engine=trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write daemon logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Keys accepted in `ansible-puller.toml`; named like the flags.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub http_listen_string: Option<String>,
    pub http_proto: Option<String>,
    pub http_url: Option<String>,
    pub http_user: Option<String>,
    pub http_pass: Option<String>,
    pub http_header_name: Option<String>,
    pub http_header_value: Option<String>,
    pub s3_uri: Option<String>,
    pub s3_arn: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub locator: Option<String>,
    pub checksum_locator: Option<String>,
    pub cache_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub ansible_dir: Option<PathBuf>,
    pub ansible_playbook: Option<String>,
    pub ansible_inventory: Option<Vec<String>>,
    pub ansible_stream_output: Option<bool>,
    pub venv_python: Option<PathBuf>,
    pub venv_path: Option<PathBuf>,
    pub venv_requirements_file: Option<PathBuf>,
    pub sleep: Option<u64>,
    pub sleep_jitter: Option<u64>,
    pub start_disabled: Option<bool>,
    pub debug: Option<bool>,
    pub once: Option<bool>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config file {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("no bundle source configured; set one of http-url, s3-uri, s3-arn, locator")]
    NoSource,

    #[error("exactly one bundle source may be configured, got {}", .0.join(", "))]
    MultipleSources(Vec<&'static str>),

    #[error("invalid bundle locator: {0}")]
    Locator(DownloadError),

    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Where the bundle comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Http { url: String, auth: HttpAuth },
    ObjectStore { locator: String, region: Option<String>, endpoint: Option<String> },
    Locator { locator: String, region: Option<String>, endpoint: Option<String> },
}

impl Source {
    pub fn locator(&self) -> &str {
        match self {
            Source::Http { url, .. } => url,
            Source::ObjectStore { locator, .. } | Source::Locator { locator, .. } => locator,
        }
    }

    pub fn downloader(&self) -> Arc<dyn Downloader> {
        match self {
            Source::Http { auth, .. } => Arc::new(HttpDownloader::new(auth.clone())),
            Source::ObjectStore { region, endpoint, .. } => Arc::new(ObjectStoreDownloader::new(Arc::new(
                S3ObjectStore::new(region.as_deref(), endpoint.as_deref()),
            ))),
            Source::Locator { region, endpoint, .. } => {
                Arc::new(LocatorDownloader::with_defaults(region.as_deref(), endpoint.as_deref()))
            }
        }
    }
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub source: Source,
    pub checksum_locator: Option<String>,
    pub cache_file: PathBuf,
    pub log_dir: PathBuf,
    pub ansible_dir: PathBuf,
    pub playbook: String,
    pub inventories: Vec<PathBuf>,
    pub stream_output: bool,
    pub venv_python: PathBuf,
    pub venv_path: PathBuf,
    pub requirements: PathBuf,
    pub schedule: Schedule,
    pub start_disabled: bool,
    pub debug: bool,
    pub once: bool,
    /// Overrides the level implied by `debug`.
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    /// The file values were read from, if any.
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Read the config file (explicit or searched for) and merge it with `args`.
    pub fn load(args: Args) -> Result<Self, ConfigError> {
        let path = match &args.config {
            Some(path) => Some(path.clone()),
            None => find_config_file(&env::config_search_dirs()),
        };
        let file = match &path {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file, path)
    }

    pub fn resolve(args: Args, file: FileConfig, config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let source = resolve_source(&args, &file)?;

        let sleep = args.sleep.or(file.sleep).unwrap_or(DEFAULT_SLEEP_MINUTES);
        let jitter = args.sleep_jitter.or(file.sleep_jitter).unwrap_or(0);
        let schedule = Schedule::new(minutes(sleep), minutes(jitter))?;

        let inventories = if args.ansible_inventory.is_empty() {
            file.ansible_inventory.unwrap_or_default()
        } else {
            args.ansible_inventory
        };

        Ok(Self {
            listen: args.http_listen_string.or(file.http_listen_string).unwrap_or_else(|| DEFAULT_LISTEN.into()),
            source,
            checksum_locator: non_empty(args.checksum_locator).or(non_empty(file.checksum_locator)),
            cache_file: args.cache_file.or(file.cache_file).unwrap_or_else(|| DEFAULT_CACHE_FILE.into()),
            log_dir: args.log_dir.or(file.log_dir).unwrap_or_else(|| DEFAULT_LOG_DIR.into()),
            ansible_dir: args.ansible_dir.or(file.ansible_dir).unwrap_or_default(),
            playbook: args.ansible_playbook.or(file.ansible_playbook).unwrap_or_else(|| DEFAULT_PLAYBOOK.into()),
            inventories: inventories.into_iter().filter(|i| !i.is_empty()).map(PathBuf::from).collect(),
            stream_output: args.ansible_stream_output || file.ansible_stream_output.unwrap_or(false),
            venv_python: args.venv_python.or(file.venv_python).unwrap_or_else(|| DEFAULT_PYTHON.into()),
            venv_path: args.venv_path.or(file.venv_path).unwrap_or_else(env::default_venv_path),
            requirements: args
                .venv_requirements_file
                .or(file.venv_requirements_file)
                .unwrap_or_else(|| DEFAULT_REQUIREMENTS.into()),
            schedule,
            start_disabled: args.start_disabled || file.start_disabled.unwrap_or(false),
            debug: args.debug || file.debug.unwrap_or(false),
            once: args.once || file.once.unwrap_or(false),
            log_level: non_empty(args.log_level).or(non_empty(file.log_level)),
            log_file: args.log_file.or(file.log_file),
            config_file,
        })
    }

    pub fn environment(&self) -> EnvironmentSpec {
        EnvironmentSpec::new(&self.venv_path, &self.venv_python)
    }

    /// Pipeline settings for this host's identity candidates.
    pub fn pipeline(&self, candidates: Vec<String>) -> PipelineConfig {
        let mut pipeline = PipelineConfig::new(self.source.locator(), self.environment());
        pipeline.checksum_locator = self.checksum_locator.clone();
        pipeline.cache_file = self.cache_file.clone();
        pipeline.log_dir = self.log_dir.clone();
        pipeline.ansible_dir = self.ansible_dir.clone();
        pipeline.playbook = self.playbook.clone();
        pipeline.inventories = self.inventories.clone();
        pipeline.stream_output = self.stream_output;
        pipeline.requirements = self.requirements.clone();
        pipeline.candidates = candidates;
        pipeline.keep_run_dirs = self.debug;
        pipeline
    }
}

fn resolve_source(args: &Args, file: &FileConfig) -> Result<Source, ConfigError> {
    let pick = |flag: &Option<String>, value: &Option<String>| {
        non_empty(flag.clone()).or_else(|| non_empty(value.clone()))
    };
    let http_url = pick(&args.http_url, &file.http_url);
    let s3_uri = pick(&args.s3_uri, &file.s3_uri);
    let s3_arn = pick(&args.s3_arn, &file.s3_arn);
    let locator = pick(&args.locator, &file.locator);
    let region = pick(&args.s3_region, &file.s3_region);
    let endpoint = pick(&args.s3_endpoint, &file.s3_endpoint);

    let configured: Vec<&'static str> = [
        ("http-url", http_url.is_some()),
        ("s3-uri", s3_uri.is_some()),
        ("s3-arn", s3_arn.is_some()),
        ("locator", locator.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, set)| set.then_some(name))
    .collect();
    if configured.len() > 1 {
        return Err(ConfigError::MultipleSources(configured));
    }

    if let Some(url) = http_url {
        let proto = pick(&args.http_proto, &file.http_proto).unwrap_or_else(|| DEFAULT_PROTO.into());
        let field = |flag: &Option<String>, value: &Option<String>| pick(flag, value).unwrap_or_default();
        let auth = HttpAuth::from_parts(
            &field(&args.http_user, &file.http_user),
            &field(&args.http_pass, &file.http_pass),
            &field(&args.http_header_name, &file.http_header_name),
            &field(&args.http_header_value, &file.http_header_value),
        );
        return Ok(Source::Http { url: format!("{proto}://{url}"), auth });
    }
    if let Some(object) = s3_uri.or(s3_arn) {
        ObjectLocation::parse(&object).map_err(ConfigError::Locator)?;
        return Ok(Source::ObjectStore { locator: object, region, endpoint });
    }
    if let Some(locator) = locator {
        if locator.starts_with("s3://") || locator.starts_with("arn:") {
            ObjectLocation::parse(&locator).map_err(ConfigError::Locator)?;
        } else if !["http://", "https://", "file://", "/"].iter().any(|p| locator.starts_with(p)) {
            return Err(ConfigError::Locator(DownloadError::MalformedLocator(locator)));
        }
        return Ok(Source::Locator { locator, region, endpoint });
    }
    Err(ConfigError::NoSource)
}

/// First `ansible-puller.toml` found in `dirs`.
pub fn find_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().map(|dir| dir.join(env::CONFIG_FILE)).find(|path| path.is_file())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
