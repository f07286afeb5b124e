//! Shared fixtures for the end-to-end specs.
//!
//! A [`Puller`] owns a temp tree with a bundle "repository" served through
//! the local-file transport, a pre-provisioned environment whose `pip` and
//! `ansible-playbook` are shell scripts recording what they were asked to
//! do, and the cache/log locations a real run writes to.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use ap_core::{Checksum, EnvironmentSpec, ErrorKind, HostStats, RunState, RunStateHandle};
pub use ap_engine::{
    FakeTelemetry, PipelineConfig, RunCoordinator, RunOutcome, RunPipeline, TelemetryEvent, ERROR_LOG, OUTPUT_LOG,
};
pub use serial_test::serial;

use ap_adapters::LocatorDownloader;
use ap_shell::CommandExecutor;
use flate2::write::GzEncoder;
use flate2::Compression;

pub const HOST: &str = "node-1";

/// Recap the fake tool prints for a clean run on [`HOST`].
pub const CLEAN_RECAP: &str =
    r#"{"plays": [], "stats": {"node-1": {"changed": 2, "failures": 0, "ok": 7, "skipped": 1, "unreachable": 0}}}"#;

/// Files of a bundle, as `(path, contents)`.
pub struct Bundle {
    files: Vec<(String, String)>,
}

impl Bundle {
    /// `requirements.txt`, `ansible/site.yml`, and one inventory per `(name, hosts)`.
    pub fn new(inventories: &[(&str, &str)]) -> Self {
        let mut files = vec![
            ("requirements.txt".to_string(), "ansible-core\n".to_string()),
            ("ansible/site.yml".to_string(), "- hosts: all\n".to_string()),
        ];
        for (name, hosts) in inventories {
            files.push((format!("ansible/{name}"), hosts.to_string()));
        }
        Self { files }
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.retain(|(p, _)| p != path);
        self.files.push((path.to_string(), contents.to_string()));
        self
    }

    pub fn tgz(&self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, body) in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).unwrap();
            header.set_mode(0o644);
            header.set_size(body.len() as u64);
            header.set_cksum();
            builder.append(&header, body.as_bytes()).unwrap();
        }
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&builder.into_inner().unwrap()).unwrap();
        gz.finish().unwrap()
    }
}

pub fn script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

pub struct Puller {
    pub dir: tempfile::TempDir,
    pub config: PipelineConfig,
    pub telemetry: FakeTelemetry,
}

impl Puller {
    /// Tool prints `recap` and exits with `exit_code` when applying a play.
    pub fn new(recap: &str, exit_code: i32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["repo", "state", "logs"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        let state = dir.path().join("state");

        let venv = dir.path().join("venv");
        fs::create_dir_all(venv.join("bin")).unwrap();
        script(&venv.join("bin/pip"), &format!(r#"echo "$@" >> "{}/pip""#, state.display()));
        script(
            &venv.join("bin/ansible-playbook"),
            &format!(
                r#"if [ "$4" = "--list-hosts" ]; then echo "  hosts:"; sed 's/^/    /' "$3"; exit 0; fi
echo "$@" >> "{state}/runs"
cat "$1" > "{state}/playbook"
echo "TASK [apply]" >&2
echo '{recap}'
exit {exit_code}"#,
                state = state.display(),
            ),
        );

        let locator = dir.path().join("repo/site.tgz").display().to_string();
        let mut config = PipelineConfig::new(locator, EnvironmentSpec::new(&venv, "/usr/bin/python3"));
        config.cache_file = dir.path().join("cache/site.tgz");
        config.log_dir = dir.path().join("logs");
        config.ansible_dir = PathBuf::from("ansible");
        config.inventories = vec![PathBuf::from("hosts")];
        config.candidates = vec!["192.0.2.10".to_string(), HOST.to_string()];
        fs::create_dir_all(dir.path().join("cache")).unwrap();

        Self { dir, config, telemetry: FakeTelemetry::new() }
    }

    /// Place `bundle` and its `.md5` companion in the repository.
    pub fn publish(&self, bundle: &Bundle) -> Checksum {
        let body = bundle.tgz();
        let checksum = Checksum::of_bytes(&body);
        self.publish_raw(&body, Some(&checksum.to_string()));
        checksum
    }

    pub fn publish_raw(&self, body: &[u8], md5: Option<&str>) {
        let bundle = self.repo("site.tgz");
        fs::write(&bundle, body).unwrap();
        let companion = self.repo("site.tgz.md5");
        match md5 {
            Some(md5) => fs::write(companion, format!("{md5}  site.tgz\n")).unwrap(),
            None => {
                let _ = fs::remove_file(companion);
            }
        }
    }

    pub fn repo(&self, name: &str) -> PathBuf {
        self.dir.path().join("repo").join(name)
    }

    pub fn pipeline(&self) -> Arc<RunPipeline> {
        Arc::new(RunPipeline::new(
            self.config.clone(),
            Arc::new(LocatorDownloader::with_defaults(None, None)),
            CommandExecutor::new(),
            Arc::new(self.telemetry.clone()),
        ))
    }

    pub fn coordinator(&self) -> (RunCoordinator, RunStateHandle) {
        let (state, writer) = RunState::shared(None);
        (RunCoordinator::new(self.pipeline(), writer, Arc::new(self.telemetry.clone())), state)
    }

    /// Lines the tool appended for each applied play (`<playbook> -i <inv> -l <host> -c local`).
    pub fn runs(&self) -> Vec<String> {
        self.state("runs").map(|s| s.lines().map(str::to_string).collect()).unwrap_or_default()
    }

    pub fn state(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.dir.path().join("state").join(name)).ok()
    }

    pub fn log(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.config.log_dir.join(name)).ok()
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
