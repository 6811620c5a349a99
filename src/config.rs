use crate::error::{GvmError, Result};
use std::env;
use std::path::PathBuf;

/// Runtime configuration: the two required environment directories plus the
/// global CLI flags, threaded as one immutable value to every component.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Shared toolchain root (`GOROOT`); holds `.versions/` and the live
    /// symlinked installation.
    pub goroot: PathBuf,

    /// Workspace root (`GOPATH`); its `bin/` holds the managed executable
    /// symlinks and must already be on `PATH`.
    pub gopath: PathBuf,

    /// `<goroot>/.versions`
    pub versions_dir: PathBuf,

    /// `<gopath>/bin`
    pub bin_dir: PathBuf,

    pub quiet: bool,
    pub non_interactive: bool,
    pub include_unstable: bool,
    pub os_override: Option<String>,
    pub arch_override: Option<String>,
}

impl Config {
    /// Read the required environment variables, failing fatally when either
    /// is unset or `GOPATH/bin` is not a `PATH` member.
    pub fn load() -> Result<Self> {
        let goroot = required_dir("GOROOT")?;
        let gopath = required_dir("GOPATH")?;
        let bin_dir = gopath.join("bin");

        let path = env::var_os("PATH")
            .ok_or_else(|| GvmError::Config("PATH is not set".to_string()))?;
        if !env::split_paths(&path).any(|entry| entry == bin_dir) {
            return Err(GvmError::Config(format!(
                "{} must be on PATH for managed go binaries to resolve",
                bin_dir.display()
            )));
        }

        Ok(Self {
            versions_dir: goroot.join(".versions"),
            bin_dir,
            goroot,
            gopath,
            ..Self::default()
        })
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir.join(version)
    }
}

fn required_dir(name: &str) -> Result<PathBuf> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            Ok(PathBuf::from(shellexpand::tilde(value.trim()).to_string()))
        }
        _ => Err(GvmError::Config(format!(
            "{} must be set (see installation instructions)",
            name
        ))),
    }
}
