use crate::config::Config;
use crate::error::{GvmError, Result};
use crate::install::LOCK_FILE;
use crate::version::Version;
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// On-disk directory of installed versions. All queries re-derive their
/// answers from the filesystem; nothing is cached across calls.
pub struct VersionStore {
    config: Config,
}

impl VersionStore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn version_dir(&self, version: &Version) -> PathBuf {
        self.config.version_dir(&version.to_string())
    }

    /// Path to a version's main binary, whether or not it exists yet.
    pub fn binary_path(&self, version: &Version) -> PathBuf {
        self.version_dir(version).join("bin").join("go")
    }

    pub fn is_installed(&self, version: &Version) -> bool {
        self.version_dir(version).is_dir()
    }

    /// A lock marker means the install was interrupted mid-extraction.
    pub fn is_locked(&self, version: &Version) -> bool {
        self.version_dir(version).join(LOCK_FILE).exists()
    }

    /// Immediate subdirectories of the versions root, sorted with the
    /// numeric comparator. Entries that do not parse as versions are skipped.
    pub fn list_installed(&self) -> Result<Vec<Version>> {
        let mut installed = Vec::new();

        if !self.config.versions_dir.exists() {
            return Ok(installed);
        }

        for entry in fs::read_dir(&self.config.versions_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(version) = name.parse::<Version>() {
                    installed.push(version);
                }
            }
        }

        installed.sort();
        Ok(installed)
    }

    /// Derive the active version by resolving `go` on `PATH` and comparing
    /// its content hash against each installed version's binary. There is no
    /// persisted "current version" pointer to consult.
    pub fn current_version(&self) -> Result<Option<Version>> {
        match resolve_on_path("go") {
            Some(probe) => self.match_binary(&probe),
            None => Ok(None),
        }
    }

    fn match_binary(&self, probe: &Path) -> Result<Option<Version>> {
        let Some(probe_digest) = file_digest(probe) else {
            return Ok(None);
        };

        for version in self.list_installed()? {
            if let Some(digest) = file_digest(&self.binary_path(&version)) {
                if digest == probe_digest {
                    return Ok(Some(version));
                }
            }
        }
        Ok(None)
    }

    /// Adjacent entry in the sorted installed list, clamped at both
    /// boundaries. A selection that is no longer installed maps to the
    /// nearest end of the list.
    pub fn neighbor(&self, selected: &Version, direction: Direction) -> Result<Version> {
        let installed = self.list_installed()?;
        if installed.is_empty() {
            return Err(GvmError::NoVersions);
        }

        let index = match installed.binary_search(selected) {
            Ok(i) => match direction {
                Direction::Prev => i.saturating_sub(1),
                Direction::Next => (i + 1).min(installed.len() - 1),
            },
            Err(insertion) => match direction {
                Direction::Prev => insertion.saturating_sub(1),
                Direction::Next => insertion.min(installed.len() - 1),
            },
        };

        Ok(installed[index].clone())
    }

    /// Delete a Version Directory. The caller supplies the active version so
    /// one derivation covers a multi-version removal.
    pub fn remove(&self, version: &Version, active: Option<&Version>) -> Result<()> {
        if !self.is_installed(version) {
            return Err(GvmError::NotInstalled(version.to_string()));
        }
        if active == Some(version) {
            return Err(GvmError::RemoveActive(version.to_string()));
        }

        fs::remove_dir_all(self.version_dir(version))?;
        Ok(())
    }

    /// Remove every installed version except the active one, returning the
    /// versions that were deleted.
    pub fn prune(&self, active: &Version) -> Result<Vec<Version>> {
        let mut removed = Vec::new();
        for version in self.list_installed()? {
            if &version != active {
                fs::remove_dir_all(self.version_dir(&version))?;
                removed.push(version);
            }
        }
        Ok(removed)
    }
}

/// First executable named `name` among the `PATH` entries.
fn resolve_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable_file(candidate))
}

fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// SHA-256 of a file's contents; `None` when the file is unreadable.
fn file_digest(path: &Path) -> Option<[u8; 32]> {
    let mut file = fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Some(hasher.finalize().into())
}
