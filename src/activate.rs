use crate::config::Config;
use crate::error::{GvmError, Result};
use crate::install::LOCK_FILE;
use crate::store::VersionStore;
use crate::version::Version;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

/// Switches the active version by rewriting symlinks in the toolchain root
/// and the managed bin directory.
///
/// Each filename is replaced with a fresh symlink in one step, but the
/// filenames are updated sequentially, not as one transaction: a crash
/// mid-activation can leave links pointing at a mix of the old and new
/// version. The next successful activation repairs this.
pub struct Activator {
    config: Config,
}

impl Activator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn activate(&self, version: &Version) -> Result<()> {
        let store = VersionStore::new(self.config.clone());
        let version_dir = store.version_dir(version);

        if !version_dir.is_dir() {
            return Err(GvmError::NotInstalled(version.to_string()));
        }
        if version_dir.join(LOCK_FILE).exists() {
            return Err(GvmError::CorruptInstall(version.to_string()));
        }

        tracing::debug!(version = %version, "activating");

        fs::create_dir_all(&self.config.goroot)?;
        fs::create_dir_all(&self.config.bin_dir)?;

        // Link every top-level entry of the version directory into GOROOT.
        for entry in fs::read_dir(&version_dir)? {
            let entry = entry?;
            let link = self.config.goroot.join(entry.file_name());
            replace_with_symlink(&entry.path(), &link)?;
        }

        // Expose the version's executables on PATH via GOPATH/bin.
        let bin_dir = version_dir.join("bin");
        if bin_dir.is_dir() {
            for entry in fs::read_dir(&bin_dir)? {
                let entry = entry?;
                if !is_executable(&entry.path()) {
                    continue;
                }
                let link = self.config.bin_dir.join(entry.file_name());
                replace_with_symlink(&entry.path(), &link)?;
            }
        }

        Ok(())
    }
}

/// Replace whatever sits at `link` with a symlink to `target`. An existing
/// symlink is unlinked; a real file or directory (a pre-gvm legacy install)
/// is deleted so non-symlink installs migrate transparently.
fn replace_with_symlink(target: &Path, link: &Path) -> Result<()> {
    if link.is_symlink() {
        fs::remove_file(link)?;
    } else if link.is_dir() {
        fs::remove_dir_all(link)?;
    } else if link.exists() {
        fs::remove_file(link)?;
    }

    symlink(target, link)?;
    Ok(())
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Config) {
        let root = TempDir::new().unwrap();
        let config = Config {
            goroot: root.path().join("go"),
            gopath: root.path().join("gopath"),
            versions_dir: root.path().join("go").join(".versions"),
            bin_dir: root.path().join("gopath").join("bin"),
            ..Config::default()
        };
        (root, config)
    }

    fn install_fixture_version(config: &Config, version: &str) {
        let dir = config.version_dir(version);
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("VERSION"), format!("go{version}")).unwrap();

        let binary = dir.join("bin").join("go");
        fs::write(&binary, format!("go binary {version}")).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_activate_links_root_and_bin() {
        let (_root, config) = fixture();
        install_fixture_version(&config, "1.21.3");

        let version: Version = "1.21.3".parse().unwrap();
        Activator::new(config.clone()).activate(&version).unwrap();

        let goroot_bin = config.goroot.join("bin");
        assert!(goroot_bin.is_symlink());
        assert_eq!(
            fs::read_link(&goroot_bin).unwrap(),
            config.version_dir("1.21.3").join("bin")
        );

        let managed_go = config.bin_dir.join("go");
        assert!(managed_go.is_symlink());
        assert_eq!(
            fs::read_to_string(&managed_go).unwrap(),
            "go binary 1.21.3"
        );
    }

    #[test]
    fn test_activate_switches_between_versions() {
        let (_root, config) = fixture();
        install_fixture_version(&config, "1.21.3");
        install_fixture_version(&config, "1.22.0");

        let activator = Activator::new(config.clone());
        activator.activate(&"1.21.3".parse().unwrap()).unwrap();
        activator.activate(&"1.22.0".parse().unwrap()).unwrap();

        assert_eq!(
            fs::read_to_string(config.goroot.join("VERSION")).unwrap(),
            "go1.22.0"
        );
        assert_eq!(
            fs::read_to_string(config.bin_dir.join("go")).unwrap(),
            "go binary 1.22.0"
        );
    }

    #[test]
    fn test_activate_replaces_legacy_install() {
        let (_root, config) = fixture();
        install_fixture_version(&config, "1.21.3");

        // A pre-gvm installation: real directories and files in GOROOT.
        fs::create_dir_all(config.goroot.join("bin")).unwrap();
        fs::write(config.goroot.join("bin").join("go"), b"legacy").unwrap();
        fs::write(config.goroot.join("VERSION"), b"go1.4").unwrap();

        Activator::new(config.clone())
            .activate(&"1.21.3".parse().unwrap())
            .unwrap();

        assert!(config.goroot.join("bin").is_symlink());
        assert!(config.goroot.join("VERSION").is_symlink());
        assert_eq!(
            fs::read_to_string(config.goroot.join("VERSION")).unwrap(),
            "go1.21.3"
        );
    }

    #[test]
    fn test_activate_missing_version() {
        let (_root, config) = fixture();
        let err = Activator::new(config)
            .activate(&"1.21.3".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, GvmError::NotInstalled(_)));
    }

    #[test]
    fn test_activate_refuses_locked_version() {
        let (_root, config) = fixture();
        install_fixture_version(&config, "1.21.3");
        // Looks complete, but the interrupted-install marker is present.
        fs::write(config.version_dir("1.21.3").join(LOCK_FILE), b"").unwrap();

        let err = Activator::new(config.clone())
            .activate(&"1.21.3".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, GvmError::CorruptInstall(_)));
        assert!(!config.goroot.join("bin").exists(), "no partial activation");
    }
}
