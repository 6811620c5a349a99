use crate::activate::Activator;
use crate::config::Config;
use crate::download::Downloader;
use crate::error::{GvmError, Result};
use crate::store::VersionStore;
use crate::version::Version;
use colored::*;
use flate2::read::GzDecoder;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Sentinel file marking an in-progress (or interrupted) install. While it
/// exists the directory's contents must be treated as incomplete.
pub const LOCK_FILE: &str = "gvm.lock";

const DOWNLOAD_BASE: &str = "https://dl.google.com/go";

pub struct Installer {
    config: Config,
    downloader: Downloader,
    base_url: String,
}

impl Installer {
    pub fn new(config: Config) -> Self {
        Self::with_base_url(config, DOWNLOAD_BASE)
    }

    pub fn with_base_url(config: Config, base_url: impl Into<String>) -> Self {
        let downloader = Downloader::new(config.quiet);
        Self {
            config,
            downloader,
            base_url: base_url.into(),
        }
    }

    /// Platform/architecture-specific archive URL, honoring the config
    /// overrides and otherwise detecting from the host environment.
    pub fn archive_url(&self, version: &Version) -> Result<String> {
        Ok(format!(
            "{}/go{}.{}-{}.tar.gz",
            self.base_url,
            version,
            self.go_os()?,
            self.go_arch()?
        ))
    }

    fn go_os(&self) -> Result<String> {
        if let Some(os) = &self.config.os_override {
            return Ok(os.clone());
        }
        match std::env::consts::OS {
            "linux" => Ok("linux".to_string()),
            "macos" => Ok("darwin".to_string()),
            "freebsd" => Ok("freebsd".to_string()),
            other => Err(GvmError::UnsupportedPlatform {
                os: other.to_string(),
                arch: std::env::consts::ARCH.to_string(),
            }),
        }
    }

    fn go_arch(&self) -> Result<String> {
        if let Some(arch) = &self.config.arch_override {
            return Ok(arch.clone());
        }
        match std::env::consts::ARCH {
            "x86" => Ok("386".to_string()),
            "x86_64" => Ok("amd64".to_string()),
            "arm" => Ok("armv6l".to_string()),
            "aarch64" => Ok("arm64".to_string()),
            // upstream only publishes little-endian ppc64 archives
            "powerpc64" => Ok("ppc64le".to_string()),
            "s390x" => Ok("s390x".to_string()),
            other => Err(GvmError::UnsupportedPlatform {
                os: std::env::consts::OS.to_string(),
                arch: other.to_string(),
            }),
        }
    }

    /// Download and extract a release into its Version Directory.
    ///
    /// Returns `false` without touching the network when the version is
    /// already installed. An interrupted previous install (lock marker
    /// present) is wiped and re-downloaded. Any failure between marker
    /// creation and removal leaves the marker in place.
    pub async fn download(&self, version: &Version) -> Result<bool> {
        let store = VersionStore::new(self.config.clone());
        let version_dir = store.version_dir(version);

        if store.is_installed(version) {
            if store.is_locked(version) {
                tracing::debug!(version = %version, "wiping interrupted install");
                fs::remove_dir_all(&version_dir)?;
            } else {
                return Ok(false);
            }
        }

        let url = self.archive_url(version)?;
        let response = self.downloader.get(&url).await?;
        if response.status().as_u16() >= 400 {
            return Err(GvmError::InvalidVersion(version.to_string()));
        }

        if !self.config.quiet {
            println!(
                "{} go {} ({}-{})",
                "Installing".green().bold(),
                version.to_string().cyan(),
                self.go_os()?.yellow(),
                self.go_arch()?.yellow()
            );
        }

        fs::create_dir_all(&version_dir)?;
        // The marker goes in first: everything until its removal is the
        // window of vulnerability a future activation must detect.
        fs::write(version_dir.join(LOCK_FILE), b"")?;

        let archive_path = version_dir.join("go.tar.gz");
        self.downloader
            .save_with_progress(response, &archive_path)
            .await?;

        extract_tar_gz(&archive_path, &version_dir)?;
        fs::remove_file(&archive_path)?;
        fs::remove_file(version_dir.join(LOCK_FILE))?;

        Ok(true)
    }

    /// Download (if needed) and make the version active.
    pub async fn install(&self, version: &Version) -> Result<()> {
        self.download(version).await?;
        Activator::new(self.config.clone()).activate(version)
    }
}

/// Extract a gzipped tarball, stripping the single top-level directory the
/// upstream archive wraps everything in.
fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let tar_gz = File::open(archive_path)?;
    let tar = GzDecoder::new(tar_gz);
    let mut archive = Archive::new(tar);
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .map_err(|e| GvmError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| GvmError::Extract(e.to_string()))?;
        let path = entry.path().map_err(|e| GvmError::Extract(e.to_string()))?;

        let stripped: PathBuf = path.components().skip(1).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }

        let dest_path = dest_dir.join(&stripped);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry
            .unpack(&dest_path)
            .map_err(|e| GvmError::Extract(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn fixture_config(root: &TempDir) -> Config {
        Config {
            goroot: root.path().join("go"),
            gopath: root.path().join("gopath"),
            versions_dir: root.path().join("go").join(".versions"),
            bin_dir: root.path().join("gopath").join("bin"),
            quiet: true,
            os_override: Some("linux".to_string()),
            arch_override: Some("amd64".to_string()),
            ..Config::default()
        }
    }

    /// A minimal release archive: everything wrapped in a `go/` directory,
    /// the way upstream ships it.
    fn fixture_archive(version: &str) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let binary = format!("go binary {version}");
        let mut header = tar::Header::new_gnu();
        header.set_size(binary.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "go/bin/go", binary.as_bytes())
            .unwrap();

        let marker = format!("go{version}");
        let mut header = tar::Header::new_gnu();
        header.set_size(marker.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "go/VERSION", marker.as_bytes())
            .unwrap();

        let mut encoder = builder.into_inner().unwrap();
        encoder.flush().unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_archive_url_uses_overrides() {
        let root = TempDir::new().unwrap();
        let installer = Installer::new(fixture_config(&root));
        let version: Version = "1.21.3".parse().unwrap();

        assert_eq!(
            installer.archive_url(&version).unwrap(),
            "https://dl.google.com/go/go1.21.3.linux-amd64.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_download_is_idempotent() {
        let root = TempDir::new().unwrap();
        let config = fixture_config(&root);
        fs::create_dir_all(config.version_dir("1.21.3")).unwrap();

        // Unreachable base URL: an already-installed version must short
        // circuit before any network activity.
        let installer = Installer::with_base_url(config, "http://unreachable.invalid");
        let fetched = installer
            .download(&"1.21.3".parse().unwrap())
            .await
            .unwrap();
        assert!(!fetched);
    }

    #[tokio::test]
    async fn test_download_extracts_and_clears_lock() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/go1.21.3.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(fixture_archive("1.21.3"))
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let config = fixture_config(&root);
        let installer = Installer::with_base_url(config.clone(), server.url());

        let fetched = installer
            .download(&"1.21.3".parse().unwrap())
            .await
            .unwrap();
        assert!(fetched);

        let dir = config.version_dir("1.21.3");
        assert_eq!(
            fs::read_to_string(dir.join("bin").join("go")).unwrap(),
            "go binary 1.21.3"
        );
        assert_eq!(fs::read_to_string(dir.join("VERSION")).unwrap(), "go1.21.3");
        assert!(!dir.join(LOCK_FILE).exists());
        assert!(!dir.join("go.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_download_unknown_version() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/go9.9.9.linux-amd64.tar.gz")
            .with_status(404)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let config = fixture_config(&root);
        let installer = Installer::with_base_url(config.clone(), server.url());

        let err = installer
            .download(&"9.9.9".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, GvmError::InvalidVersion(_)));
        assert!(
            !config.version_dir("9.9.9").exists(),
            "nothing is committed before the URL check passes"
        );
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_lock() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/go1.5.0.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(b"definitely not a gzip stream")
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let config = fixture_config(&root);
        let installer = Installer::with_base_url(config.clone(), server.url());

        let result = installer.download(&"1.5.0".parse().unwrap()).await;
        assert!(result.is_err());
        assert!(
            config.version_dir("1.5.0").join(LOCK_FILE).exists(),
            "interrupted install must keep the marker for later detection"
        );
    }

    #[tokio::test]
    async fn test_download_replaces_interrupted_install() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/go1.21.3.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(fixture_archive("1.21.3"))
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let config = fixture_config(&root);
        let dir = config.version_dir("1.21.3");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(LOCK_FILE), b"").unwrap();
        fs::write(dir.join("half-written"), b"junk").unwrap();

        let installer = Installer::with_base_url(config.clone(), server.url());
        let fetched = installer
            .download(&"1.21.3".parse().unwrap())
            .await
            .unwrap();

        assert!(fetched, "a locked directory is re-downloaded, not reused");
        assert!(!dir.join(LOCK_FILE).exists());
        assert!(!dir.join("half-written").exists());
        assert!(dir.join("bin").join("go").exists());
    }

    #[tokio::test]
    async fn test_install_downloads_then_activates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/go1.21.3.linux-amd64.tar.gz")
            .with_status(200)
            .with_body(fixture_archive("1.21.3"))
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let config = fixture_config(&root);
        let installer = Installer::with_base_url(config.clone(), server.url());

        installer.install(&"1.21.3".parse().unwrap()).await.unwrap();

        // End-to-end: versioned binary present, GOROOT and GOPATH/bin
        // resolve into the version directory.
        let dir = config.version_dir("1.21.3");
        assert!(dir.join("bin").join("go").exists());
        assert_eq!(
            fs::read_link(config.goroot.join("bin")).unwrap(),
            dir.join("bin")
        );
        assert_eq!(
            fs::read_to_string(config.bin_dir.join("go")).unwrap(),
            "go binary 1.21.3"
        );
    }
}
