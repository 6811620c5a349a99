use crate::activate::Activator;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::download::Downloader;
use crate::error::{GvmError, Result};
use crate::install::Installer;
use crate::selector::Selector;
use crate::store::VersionStore;
use crate::utils::{confirm, print_info, print_success, print_warning};
use crate::version::Version;
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::BTreeSet;
use std::fs;
use std::process::Command;

const SELF_UPGRADE_URL: &str = "https://raw.githubusercontent.com/gvm-sh/gvm/main/install.sh";

#[derive(Parser)]
#[command(name = "gvm")]
#[command(about = "Go version manager", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// Never prompt; fail instead
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Override the detected operating system (linux, darwin, freebsd)
    #[arg(long, global = true, value_name = "OS")]
    os: Option<String>,

    /// Override the detected architecture (386, amd64, armv6l, arm64, ppc64le, s390x)
    #[arg(long, global = true, value_name = "ARCH")]
    arch: Option<String>,

    /// Include unstable (beta/rc) releases in listings and `latest`
    #[arg(short = 'u', long, global = true)]
    unstable: bool,

    #[arg(skip)]
    config: Config,
}

#[derive(Subcommand)]
enum Commands {
    /// Download (if needed) and activate a version
    Install {
        /// Version to install (e.g. 1.21.3), or `latest`
        version: String,
    },

    /// Download a version without activating it
    Download {
        /// Version to download, or `latest`
        version: String,
    },

    /// Activate an installed version
    Set {
        /// Version to activate, or `latest`
        version: String,
    },

    /// Run a specific version's go binary
    Run {
        /// Version to run
        version: String,

        /// Arguments passed through to go
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the path to a version's go binary
    Which {
        /// Version to locate
        version: String,
    },

    /// Delete installed versions (refuses the active one)
    Remove {
        /// Versions to delete
        #[arg(required = true)]
        versions: Vec<String>,
    },

    /// Remove all installed versions except the active one
    Prune,

    /// List installed versions, marking the active one
    List,

    /// List remote versions, marking installed and active ones
    ListAll,

    /// Re-run the remote install script against this installation
    SelfUpgrade,
}

impl Cli {
    pub async fn run(mut self) -> Result<()> {
        if self.no_color || std::env::var_os("NO_COLOR").is_some() {
            colored::control::set_override(false);
        }

        let mut config = Config::load()?;
        config.quiet = self.quiet;
        config.non_interactive = self.non_interactive;
        config.include_unstable = self.unstable;
        config.os_override = self.os.clone();
        config.arch_override = self.arch.clone();
        self.config = config;

        match self.command.take() {
            None => Selector::new(self.config.clone()).run(),
            Some(Commands::Install { version }) => self.install(&version).await,
            Some(Commands::Download { version }) => self.download(&version).await,
            Some(Commands::Set { version }) => self.set(&version).await,
            Some(Commands::Run { version, args }) => self.run_version(&version, args).await,
            Some(Commands::Which { version }) => self.which(&version),
            Some(Commands::Remove { versions }) => self.remove(&versions),
            Some(Commands::Prune) => self.prune(),
            Some(Commands::List) => self.list(),
            Some(Commands::ListAll) => self.list_all().await,
            Some(Commands::SelfUpgrade) => self.self_upgrade().await,
        }
    }

    async fn install(&self, token: &str) -> Result<()> {
        let catalog = Catalog::new();
        let version = catalog.resolve(token, self.config.include_unstable).await?;

        Installer::new(self.config.clone()).install(&version).await?;

        if !self.config.quiet {
            print_success(&format!("go {} is now active", version));
        }
        Ok(())
    }

    async fn download(&self, token: &str) -> Result<()> {
        let catalog = Catalog::new();
        let version = catalog.resolve(token, self.config.include_unstable).await?;

        let fetched = Installer::new(self.config.clone()).download(&version).await?;

        if !self.config.quiet {
            if fetched {
                print_success(&format!("go {} downloaded", version));
            } else {
                print_info(&format!("go {} is already installed", version));
            }
        }
        Ok(())
    }

    async fn set(&self, token: &str) -> Result<()> {
        let catalog = Catalog::new();
        let version = catalog.resolve(token, self.config.include_unstable).await?;

        Activator::new(self.config.clone()).activate(&version)?;

        if !self.config.quiet {
            print_success(&format!("now using go {}", version));
        }
        Ok(())
    }

    async fn run_version(&self, token: &str, args: Vec<String>) -> Result<()> {
        let version: Version = token.parse()?;
        let store = VersionStore::new(self.config.clone());

        if !store.is_installed(&version) {
            if self.config.non_interactive {
                return Err(GvmError::NotInstalled(version.to_string()));
            }
            print_warning(&format!("go {} is not installed", version));
            if !confirm(&format!("Install go {} now?", version)) {
                return Err(GvmError::UserAbort);
            }
            Installer::new(self.config.clone()).download(&version).await?;
        }

        if store.is_locked(&version) {
            return Err(GvmError::CorruptInstall(version.to_string()));
        }

        let status = Command::new(store.binary_path(&version))
            .args(&args)
            .env("GOROOT", store.version_dir(&version))
            .status()?;
        std::process::exit(status.code().unwrap_or(1));
    }

    fn which(&self, token: &str) -> Result<()> {
        let version: Version = token.parse()?;
        let store = VersionStore::new(self.config.clone());

        if !store.is_installed(&version) {
            return Err(GvmError::NotInstalled(version.to_string()));
        }

        println!("{}", store.binary_path(&version).display());
        Ok(())
    }

    fn remove(&self, tokens: &[String]) -> Result<()> {
        let store = VersionStore::new(self.config.clone());
        // One derivation covers the whole batch.
        let active = store.current_version()?;

        for token in tokens {
            let version: Version = token.parse()?;
            store.remove(&version, active.as_ref())?;
            if !self.config.quiet {
                print_success(&format!("removed go {}", version));
            }
        }
        Ok(())
    }

    fn prune(&self) -> Result<()> {
        let store = VersionStore::new(self.config.clone());
        let active = store.current_version()?.ok_or(GvmError::NoActiveVersion)?;

        let removed = store.prune(&active)?;

        if !self.config.quiet {
            for version in &removed {
                print_success(&format!("removed go {}", version));
            }
            print_info(&format!("kept go {} (active)", active));
        }
        Ok(())
    }

    fn list(&self) -> Result<()> {
        let store = VersionStore::new(self.config.clone());
        let installed = store.list_installed()?;

        if installed.is_empty() {
            print_warning("no go versions installed");
            println!("\n{}", "Install one:".yellow());
            println!("  gvm install latest");
            return Ok(());
        }

        let active = store.current_version()?;

        for version in installed {
            if Some(&version) == active.as_ref() {
                println!(
                    "{} {} {}",
                    "→".green().bold(),
                    version.to_string().cyan(),
                    "(active)".green()
                );
            } else {
                println!("  {}", version);
            }
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<()> {
        let catalog = Catalog::new();
        let remote = catalog.list_remote(self.config.include_unstable).await?;

        if remote.is_empty() {
            print_warning("no versions found in the remote index");
            return Ok(());
        }

        let store = VersionStore::new(self.config.clone());
        let installed: BTreeSet<Version> = store.list_installed()?.into_iter().collect();
        let active = store.current_version()?;

        for version in remote {
            if Some(&version) == active.as_ref() {
                println!(
                    "{} {} {}",
                    "→".green().bold(),
                    version.to_string().cyan(),
                    "(active)".green()
                );
            } else if installed.contains(&version) {
                println!("  {} {}", version.to_string().cyan(), "(installed)".blue());
            } else {
                println!("  {}", version);
            }
        }
        Ok(())
    }

    /// Fetch and execute the upstream install script. This deliberately
    /// trusts the network and is kept separate from ordinary installs.
    async fn self_upgrade(&self) -> Result<()> {
        print_warning(&format!(
            "self-upgrade downloads and executes {}",
            SELF_UPGRADE_URL
        ));

        let downloader = Downloader::new(self.config.quiet);
        let script = downloader
            .get(SELF_UPGRADE_URL)
            .await?
            .error_for_status()
            .map_err(GvmError::Network)?
            .text()
            .await
            .map_err(GvmError::Network)?;

        let script_path = std::env::temp_dir().join("gvm-install.sh");
        fs::write(&script_path, script)?;

        let status = Command::new("sh").arg(&script_path).status();
        fs::remove_file(&script_path).ok();

        let status = status?;
        if !status.success() {
            return Err(GvmError::Config(format!(
                "install script exited with {}",
                status
            )));
        }

        if !self.config.quiet {
            print_success("gvm upgraded");
        }
        Ok(())
    }
}
