use crate::activate::Activator;
use crate::config::Config;
use crate::error::{GvmError, Result};
use crate::store::{Direction, VersionStore};
use crate::term::{read_key, AlternateScreenGuard, RawModeGuard};
use crate::version::Version;
use colored::*;
use crossterm::cursor::MoveTo;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, IsTerminal, Write};
use std::process::Command;

/// Terminal loop for browsing installed versions and committing a
/// selection. A small state machine over one variable: the currently
/// highlighted version.
pub struct Selector {
    config: Config,
}

impl Selector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        if self.config.non_interactive || !io::stdout().is_terminal() {
            return Err(GvmError::Config(
                "the interactive selector requires a terminal; pass a command instead".to_string(),
            ));
        }

        let store = VersionStore::new(self.config.clone());
        let installed = store.list_installed()?;
        if installed.is_empty() {
            return Err(GvmError::NoVersions);
        }

        let active = store.current_version()?;

        let chosen = {
            let _screen = AlternateScreenGuard::acquire()?;
            let _raw = RawModeGuard::acquire()?;

            let mut highlight = active
                .clone()
                .filter(|v| installed.contains(v))
                .unwrap_or_else(|| installed[0].clone());

            loop {
                draw(&installed, &highlight, active.as_ref())?;

                let key = read_key()?;
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => {
                        highlight = store.neighbor(&highlight, Direction::Prev)?;
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        highlight = store.neighbor(&highlight, Direction::Next)?;
                    }
                    KeyCode::Enter => break Some(highlight),
                    KeyCode::Char('q') | KeyCode::Esc => break None,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break None
                    }
                    _ => {}
                }
            }
            // Guards drop here: raw mode off, alternate screen left, on
            // every path out of the loop.
        };

        if let Some(version) = chosen {
            Activator::new(self.config.clone()).activate(&version)?;
            report_active_version(&store, &version)?;
        }

        Ok(())
    }
}

fn draw(installed: &[Version], highlight: &Version, active: Option<&Version>) -> io::Result<()> {
    let mut out = io::stdout();
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;

    write!(out, "  {}\r\n\r\n", "Installed Go versions".bold())?;
    for version in installed {
        let marker = if Some(version) == active { " *" } else { "" };
        if version == highlight {
            write!(
                out,
                "{} {}{}\r\n",
                ">".cyan().bold(),
                version.to_string().cyan().bold(),
                marker.green()
            )?;
        } else {
            write!(out, "  {}{}\r\n", version, marker.green())?;
        }
    }
    write!(
        out,
        "\r\n  {}\r\n",
        "↑/k up · ↓/j down · enter select · q quit".dimmed()
    )?;
    out.flush()
}

/// Print what the freshly activated toolchain reports about itself.
fn report_active_version(store: &VersionStore, version: &Version) -> Result<()> {
    let output = Command::new(store.binary_path(version))
        .arg("version")
        .output();

    match output {
        Ok(output) => {
            let reported = String::from_utf8_lossy(&output.stdout);
            match reported.lines().next() {
                Some(line) => println!("{}", line),
                None => println!("go {}", version),
            }
        }
        Err(_) => println!("go {}", version),
    }
    Ok(())
}
