use thiserror::Error;

#[derive(Error, Debug)]
pub enum GvmError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("go {0} does not exist or is not available for this platform")]
    InvalidVersion(String),

    #[error("go {0} is not installed")]
    NotInstalled(String),

    #[error("go {0} is corrupt (interrupted install); run `gvm install {0}` to re-download it")]
    CorruptInstall(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("invalid version identifier: {0}")]
    VersionParse(String),

    #[error("no versions found")]
    NoVersions,

    #[error("no active version")]
    NoActiveVersion,

    #[error("cannot remove the active version {0}")]
    RemoveActive(String),

    #[error("failed to extract archive: {0}")]
    Extract(String),

    #[error("aborted")]
    UserAbort,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GvmError>;
