use crate::error::GvmError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Go release identifier, e.g. `1.21.3` or `1.22rc2`.
///
/// Ordering is component-wise numeric on up to three dot-separated fields,
/// so `1.9.0` sorts before `1.10.0`. An alphanumeric component (unstable
/// releases) compares by its numeric prefix first and its suffix second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Component {
    num: u64,
    suffix: String,
}

impl Version {
    /// True when every component is purely numeric (no beta/rc suffix).
    pub fn is_stable(&self) -> bool {
        self.components.iter().all(|c| c.suffix.is_empty())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let (a_num, a_suffix) = self
                .components
                .get(i)
                .map(|c| (c.num, c.suffix.as_str()))
                .unwrap_or((0, ""));
            let (b_num, b_suffix) = other
                .components
                .get(i)
                .map(|c| (c.num, c.suffix.as_str()))
                .unwrap_or((0, ""));

            match a_num.cmp(&b_num).then_with(|| a_suffix.cmp(b_suffix)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.components.len().cmp(&other.components.len())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}{}", c.num, c.suffix)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = GvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(GvmError::VersionParse(s.to_string()));
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(GvmError::VersionParse(s.to_string()));
        }

        let mut components = Vec::with_capacity(parts.len());
        for part in parts {
            let digits_end = part
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(part.len());
            if digits_end == 0 {
                return Err(GvmError::VersionParse(s.to_string()));
            }

            let num = part[..digits_end]
                .parse::<u64>()
                .map_err(|_| GvmError::VersionParse(s.to_string()))?;

            let suffix = &part[digits_end..];
            if !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(GvmError::VersionParse(s.to_string()));
            }

            components.push(Component {
                num,
                suffix: suffix.to_string(),
            });
        }

        Ok(Version { components })
    }
}
