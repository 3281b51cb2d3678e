//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the application name and the instance address
/// inside an [`InstanceId`]. Also substituted for every `.` in the address.
pub const ID_SEPARATOR: char = '_';

/// Opaque, URL-safe identifier of a registered instance.
///
/// The identifier is a pure function of the application name and the
/// instance address: `APP_10_0_0_1` for `("APP", "10.0.0.1")`. Nothing is
/// stored; it is recomputed on every projection.
///
/// The scheme is lossy when the address contains literal underscores or
/// the application name contains [`ID_SEPARATOR`]. Decoding does not try
/// to detect either case; a wrong split simply fails the registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Build the identifier for an instance.
    ///
    /// # Examples
    /// ```
    /// use registry_dashboard::domain::value_objects::InstanceId;
    ///
    /// let id = InstanceId::encode("BILLING", "10.0.0.1");
    /// assert_eq!(id.as_str(), "BILLING_10_0_0_1");
    /// ```
    pub fn encode(app: &str, address: &str) -> Self {
        let address = address.replace('.', "_");
        Self(format!("{}{}{}", app, ID_SEPARATOR, address))
    }

    /// Split the identifier back into `(app, address)`.
    ///
    /// Splits at the first separator and turns every remaining `_` back
    /// into `.`. Input without a separator decodes to `(id, "")`.
    pub fn decode(&self) -> (String, String) {
        match self.0.split_once(ID_SEPARATOR) {
            Some((app, rest)) => (app.to_string(), rest.replace(ID_SEPARATOR, ".")),
            None => (self.0.clone(), String::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for InstanceId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for InstanceId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instance status as reported by the registry.
///
/// Serialized verbatim (`UP`, `OUT_OF_SERVICE`, ...). Unknown tags
/// collapse to [`InstanceStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    #[default]
    Unknown,
}

impl InstanceStatus {
    /// Parse a status tag, case-insensitively.
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "UP" => Self::Up,
            "DOWN" => Self::Down,
            "STARTING" => Self::Starting,
            "OUT_OF_SERVICE" => Self::OutOfService,
            _ => Self::Unknown,
        }
    }

    /// Convert to the registry's string tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Starting => "STARTING",
            Self::OutOfService => "OUT_OF_SERVICE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for InstanceStatus {
    fn from(raw: String) -> Self {
        Self::from_str(&raw)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a relay sub-path is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagementPathError {
    #[error("management path is empty")]
    Empty,
    #[error("management path must be relative")]
    Absolute,
    #[error("management path contains an empty segment")]
    EmptySegment,
    #[error("management path contains a dot segment")]
    DotSegment,
    #[error("management path contains a forbidden character sequence: {0}")]
    Forbidden(String),
}

/// Sub-path of an instance's management endpoint, e.g. `health` or
/// `metrics/jvm.memory.used`.
///
/// Only plain relative segments are accepted so a caller cannot climb out
/// of the management endpoint on the upstream host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementPath(String);

/// Sequences that would let a segment smuggle a separator or a dot
/// segment past the check below once the upstream decodes them.
const FORBIDDEN_SEQUENCES: &[&str] = &["\\", "?", "#", "%2e", "%2f", "%5c", "%00"];

impl ManagementPath {
    pub fn parse(raw: &str) -> Result<Self, ManagementPathError> {
        let trimmed = raw.strip_suffix('/').unwrap_or(raw);
        if trimmed.is_empty() {
            return Err(ManagementPathError::Empty);
        }
        if trimmed.starts_with('/') {
            return Err(ManagementPathError::Absolute);
        }

        let lowered = trimmed.to_ascii_lowercase();
        if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|seq| lowered.contains(**seq)) {
            return Err(ManagementPathError::Forbidden((*seq).to_string()));
        }

        for segment in trimmed.split('/') {
            match segment {
                "" => return Err(ManagementPathError::EmptySegment),
                "." | ".." => return Err(ManagementPathError::DotSegment),
                _ => {}
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManagementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
