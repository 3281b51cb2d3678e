//! Domain Errors
//!
//! Only genuine faults are errors here. Absent applications or instances
//! are `None`, and upstream transport failures become
//! [`crate::application::RelayOutcome::UpstreamError`].

/// Faults raised while projecting registry data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// The registry holds a status page URL we cannot derive a base from.
    #[error("malformed management address for {instance}: {url}")]
    MalformedManagementAddress { instance: String, url: String },
}

/// Network-level failure talking to an instance.
///
/// Carries the underlying detail for logging only; it never crosses the
/// HTTP boundary.
#[derive(Debug, thiserror::Error)]
#[error("upstream transport failure: {0}")]
pub struct TransportError(pub String);

/// Reasons the registry refuses a registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("application name must not contain '{0}'")]
    ReservedCharacter(char),
    #[error("{0} must not be empty")]
    MissingField(&'static str),
}
