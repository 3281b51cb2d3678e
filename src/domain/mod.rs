//! Domain Layer
//!
//! Entities, value objects, ports and pure services. Nothing in here
//! performs I/O.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Application, Instance, InstanceHistory, InstanceRecord};
pub use errors::{RegistrationError, RepositoryError, TransportError};
pub use value_objects::{InstanceId, InstanceStatus, ManagementPath};
