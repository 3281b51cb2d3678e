mod application_repository;
mod registry_source;
mod upstream_client;

pub use application_repository::ApplicationRepository;
pub use registry_source::RegistrySource;
pub use upstream_client::{UpstreamClient, UpstreamRequest, UpstreamResponse};
