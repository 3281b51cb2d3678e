mod in_memory_registry;
mod reqwest_upstream_client;

pub use in_memory_registry::InMemoryRegistry;
pub use reqwest_upstream_client::{ReqwestUpstreamClient, UpstreamClientConfig};
