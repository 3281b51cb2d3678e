mod management_url;

pub use management_url::ManagementUrlResolver;
