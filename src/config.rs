use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // HTTP API settings
    pub listen_addr: String,
    pub debug: bool,

    // Circuit-breaker streams
    pub turbine_url: String,

    // Registry settings
    pub history_size: usize,
    pub lease_ttl_secs: u64,
    pub eviction_interval_secs: u64,

    // Relay settings
    pub proxy_connect_timeout_ms: u64,
    pub proxy_timeout_secs: u64,
    pub drain_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            debug: false,
            turbine_url: "http://localhost:8080/turbine.stream".to_string(),
            history_size: 1000,
            lease_ttl_secs: 90,
            eviction_interval_secs: 60,
            proxy_connect_timeout_ms: 2000,
            proxy_timeout_secs: 30,
            drain_timeout_secs: 10,
        }
    }
}

/// Port part of a `host:port` listen address.
fn listen_port(listen_addr: &str) -> &str {
    listen_addr
        .rsplit_once(':')
        .map(|(_, port)| port)
        .unwrap_or("8080")
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn load_config() -> anyhow::Result<Config> {
    let defaults = Config::default();

    let listen_addr = std::env::var("DASHBOARD_LISTEN_ADDR")
        .unwrap_or_else(|_| defaults.listen_addr.clone());

    let debug = std::env::var("DEBUG").is_ok();

    // Defaults to the turbine endpoint served next to the dashboard
    let turbine_url = std::env::var("DASHBOARD_TURBINE_URL").unwrap_or_else(|_| {
        format!(
            "http://localhost:{}/turbine.stream",
            listen_port(&listen_addr)
        )
    });

    let history_size = env_or("DASHBOARD_HISTORY_SIZE", defaults.history_size);
    let lease_ttl_secs = env_or("DASHBOARD_LEASE_TTL_SECS", defaults.lease_ttl_secs);
    let eviction_interval_secs = env_or(
        "DASHBOARD_EVICTION_INTERVAL_SECS",
        defaults.eviction_interval_secs,
    );

    let proxy_connect_timeout_ms = env_or(
        "DASHBOARD_PROXY_CONNECT_TIMEOUT_MS",
        defaults.proxy_connect_timeout_ms,
    );
    let proxy_timeout_secs = env_or("DASHBOARD_PROXY_TIMEOUT_SECS", defaults.proxy_timeout_secs);
    let drain_timeout_secs = env_or("DASHBOARD_DRAIN_TIMEOUT_SECS", defaults.drain_timeout_secs);

    if history_size == 0 {
        anyhow::bail!("DASHBOARD_HISTORY_SIZE must be greater than zero");
    }
    if eviction_interval_secs == 0 {
        anyhow::bail!("DASHBOARD_EVICTION_INTERVAL_SECS must be greater than zero");
    }

    Ok(Config {
        listen_addr,
        debug,
        turbine_url,
        history_size,
        lease_ttl_secs,
        eviction_interval_secs,
        proxy_connect_timeout_ms,
        proxy_timeout_secs,
        drain_timeout_secs,
    })
}
