use serde::Deserialize;

/// Complete Waypoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WaypointConfig {
    #[serde(default)]
    pub hot: HotStoreConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub eta: EtaConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Hot location cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HotStoreConfig {
    /// Inactivity window after which an agent is presumed offline (seconds)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: i64,
    /// How often the sweeper drops expired records (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_ttl_seconds() -> i64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for HotStoreConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

/// Durable history store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// SQLite database file path
    #[serde(default = "default_history_path")]
    pub path: String,
}

fn default_history_path() -> String {
    "waypoint_history.db".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

/// ETA estimation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EtaConfig {
    /// Distance-matrix style routing endpoint
    #[serde(default = "default_routing_url")]
    pub routing_url: String,
    /// Provider API key; read from ROUTING_API_KEY when absent
    #[serde(default)]
    pub api_key: Option<String>,
    /// Provider call budget before the fallback path is taken (milliseconds)
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    /// Assumed average speed for the distance fallback (km/h)
    #[serde(default = "default_average_speed_kmh")]
    pub average_speed_kmh: f64,
    /// Last-resort ETA when origin/destination cannot be resolved (seconds)
    #[serde(default = "default_eta_seconds")]
    pub default_eta_seconds: u32,
}

fn default_routing_url() -> String {
    "https://maps.googleapis.com/maps/api/distancematrix/json".to_string()
}

fn default_provider_timeout_ms() -> u64 {
    2000
}

fn default_average_speed_kmh() -> f64 {
    40.0
}

fn default_eta_seconds() -> u32 {
    1800
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            routing_url: default_routing_url(),
            api_key: std::env::var("ROUTING_API_KEY").ok(),
            provider_timeout_ms: default_provider_timeout_ms(),
            average_speed_kmh: default_average_speed_kmh(),
            default_eta_seconds: default_eta_seconds(),
        }
    }
}

/// Order service collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersConfig {
    /// Base URL of the order service for destination lookups
    #[serde(default = "default_order_service_url")]
    pub service_url: String,
}

fn default_order_service_url() -> String {
    "http://localhost:3004".to_string()
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            service_url: default_order_service_url(),
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3007".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            hot: HotStoreConfig::default(),
            history: HistoryConfig::default(),
            eta: EtaConfig::default(),
            orders: OrdersConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<WaypointConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: WaypointConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WaypointConfig::default();
        assert_eq!(config.hot.ttl_seconds, 300);
        assert_eq!(config.hot.sweep_interval_seconds, 60);
        assert_eq!(config.history.path, "waypoint_history.db");
        assert_eq!(config.eta.provider_timeout_ms, 2000);
        assert_eq!(config.eta.average_speed_kmh, 40.0);
        assert_eq!(config.eta.default_eta_seconds, 1800);
        assert_eq!(config.api.bind_addr, "0.0.0.0:3007");
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [hot]
            ttl_seconds = 120
            sweep_interval_seconds = 30

            [history]
            path = "/var/lib/waypoint/history.db"

            [eta]
            routing_url = "https://router.example.com/matrix"
            provider_timeout_ms = 500
            average_speed_kmh = 35.0
            default_eta_seconds = 900

            [orders]
            service_url = "http://orders:3004"

            [api]
            bind_addr = "127.0.0.1:8080"
        "#;

        let config: WaypointConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.hot.ttl_seconds, 120);
        assert_eq!(config.history.path, "/var/lib/waypoint/history.db");
        assert_eq!(config.eta.routing_url, "https://router.example.com/matrix");
        assert_eq!(config.eta.provider_timeout_ms, 500);
        assert_eq!(config.orders.service_url, "http://orders:3004");
        assert_eq!(config.api.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [hot]
            ttl_seconds = 600
        "#;

        let config: WaypointConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.hot.ttl_seconds, 600);
        assert_eq!(config.hot.sweep_interval_seconds, 60); // Default
        assert_eq!(config.eta.default_eta_seconds, 1800); // Default
    }
}
