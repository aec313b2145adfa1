/// Settings for a [`Connector`](crate::Connector).
#[derive(Clone, Debug, Default)]
pub struct ConnectorConfig {
    /// Emit trace logs for requests, dispatches and routing decisions.
    pub debug: bool,
}

impl ConnectorConfig {
    pub fn debug() -> Self {
        Self { debug: true }
    }
}

/// Settings for the WebSocket hub created by [`HubProvider`](crate::HubProvider).
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// WebSocket URL of the view-model hub.
    pub url: String,

    /// Open the connection as soon as the provider mounts.
    ///
    /// Default: `false`; the connector starts the hub on the first `connect`.
    pub auto_connect: bool,

    /// Reconnect attempts after an unexpected close; `None` means unlimited.
    pub reconnect_limit: Option<u64>,

    /// Delay between reconnect attempts in milliseconds.
    pub reconnect_interval_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000/dotnetify".to_string(),
            auto_connect: false,
            reconnect_limit: None,
            reconnect_interval_ms: 3000,
        }
    }
}

impl HubConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn reconnect_limit(mut self, limit: Option<u64>) -> Self {
        self.reconnect_limit = limit;
        self
    }

    pub fn reconnect_interval_ms(mut self, interval_ms: u64) -> Self {
        self.reconnect_interval_ms = interval_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_builder() {
        let config = HubConfig::new("ws://example.test/hub")
            .auto_connect(true)
            .reconnect_limit(Some(5))
            .reconnect_interval_ms(250);

        assert_eq!(config.url, "ws://example.test/hub");
        assert!(config.auto_connect);
        assert_eq!(config.reconnect_limit, Some(5));
        assert_eq!(config.reconnect_interval_ms, 250);
    }

    #[test]
    fn test_default_connector_config_is_quiet() {
        assert!(!ConnectorConfig::default().debug);
        assert!(ConnectorConfig::debug().debug);
    }
}
