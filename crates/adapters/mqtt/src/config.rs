//! MQTT broker configuration.

use std::time::Duration;

use serde::Deserialize;

use halux_domain::qos::QualityOfService;
use halux_domain::topic::Domain;

/// Configuration for the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Delivery guarantee for publishes and subscriptions (`0`, `1` or `2`).
    pub qos: QualityOfService,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Pause after a connection error before polling again, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Capacity of the client request queue and of the inbound channel.
    pub channel_capacity: usize,
    /// Filters subscribed on startup. Defaults to `<domain>/#` for every
    /// recognized domain.
    pub topic_filters: Vec<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "broker.emqx.io".to_string(),
            broker_port: 1883,
            client_id: "halux".to_string(),
            keep_alive_secs: 60,
            qos: QualityOfService::AtLeastOnce,
            username: None,
            password: None,
            reconnect_delay_ms: 1000,
            channel_capacity: 64,
            topic_filters: Domain::KNOWN
                .iter()
                .map(Domain::subscription_filter)
                .collect(),
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Build the rumqttc connection options.
    #[must_use]
    pub fn options(&self) -> rumqttc::MqttOptions {
        let mut options =
            rumqttc::MqttOptions::new(&self.client_id, &self.broker_host, self.broker_port);
        options.set_keep_alive(self.keep_alive());
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}
