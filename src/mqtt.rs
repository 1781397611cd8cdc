// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport glue over the MQTT client.
//!
//! Builds the client from configuration and issues the per-topic
//! subscriptions. Wire-level reconnection and keepalive belong to the
//! client; the bridge only consumes its event stream.

use crate::config::MqttConfig;
use crate::schema::TOPIC_BINDINGS;
use rumqttc::{Client, ClientError, Connection, ConnectionError, MqttOptions, QoS};
use std::time::Duration;
use thiserror::Error;

/// Bound on pending requests between the client handle and its event loop.
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Transport-level failures surfaced to the lifecycle.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker could not be reached at startup.
    #[error("failed to connect to broker {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: ConnectionError,
    },

    /// The broker rejected the session.
    #[error("broker refused the connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    /// A client request (subscribe, disconnect) could not be queued.
    #[error("MQTT client request failed: {0}")]
    Client(#[from] ClientError),

    /// The event loop ended without a requested shutdown.
    #[error("transport event loop terminated unexpectedly")]
    Terminated,
}

/// Build the MQTT client and its event stream from configuration.
///
/// The network connection is established lazily by the event loop; the
/// caller pumps the returned [`Connection`] until the broker acknowledges
/// the session.
pub fn client(config: &MqttConfig) -> (Client, Connection) {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.host.clone(),
        config.port,
    );
    options.set_keep_alive(Duration::from_secs(config.keepalive_secs));

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username.clone(), password.clone());
    }

    Client::new(options, REQUEST_QUEUE_CAPACITY)
}

/// Subscribe to every bound topic at QoS 1 (at-least-once).
///
/// Called after every broker acknowledgement: sessions are clean, so
/// subscriptions do not survive a transport-level reconnect.
pub fn subscribe_bindings(client: &Client) -> Result<(), TransportError> {
    for (topic, category) in TOPIC_BINDINGS {
        client.subscribe(topic, QoS::AtLeastOnce)?;
        tracing::debug!("subscribed to {} ({})", topic, category);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_built_from_config() {
        let config = MqttConfig {
            host: "broker.lab".to_string(),
            port: 1884,
            keepalive_secs: 30,
            ..MqttConfig::default()
        };

        // Construction is offline; the connection only opens once pumped.
        let (_client, _connection) = client(&config);
    }
}
