// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! MQTT feed
//!
//! Connects to a broker, subscribes to one topic at QoS 0 and forwards every
//! PUBLISH into the subscription buffer from a task that drives the client
//! event loop. Connection errors after the initial connect are logged and
//! retried; the subscription is renewed on every reconnect.

use std::time::Duration;

use async_trait::async_trait;
use pulsebind_config::FeedConfig;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::{FeedMessage, FeedSource, FeedSubscription};
use crate::{IngestError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_PORT: u16 = 1883;

pub struct MqttFeed {
    broker: String,
    client_id: String,
    credentials: Option<(String, String)>,
    capacity: usize,
}

impl MqttFeed {
    /// `broker` is `host[:port]`, optionally prefixed with `tcp://` or `mqtt://`
    pub fn new(broker: impl Into<String>, client_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            broker: broker.into(),
            client_id: client_id.into(),
            credentials: None,
            capacity: capacity.max(1),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        let feed = Self::new(
            config.broker.clone(),
            config.client_id.clone(),
            config.channel_capacity,
        );
        match &config.username {
            Some(username) => {
                feed.with_credentials(username.clone(), config.password.clone().unwrap_or_default())
            }
            None => feed,
        }
    }

    pub fn broker(&self) -> &str {
        &self.broker
    }

    fn options(&self) -> Result<MqttOptions> {
        let (host, port) = parse_broker(&self.broker)?;
        if self.client_id.is_empty() || self.client_id.starts_with(' ') {
            return Err(IngestError::Feed(format!("invalid client id '{}'", self.client_id)));
        }
        let mut options = MqttOptions::new(self.client_id.clone(), host, port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username.clone(), password.clone());
        }
        Ok(options)
    }
}

#[async_trait]
impl FeedSource for MqttFeed {
    async fn subscribe(&self, topic: &str) -> Result<FeedSubscription> {
        let (client, mut eventloop) = AsyncClient::new(self.options()?, self.capacity);

        timeout(CONNECT_TIMEOUT, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| IngestError::Feed(format!("connect to {} timed out", self.broker)))?
            .map_err(|e| IngestError::Feed(format!("connect to {} failed: {}", self.broker, e)))?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| IngestError::Feed(format!("subscribe to '{}' failed: {}", topic, e)))?;

        info!("[MQTT-FEED] Subscribed to '{}' on {}", topic, self.broker);

        let (sender, receiver) = mpsc::channel(self.capacity);
        let reader = tokio::spawn(read_loop(client, eventloop, topic.to_string(), sender));

        Ok(FeedSubscription::new(topic, receiver, Some(reader)))
    }

    fn transport_name(&self) -> &str {
        "mqtt"
    }
}

async fn wait_for_connack(
    eventloop: &mut EventLoop,
) -> std::result::Result<(), rumqttc::ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(_)) = eventloop.poll().await? {
            return Ok(());
        }
    }
}

async fn read_loop(
    client: AsyncClient,
    mut eventloop: EventLoop,
    topic: String,
    sender: mpsc::Sender<FeedMessage>,
) {
    loop {
        if sender.is_closed() {
            debug!("[MQTT-FEED] Subscription for '{}' dropped", topic);
            break;
        }

        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if sender.send(publish_to_message(publish)).await.is_err() {
                    debug!("[MQTT-FEED] Subscription for '{}' dropped", topic);
                    break;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                // Clean sessions lose subscriptions across reconnects
                if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                    warn!("[MQTT-FEED] Resubscribe to '{}' failed: {}", topic, e);
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("[MQTT-FEED] Connection error on '{}', retrying: {}", topic, e);
                sleep(RECONNECT_DELAY).await;
            }
        }
    }

    if let Err(e) = client.try_disconnect() {
        debug!("[MQTT-FEED] Disconnect failed: {}", e);
    }
}

fn publish_to_message(publish: Publish) -> FeedMessage {
    FeedMessage::new(publish.topic, publish.payload.to_vec())
}

fn parse_broker(broker: &str) -> Result<(String, u16)> {
    let address = broker
        .trim()
        .trim_start_matches("tcp://")
        .trim_start_matches("mqtt://");

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| IngestError::Feed(format!("invalid broker port in '{}'", broker)))?;
            (host, port)
        }
        None => (address, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(IngestError::Feed(format!("invalid broker address '{}'", broker)));
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broker() {
        assert_eq!(
            parse_broker("tcp://broker.local:1884").unwrap(),
            ("broker.local".to_string(), 1884)
        );
        assert_eq!(
            parse_broker("mqtt://10.0.0.2").unwrap(),
            ("10.0.0.2".to_string(), DEFAULT_PORT)
        );
        assert_eq!(
            parse_broker("localhost:1883").unwrap(),
            ("localhost".to_string(), 1883)
        );
        assert!(parse_broker("tcp://broker:port").is_err());
        assert!(parse_broker("tcp://:1883").is_err());
    }

    #[test]
    fn test_from_config() {
        let config = FeedConfig {
            transport: pulsebind_config::FeedTransport::Mqtt,
            broker: "tcp://broker.local:1883".to_string(),
            client_id: "collector-1".to_string(),
            username: Some("device".to_string()),
            password: None,
            ..FeedConfig::default()
        };
        let feed = MqttFeed::from_config(&config);

        assert_eq!(feed.broker(), "tcp://broker.local:1883");
        assert_eq!(feed.credentials, Some(("device".to_string(), String::new())));

        let options = feed.options().unwrap();
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1883));
        assert_eq!(options.client_id(), "collector-1");
    }

    #[test]
    fn test_publish_to_message() {
        let publish = Publish::new(
            "samples/data",
            QoS::AtMostOnce,
            br#"{"sample_id":"S1","data":[1]}"#.to_vec(),
        );
        assert_eq!(
            publish_to_message(publish),
            FeedMessage::new("samples/data", br#"{"sample_id":"S1","data":[1]}"#.to_vec())
        );
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails() {
        let feed = MqttFeed::new("tcp://127.0.0.1:1", "pulsebind-test", 4);
        assert_eq!(feed.transport_name(), "mqtt");
        assert!(matches!(
            feed.subscribe("samples/data").await,
            Err(IngestError::Feed(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected_before_connect() {
        for feed in [
            MqttFeed::new("tcp://broker:notaport", "pulsebind-test", 4),
            MqttFeed::new("tcp://127.0.0.1:1883", "", 4),
        ] {
            assert!(matches!(
                feed.subscribe("samples/data").await,
                Err(IngestError::Feed(_))
            ));
        }
    }
}
