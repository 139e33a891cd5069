//! Pub/sub transport boundary.
//!
//! Inbound status updates are delivered on a bounded channel of
//! [`StatusMessage`] that the FSM drains at its own pace, rather than a
//! callback invoked from the MQTT client's own thread.

use crate::error::{CncError, CncResult};
use crate::machine::config::MqttConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One inbound status update: the last `/`-delimited segment of its topic,
/// plus the raw payload string.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub topic_tail: String,
    pub payload: String,
}

/// Pub/sub boundary the `Machine` drives. Implemented by [`RumqttcTransport`]
/// for real brokers and [`RecordingTransport`] for tests.
pub trait Transport: Send {
    fn connect(&mut self) -> CncResult<()>;
    fn publish_setpoint(&mut self, payload: &str) -> CncResult<()>;
    fn subscribe_status(&mut self) -> CncResult<()>;
    fn unsubscribe_status(&mut self) -> CncResult<()>;
    fn disconnect(&mut self) -> CncResult<()>;
    /// Non-blocking poll of the inbound status channel.
    fn try_recv_status(&mut self) -> Option<StatusMessage>;
}

/// Real MQTT transport, backed by a current-thread `tokio` runtime driving
/// `rumqttc`'s event loop in a background task.
pub struct RumqttcTransport {
    runtime: tokio::runtime::Runtime,
    client: rumqttc::AsyncClient,
    pub_topic: String,
    sub_topic: String,
    connected: Arc<AtomicBool>,
    inbox_rx: Receiver<StatusMessage>,
    event_task: Option<tokio::task::JoinHandle<()>>,
}

impl RumqttcTransport {
    pub fn new(mqtt: &MqttConfig) -> CncResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut options =
            rumqttc::MqttOptions::new("cnc-core", mqtt.broker_address.clone(), mqtt.broker_port);
        options.set_keep_alive(Duration::from_secs(5));
        let (client, mut eventloop) = rumqttc::AsyncClient::new(options, 64);

        let (tx, rx): (SyncSender<StatusMessage>, Receiver<StatusMessage>) = sync_channel(256);
        let connected = Arc::new(AtomicBool::new(false));
        let connected_task = connected.clone();

        let event_task = runtime.spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_))) => {
                        connected_task.store(true, Ordering::SeqCst);
                    }
                    Ok(rumqttc::Event::Incoming(rumqttc::Packet::Publish(p))) => {
                        let topic_tail = p.topic.rsplit('/').next().unwrap_or("").to_string();
                        let payload = String::from_utf8_lossy(&p.payload).into_owned();
                        let _ = tx.try_send(StatusMessage { topic_tail, payload });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(%err, "mqtt event loop error, stopping");
                        break;
                    }
                }
            }
        });

        Ok(RumqttcTransport {
            runtime,
            client,
            pub_topic: mqtt.pub_topic.clone(),
            sub_topic: mqtt.sub_topic.clone(),
            connected,
            inbox_rx: rx,
            event_task: Some(event_task),
        })
    }
}

impl Transport for RumqttcTransport {
    fn connect(&mut self) -> CncResult<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let connected = self.connected.clone();
        self.runtime.block_on(async move {
            loop {
                if connected.load(Ordering::SeqCst) {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(CncError::TransportUnavailable(
                        "broker did not acknowledge within the connect deadline".into(),
                    ));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
    }

    fn publish_setpoint(&mut self, payload: &str) -> CncResult<()> {
        self.runtime
            .block_on(
                self.client
                    .publish(&self.pub_topic, rumqttc::QoS::AtMostOnce, false, payload.as_bytes()),
            )
            .map_err(|e| CncError::TransportUnavailable(e.to_string()))
    }

    fn subscribe_status(&mut self) -> CncResult<()> {
        self.runtime
            .block_on(self.client.subscribe(&self.sub_topic, rumqttc::QoS::AtMostOnce))
            .map_err(|e| CncError::TransportUnavailable(e.to_string()))
    }

    fn unsubscribe_status(&mut self) -> CncResult<()> {
        self.runtime
            .block_on(self.client.unsubscribe(&self.sub_topic))
            .map_err(|e| CncError::TransportUnavailable(e.to_string()))
    }

    fn disconnect(&mut self) -> CncResult<()> {
        let _ = self.runtime.block_on(self.client.disconnect());
        if let Some(handle) = self.event_task.take() {
            handle.abort();
        }
        Ok(())
    }

    fn try_recv_status(&mut self) -> Option<StatusMessage> {
        self.inbox_rx.try_recv().ok()
    }
}

/// Deterministic in-memory transport double: records published payloads and
/// lets tests queue status updates to be drained in order.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    published: Arc<std::sync::Mutex<Vec<String>>>,
    pending: std::collections::VecDeque<StatusMessage>,
    pub subscribed: bool,
    disconnected: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        RecordingTransport::default()
    }

    /// A cloneable handle onto the published payloads, so a test can retain
    /// visibility after the transport is boxed and moved into a `Machine`.
    pub fn published_handle(&self) -> Arc<std::sync::Mutex<Vec<String>>> {
        self.published.clone()
    }

    /// A cloneable handle observing whether `disconnect` has been called.
    pub fn disconnected_handle(&self) -> Arc<AtomicBool> {
        self.disconnected.clone()
    }

    /// Queues a status update to be returned by a future `try_recv_status`.
    pub fn push_status(&mut self, topic_tail: &str, payload: &str) {
        self.pending.push_back(StatusMessage {
            topic_tail: topic_tail.to_string(),
            payload: payload.to_string(),
        });
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self) -> CncResult<()> {
        Ok(())
    }

    fn publish_setpoint(&mut self, payload: &str) -> CncResult<()> {
        self.published.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    fn subscribe_status(&mut self) -> CncResult<()> {
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe_status(&mut self) -> CncResult<()> {
        self.subscribed = false;
        Ok(())
    }

    fn disconnect(&mut self) -> CncResult<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn try_recv_status(&mut self) -> Option<StatusMessage> {
        self.pending.pop_front()
    }
}
