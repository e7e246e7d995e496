/// MQTT client feeding the metadata store.
///
/// ```text
///   broker ──► EventLoop::poll() ──► BusEvent::decode() ──► MetadataStore
///                  │
///                  └── ConnAck → (re)subscribe to <base>/{title,artist,...}
/// ```
///
/// rumqttc reconnects on the next `poll()` after a failure; we only wait
/// `reconnect_delay` in between so a dead broker does not spin the task.
/// The render loop keeps drawing whatever the store last held.
use std::sync::Arc;
use std::time::Duration;

use nowplaying_proto::config::MqttConfig;
use nowplaying_proto::protocol::{subscriptions, BusEvent};
use nowplaying_proto::state::MetadataStore;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const REQUEST_CAPACITY: usize = 16;
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

pub struct BusClient {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl BusClient {
    /// Connect in the background.  The task stops when `cancel` (or the
    /// token handed to `shutdown`) fires.
    pub fn start(
        config: &MqttConfig,
        store: Arc<MetadataStore>,
        cancel: CancellationToken,
    ) -> Self {
        let mut options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive());
        if !config.username.is_empty() {
            options.set_credentials(config.username.clone(), config.password.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let cancel = cancel.child_token();
        let session = BusSession {
            client,
            topic_base: config.topic_base.clone(),
            reconnect_delay: config.reconnect_delay(),
            store,
            cancel: cancel.clone(),
        };

        info!(
            "bus: connecting to {}:{} as {:?}, base {:?}",
            config.host, config.port, config.client_id, config.topic_base
        );
        let task = tokio::spawn(session.run(eventloop));
        Self { cancel, task }
    }

    /// Disconnect from the broker and wait for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("bus: task ended abnormally: {}", e);
        }
        info!("bus: closed");
    }
}

struct BusSession {
    client: AsyncClient,
    topic_base: String,
    reconnect_delay: Duration,
    store: Arc<MetadataStore>,
    cancel: CancellationToken,
}

impl BusSession {
    async fn run(self, mut eventloop: EventLoop) {
        let mut connected = false;

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = eventloop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    info!("bus: connected ({:?})", ack.code);
                    connected = true;
                    self.subscribe().await;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_publish(&publish.topic, &publish.payload).await;
                }
                Ok(_) => {}
                Err(e) => {
                    if connected {
                        warn!("bus: connection lost: {}", e);
                    } else {
                        warn!("bus: connection failed: {}", e);
                    }
                    connected = false;
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
            }
        }

        if connected {
            self.disconnect(&mut eventloop).await;
        }
    }

    async fn subscribe(&self) {
        for topic in subscriptions(&self.topic_base) {
            match self.client.subscribe(topic.as_str(), QoS::AtMostOnce).await {
                Ok(()) => debug!("bus: subscribed to {}", topic),
                Err(e) => warn!("bus: subscribe {} failed: {}", topic, e),
            }
        }
    }

    async fn handle_publish(&self, topic: &str, payload: &[u8]) {
        let Some(event) = BusEvent::decode(&self.topic_base, topic, payload) else {
            debug!("bus: ignoring {} ({} bytes)", topic, payload.len());
            return;
        };
        debug!("bus: {} {:?}", event.kind(), event);
        self.store.apply(event).await;
    }

    /// Queue a DISCONNECT and keep polling until it is on the wire.
    async fn disconnect(&self, eventloop: &mut EventLoop) {
        if let Err(e) = self.client.disconnect().await {
            warn!("bus: disconnect request failed: {}", e);
            return;
        }
        let flushed = tokio::time::timeout(DISCONNECT_GRACE, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
        if flushed.is_err() {
            warn!("bus: broker did not take the disconnect in time");
        }
    }
}
