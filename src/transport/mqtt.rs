//! MQTT transport on top of `rumqttc`'s synchronous client.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, LastWill, MqttOptions, Outgoing, Packet,
    SubscribeReasonCode,
};

use crate::config::MqttConfig;
use crate::error::{message, Result, TransportError};
use crate::protocol::QoS;

use super::{MessageHandler, Transport};

/// Capacity of the client's request queue.
const REQUEST_CAPACITY: usize = 64;

/// How often the delivery thread checks whether it should stop.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause before the event loop retries after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// How long connecting and subscribing may take.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `disconnect` waits for the disconnect packet to go out.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Where the publish waiting for confirmation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    /// Still in the client queue.
    Queued,
    /// Written with this packet id, the broker has not answered yet.
    Sent(u16),
    /// Written (QoS 0) or acknowledged by the broker.
    Confirmed,
    /// The connection dropped before the publish was confirmed.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Waiting {
    request: u64,
    qos: QoS,
    progress: Progress,
}

/// Matches broker confirmations to the one publish waiting for them.
///
/// The event loop takes publish requests from the client queue in order,
/// so the n-th `Outgoing::Publish` event belongs to the n-th request.
/// Publishes replayed after a reconnect reuse a packet id that is still in
/// flight and are not counted again.
#[derive(Debug, Default)]
struct Confirmations {
    requested: u64,
    written: u64,
    in_flight: HashSet<u16>,
    waiting: Option<Waiting>,
}

impl Confirmations {
    /// Count a publish request about to be queued and return its number.
    fn request(&mut self) -> u64 {
        self.requested += 1;
        self.requested
    }

    /// Forget the last request, the client refused it.
    fn withdraw(&mut self) {
        if matches!(self.waiting, Some(w) if w.request == self.requested) {
            self.waiting = None;
        }
        self.requested -= 1;
    }

    /// Wait for the confirmation of request number `request`.
    fn expect(&mut self, request: u64, qos: QoS) {
        self.waiting = Some(Waiting {
            request,
            qos,
            progress: Progress::Queued,
        });
    }

    fn progress(&self) -> Option<Progress> {
        self.waiting.map(|w| w.progress)
    }

    /// Account for an event loop event. Returns whether the waiting
    /// publish made progress.
    fn observe(&mut self, event: &Event) -> bool {
        match event {
            Event::Outgoing(Outgoing::Publish(pkid)) => self.written(*pkid),
            Event::Incoming(Packet::PubAck(ack)) => {
                self.acknowledged(ack.pkid, QoS::AtLeastOnce)
            }
            Event::Incoming(Packet::PubComp(comp)) => {
                self.acknowledged(comp.pkid, QoS::ExactlyOnce)
            }
            _ => false,
        }
    }

    fn written(&mut self, pkid: u16) -> bool {
        // QoS 0 publishes carry packet id 0 and are never replayed
        if pkid != 0 && !self.in_flight.insert(pkid) {
            return false;
        }
        self.written += 1;

        match &mut self.waiting {
            Some(w) if w.progress == Progress::Queued && w.request == self.written => {
                w.progress = match w.qos {
                    QoS::AtMostOnce => Progress::Confirmed,
                    _ => Progress::Sent(pkid),
                };
                true
            }
            _ => false,
        }
    }

    fn acknowledged(&mut self, pkid: u16, qos: QoS) -> bool {
        self.in_flight.remove(&pkid);

        match &mut self.waiting {
            Some(w) if w.qos == qos && w.progress == Progress::Sent(pkid) => {
                w.progress = Progress::Confirmed;
                true
            }
            _ => false,
        }
    }

    /// The connection dropped. Returns whether a waiting publish was lost.
    fn disconnected(&mut self) -> bool {
        match &mut self.waiting {
            Some(w) if w.progress != Progress::Confirmed => {
                w.progress = Progress::Lost;
                true
            }
            _ => false,
        }
    }
}

/// [`Confirmations`] shared with the delivery thread.
#[derive(Default)]
struct Confirmer {
    state: Mutex<Confirmations>,
    changed: Condvar,
}

impl Confirmer {
    fn observe(&self, event: &Event) {
        if lock(&self.state).observe(event) {
            self.changed.notify_all();
        }
    }

    fn disconnected(&self) {
        if lock(&self.state).disconnected() {
            self.changed.notify_all();
        }
    }

    /// Block until the waiting publish is settled or `timeout` passes.
    fn wait(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.state);
        loop {
            match state.progress() {
                Some(Progress::Confirmed) => {
                    state.waiting = None;
                    return Ok(());
                }
                Some(Progress::Lost) | None => {
                    state.waiting = None;
                    return Err(TransportError::Disconnected.into());
                }
                Some(Progress::Queued) | Some(Progress::Sent(_)) => {}
            }

            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                state.waiting = None;
                return Err(TransportError::ConfirmTimeout.into());
            }
            state = self
                .changed
                .wait_timeout(state, left)
                .map(|(state, _)| state)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}

struct Delivery {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Connection>,
}

/// MQTT client implementing [`Transport`].
pub struct MqttTransport {
    options: Mutex<MqttOptions>,
    handler: Arc<Mutex<Option<MessageHandler>>>,
    client: Mutex<Option<Client>>,
    /// Event loop while no delivery thread runs.
    connection: Mutex<Option<Connection>>,
    delivery: Mutex<Option<Delivery>>,
    confirmer: Arc<Confirmer>,
    /// Held by the one caller of `publish_confirmed` at a time.
    confirming: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

impl MqttTransport {
    /// Create a transport from broker settings. Nothing is sent until
    /// [`Transport::connect`].
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(
            config.client_id.as_str(),
            config.host.as_str(),
            config.port,
        );
        options.set_clean_session(config.clean_session);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let Some(user) = &config.user {
            let password = config.password.as_ref().map(|p| p.as_str()).unwrap_or("");
            options.set_credentials(user.as_str(), password);
        }
        if config.tls {
            options.set_transport(rumqttc::Transport::tls_with_default_config());
        }

        Self {
            options: Mutex::new(options),
            handler: Arc::new(Mutex::new(None)),
            client: Mutex::new(None),
            connection: Mutex::new(None),
            delivery: Mutex::new(None),
            confirmer: Arc::new(Confirmer::default()),
            confirming: Mutex::new(()),
        }
    }

    /// Queue a publish request, optionally as the one awaiting confirmation.
    ///
    /// The client lock is held while the request is counted and queued so
    /// request numbers follow queue order.
    fn send(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool, confirm: bool) -> Result<()> {
        let mut client = lock(&self.client);
        let client = client.as_mut().ok_or(TransportError::Disconnected)?;

        {
            let mut state = lock(&self.confirmer.state);
            let request = state.request();
            if confirm {
                state.expect(request, qos);
            }
        }

        client
            .publish(topic, to_rumqttc(qos), retain, payload.to_vec())
            .map_err(|e| {
                lock(&self.confirmer.state).withdraw();
                TransportError::Publish(message(&e.to_string())).into()
            })
    }

    /// Drive the parked event loop until `settled` returns a result.
    ///
    /// Only used during setup, before the delivery thread owns the
    /// connection.
    fn pump_until(&self, mut settled: impl FnMut(&Packet) -> Option<Result<()>>) -> Result<()> {
        let mut connection = lock(&self.connection);
        let connection = connection.as_mut().ok_or(TransportError::Disconnected)?;

        let deadline = Instant::now() + SETUP_TIMEOUT;
        while Instant::now() < deadline {
            match connection.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    if let Event::Incoming(packet) = &event {
                        if let Some(result) = settled(packet) {
                            return result;
                        }
                    }
                    dispatch(&event, &self.handler, &self.confirmer);
                }
                Ok(Err(e)) => return Err(TransportError::Setup(message(&e.to_string())).into()),
                Err(_) => {}
            }
        }
        Err(TransportError::Setup(message("broker did not answer in time")).into())
    }
}

/// Hand an event to the message handler or the confirmation tracking.
fn dispatch(event: &Event, handler: &Mutex<Option<MessageHandler>>, confirmer: &Confirmer) {
    match event {
        Event::Incoming(Packet::Publish(publish)) => {
            if let Some(handler) = lock(handler).as_mut() {
                handler(&publish.topic, &publish.payload);
            }
        }
        Event::Incoming(Packet::PubAck(_))
        | Event::Incoming(Packet::PubComp(_))
        | Event::Outgoing(Outgoing::Publish(_)) => confirmer.observe(event),
        other => debug!("MQTT event {:?}", other),
    }
}

fn deliver(
    mut connection: Connection,
    stop: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<MessageHandler>>>,
    confirmer: Arc<Confirmer>,
) -> Connection {
    while !stop.load(Ordering::Acquire) {
        match connection.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => dispatch(&event, &handler, &confirmer),
            Ok(Err(e)) => {
                warn!("MQTT connection error: {}", e);
                confirmer.disconnected();
                thread::sleep(RECONNECT_DELAY);
            }
            Err(_) => {}
        }
    }
    connection
}

impl Transport for MqttTransport {
    fn set_last_will(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()> {
        let will = LastWill::new(topic, payload.to_vec(), to_rumqttc(qos), retain);
        lock(&self.options).set_last_will(will);
        Ok(())
    }

    fn set_message_handler(&self, handler: MessageHandler) -> Result<()> {
        *lock(&self.handler) = Some(handler);
        Ok(())
    }

    fn connect(&self) -> Result<()> {
        let options = lock(&self.options).clone();
        info!("connecting to {:?}", options.broker_address());

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        *lock(&self.confirmer.state) = Confirmations::default();
        *lock(&self.client) = Some(client);
        *lock(&self.connection) = Some(connection);

        self.pump_until(|packet| match packet {
            Packet::ConnAck(ack) if ack.code == ConnectReturnCode::Success => {
                info!("connected to broker");
                Some(Ok(()))
            }
            Packet::ConnAck(ack) => Some(Err(TransportError::Setup(message(&format!(
                "connection refused: {:?}",
                ack.code
            )))
            .into())),
            _ => None,
        })
    }

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<()> {
        {
            let mut client = lock(&self.client);
            let client = client.as_mut().ok_or(TransportError::Disconnected)?;
            client
                .subscribe(topic, to_rumqttc(qos))
                .map_err(|e| TransportError::Setup(message(&e.to_string())))?;
        }

        self.pump_until(|packet| match packet {
            Packet::SubAck(ack) if ack.return_codes.contains(&SubscribeReasonCode::Failure) => Some(Err(
                TransportError::Setup(message("subscription rejected by broker")).into(),
            )),
            Packet::SubAck(_) => Some(Ok(())),
            _ => None,
        })
    }

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()> {
        self.send(topic, payload, qos, retain, false)
    }

    fn publish_confirmed(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        timeout: Duration,
    ) -> Result<()> {
        let _confirming = lock(&self.confirming);
        self.send(topic, payload, qos, retain, true)?;
        self.confirmer.wait(timeout)
    }

    fn start_delivery(&self) -> Result<()> {
        let mut delivery = lock(&self.delivery);
        if delivery.is_some() {
            return Ok(());
        }
        let connection = lock(&self.connection)
            .take()
            .ok_or(TransportError::Disconnected)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop = Arc::clone(&stop);
            let handler = Arc::clone(&self.handler);
            let confirmer = Arc::clone(&self.confirmer);
            thread::Builder::new()
                .name("mqtt-delivery".into())
                .spawn(move || deliver(connection, stop, handler, confirmer))
                .map_err(|e| TransportError::Setup(message(&e.to_string())))?
        };

        *delivery = Some(Delivery { stop, thread });
        Ok(())
    }

    fn stop_delivery(&self) -> Result<()> {
        let Some(delivery) = lock(&self.delivery).take() else {
            return Ok(());
        };

        delivery.stop.store(true, Ordering::Release);
        let connection = delivery
            .thread
            .join()
            .map_err(|_| TransportError::Setup(message("delivery thread panicked")))?;
        *lock(&self.connection) = Some(connection);
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        self.stop_delivery()?;
        let Some(client) = lock(&self.client).take() else {
            return Ok(());
        };
        client
            .disconnect()
            .map_err(|e| TransportError::Publish(message(&e.to_string())))?;

        // drive the event loop until the disconnect packet is out
        if let Some(mut connection) = lock(&self.connection).take() {
            let deadline = Instant::now() + DISCONNECT_TIMEOUT;
            while Instant::now() < deadline {
                match connection.recv_timeout(POLL_INTERVAL) {
                    Ok(Ok(Event::Outgoing(Outgoing::Disconnect))) | Ok(Err(_)) => break,
                    _ => {}
                }
            }
        }
        info!("disconnected from broker");
        Ok(())
    }
}
