// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message-ingestion pipeline and process lifecycle.
//!
//! [`Pipeline`] dispatches inbound messages to per-category sinks;
//! [`Bridge`] owns the transport connection and guarantees that sinks and
//! connection are torn down together on every exit path.

use crate::config::BridgeConfig;
use crate::mqtt::{self, TransportError};
use crate::schema::{category_for_topic, Category};
use crate::sink::CategorySink;
use crate::validate::validate;
use rumqttc::{Client, ConnectReturnCode, Connection, Event, Packet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Backoff before retrying after a transport error while running.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Slice of the reconnect backoff between shutdown checks.
const BACKOFF_SLICE: Duration = Duration::from_millis(50);

/// Fatal bridge failures.
///
/// Per-message rejections never appear here; the pipeline absorbs them.
/// Anything that does appear terminates the process after teardown.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A category log file could not be opened or its header written.
    #[error("failed to open log destination {path}: {source}")]
    DestinationOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row could not be durably appended. The log may be incomplete, so
    /// the bridge must stop rather than keep writing.
    #[error("durable write to {path} failed: {source}")]
    DurableWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Counters reported at shutdown.
#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    /// Rows appended per category, in `Category::ALL` order.
    pub rows: Vec<(Category, u64)>,
    /// Payloads rejected by validation.
    pub rejected: u64,
    /// Messages observed on topics with no category binding.
    pub unbound: u64,
}

/// Decode -> validate -> append pipeline over the three category sinks.
///
/// Each sink is mutated only from the single delivery thread, strictly
/// sequentially, so no per-category lock is needed. A transport that
/// delivered from a thread pool would invalidate this and require one.
pub struct Pipeline {
    temperature: CategorySink,
    flow: CategorySink,
    pressure: CategorySink,
    rejected: u64,
    unbound: u64,
}

impl Pipeline {
    /// Open one sink per category.
    ///
    /// Runs before any network activity; a failure here aborts startup.
    pub fn open(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let mut open_sink = |category: Category| {
            let path = config.outputs.path_for(category);
            CategorySink::open(category, path).map_err(|source| BridgeError::DestinationOpen {
                path: path.to_path_buf(),
                source,
            })
        };

        Ok(Self {
            temperature: open_sink(Category::Temperature)?,
            flow: open_sink(Category::Flow)?,
            pressure: open_sink(Category::Pressure)?,
            rejected: 0,
            unbound: 0,
        })
    }

    /// Handle one inbound message.
    ///
    /// Rejections and unbound topics are logged, counted, and absorbed;
    /// only a failed durable write escapes, and that is fatal.
    pub fn handle(&mut self, topic: &str, payload: &[u8]) -> Result<(), BridgeError> {
        let Some(category) = category_for_topic(topic) else {
            self.unbound += 1;
            warn!("message on unbound topic {}, dropping", topic);
            return Ok(());
        };

        let values = match validate(category, payload) {
            Ok(values) => values,
            Err(rejection) => {
                self.rejected += 1;
                warn!("dropping {} message: {}", category, rejection);
                return Ok(());
            }
        };

        let sink = self.sink_mut(category);
        if let Err(source) = sink.append(&values) {
            return Err(BridgeError::DurableWrite {
                path: sink.path().to_path_buf(),
                source,
            });
        }

        debug!("appended {} row from {}", category, topic);
        Ok(())
    }

    fn sink_mut(&mut self, category: Category) -> &mut CategorySink {
        match category {
            Category::Temperature => &mut self.temperature,
            Category::Flow => &mut self.flow,
            Category::Pressure => &mut self.pressure,
        }
    }

    /// Payloads rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Unbound-topic messages observed so far.
    pub fn unbound(&self) -> u64 {
        self.unbound
    }

    /// Close all sinks and return the final counters.
    pub fn close(self) -> Result<BridgeStats, BridgeError> {
        let stats = BridgeStats {
            rows: vec![
                (Category::Temperature, self.temperature.rows_written()),
                (Category::Flow, self.flow.rows_written()),
                (Category::Pressure, self.pressure.rows_written()),
            ],
            rejected: self.rejected,
            unbound: self.unbound,
        };

        for sink in [self.temperature, self.flow, self.pressure] {
            let path = sink.path().to_path_buf();
            sink.close()
                .map_err(|source| BridgeError::DurableWrite { path, source })?;
        }

        Ok(stats)
    }
}

/// Event that ends the `Running` wait.
enum RunEvent {
    Interrupted,
    Fatal(BridgeError),
}

/// Handle used to interrupt a running bridge from a signal handler or
/// another thread.
#[derive(Clone)]
pub struct InterruptHandle {
    tx: Sender<RunEvent>,
}

impl InterruptHandle {
    /// Request shutdown. Subsequent calls have no further effect.
    pub fn interrupt(&self) {
        let _ = self.tx.send(RunEvent::Interrupted);
    }
}

/// Bridge lifecycle: open sinks, connect, deliver until interrupted, tear
/// down in reverse order.
///
/// `run` consumes the bridge; a stopped bridge is not restartable.
pub struct Bridge {
    config: BridgeConfig,
    events_tx: Sender<RunEvent>,
    events_rx: Receiver<RunEvent>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            config,
            events_tx,
            events_rx,
        }
    }

    /// Handle for wiring an external interrupt (ctrl-c) to this bridge.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            tx: self.events_tx.clone(),
        }
    }

    /// Run until interrupted or a fatal error.
    ///
    /// Returns the final counters on a clean stop. On every path out of the
    /// running state the delivery loop is drained and all sinks are closed.
    pub fn run(self) -> Result<BridgeStats, BridgeError> {
        // Destinations first: a bad path must fail before any network
        // activity.
        let pipeline = Pipeline::open(&self.config)?;

        let (client, mut connection) = mqtt::client(&self.config.mqtt);

        // Created -> Connected. The first transport error at this stage is
        // a fatal connect failure; already-open sinks are closed on the way
        // out.
        if let Err(err) = wait_for_connack(&mut connection, &client, &self.config) {
            // The connect error is the one reported, but a close failure
            // must still be loud.
            if let Err(close_err) = pipeline.close() {
                warn!("closing sinks after connect failure: {}", close_err);
            }
            return Err(err.into());
        }
        info!(
            "connected to {}:{}",
            self.config.mqtt.host, self.config.mqtt.port
        );

        // Connected -> Running.
        let shutdown = Arc::new(AtomicBool::new(false));
        let delivery = {
            let client = client.clone();
            let shutdown = Arc::clone(&shutdown);
            let events_tx = self.events_tx.clone();
            thread::spawn(move || delivery_loop(connection, client, pipeline, shutdown, events_tx))
        };

        wait_and_stop(&self.events_rx, &shutdown, delivery, || {
            if let Err(err) = client.disconnect() {
                debug!("disconnect request failed: {}", err);
            }
        })
    }
}

/// The `Running` wait and the unconditional teardown that follows it.
///
/// Blocks idle until an interrupt or a fatal delivery error arrives, then
/// sets the shutdown flag, stops the transport, joins the delivery thread,
/// and closes the sinks, in that order. Factored out of [`Bridge::run`] so
/// the stop sequence can be driven without a live broker.
fn wait_and_stop(
    events_rx: &Receiver<RunEvent>,
    shutdown: &AtomicBool,
    delivery: thread::JoinHandle<Pipeline>,
    stop_transport: impl FnOnce(),
) -> Result<BridgeStats, BridgeError> {
    let outcome = match events_rx.recv() {
        Ok(RunEvent::Interrupted) => {
            info!("interrupt received, stopping");
            Ok(())
        }
        Ok(RunEvent::Fatal(err)) => Err(err),
        // Unreachable while the bridge holds a sender, but harmless.
        Err(_) => Ok(()),
    };

    // Running -> Stopped. Unconditional from here.
    shutdown.store(true, Ordering::SeqCst);
    stop_transport();

    // Joining blocks until the in-flight callback has completed.
    let pipeline = match delivery.join() {
        Ok(pipeline) => pipeline,
        Err(_) => {
            error!("delivery thread panicked; sinks closed during unwind");
            return Err(outcome
                .err()
                .unwrap_or(BridgeError::Transport(TransportError::Terminated)));
        }
    };

    let stats = pipeline.close()?;
    outcome?;

    info!("bridge stopped");
    Ok(stats)
}

/// Pump the event stream until the broker acknowledges the session, then
/// issue the initial subscriptions.
fn wait_for_connack(
    connection: &mut Connection,
    client: &Client,
    config: &BridgeConfig,
) -> Result<(), TransportError> {
    loop {
        let event = match connection.iter().next() {
            Some(event) => event,
            None => return Err(TransportError::Terminated),
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    return Err(TransportError::Refused(ack.code));
                }
                // The on-connect path: subscriptions are issued only once
                // the session is acknowledged.
                mqtt::subscribe_bindings(client)?;
                return Ok(());
            }
            Ok(_) => {}
            Err(source) => {
                return Err(TransportError::Connect {
                    host: config.mqtt.host.clone(),
                    port: config.mqtt.port,
                    source,
                });
            }
        }
    }
}

/// Background delivery loop.
///
/// Owns the pipeline for its entire lifetime and hands it back on exit, so
/// joining the thread is the "stop blocks until drained" guarantee.
fn delivery_loop(
    mut connection: Connection,
    client: Client,
    mut pipeline: Pipeline,
    shutdown: Arc<AtomicBool>,
    events_tx: Sender<RunEvent>,
) -> Pipeline {
    let mut fatal_sent = false;

    for event in connection.iter() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Err(err) = pipeline.handle(&publish.topic, &publish.payload) {
                    error!("fatal pipeline error: {}", err);
                    let _ = events_tx.send(RunEvent::Fatal(err));
                    fatal_sent = true;
                    break;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                // A fresh session after a transport-level reconnect;
                // subscriptions do not survive it.
                info!("reconnected to broker (code {:?})", ack.code);
                if let Err(err) = mqtt::subscribe_bindings(&client) {
                    let _ = events_tx.send(RunEvent::Fatal(err.into()));
                    fatal_sent = true;
                    break;
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!("transport error: {}; retrying", err);
                backoff(&shutdown);
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }

    if !fatal_sent && !shutdown.load(Ordering::SeqCst) {
        let _ = events_tx.send(RunEvent::Fatal(BridgeError::Transport(
            TransportError::Terminated,
        )));
    }

    pipeline
}

/// Sleep out the reconnect backoff in slices so a shutdown request does
/// not have to wait out the full interval.
fn backoff(shutdown: &AtomicBool) {
    let mut waited = Duration::ZERO;
    while waited < RECONNECT_BACKOFF && !shutdown.load(Ordering::SeqCst) {
        thread::sleep(BACKOFF_SLICE);
        waited += BACKOFF_SLICE;
    }
}
