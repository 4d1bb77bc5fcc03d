use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use marquee_contracts::element::{ElementEvent, MediaElement};
use marquee_model::{AdapterEvent, PlaybackError};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::{AdapterEventSink, TaskGuard};

pub(crate) type LoadOutcome = oneshot::Receiver<Result<(), PlaybackError>>;

/// What the element last reported about its data supply. Written by the
/// forwarder, read by adapters that feed the element themselves.
#[derive(Debug)]
pub(crate) struct ElementGauge {
    playable: AtomicBool,
    starved: AtomicBool,
}

impl ElementGauge {
    fn new() -> Self {
        Self {
            playable: AtomicBool::new(false),
            starved: AtomicBool::new(true),
        }
    }

    fn reset(&self) {
        self.playable.store(false, Ordering::Release);
        self.starved.store(true, Ordering::Release);
    }

    /// The element reached `CanPlay` for the current source
    pub(crate) fn is_playable(&self) -> bool {
        self.playable.load(Ordering::Acquire)
    }

    /// No frames flowing: not yet playing, or stalled waiting for data
    pub(crate) fn is_starved(&self) -> bool {
        self.starved.load(Ordering::Acquire)
    }
}

/// Owns one native element on behalf of an adapter and translates its events.
pub(crate) struct ElementBridge {
    element: Arc<dyn MediaElement>,
    gauge: Arc<ElementGauge>,
    forwarder: Mutex<Option<TaskGuard>>,
}

impl std::fmt::Debug for ElementBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementBridge")
            .field("attached", &self.forwarder.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl ElementBridge {
    pub(crate) fn new(element: Arc<dyn MediaElement>) -> Self {
        Self {
            element,
            gauge: Arc::new(ElementGauge::new()),
            forwarder: Mutex::new(None),
        }
    }

    pub(crate) fn element(&self) -> &Arc<dyn MediaElement> {
        &self.element
    }

    pub(crate) fn gauge(&self) -> &Arc<ElementGauge> {
        &self.gauge
    }

    /// Attach a fresh listener and start forwarding. The returned receiver
    /// settles on the first `CanPlay` (success) or element error (failure).
    ///
    /// `start_time` is applied once, as soon as metadata is known.
    pub(crate) fn attach(
        &self,
        sink: AdapterEventSink,
        start_time: f64,
    ) -> LoadOutcome {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        self.gauge.reset();

        // Replacing the guard aborts a forwarder left over from a previous load
        *self.forwarder.lock() = Some(TaskGuard::spawn(forward(
            Arc::clone(&self.element),
            Arc::clone(&self.gauge),
            rx,
            sink,
            start_time,
            ready_tx,
        )));
        self.element.set_listener(Some(tx));
        ready_rx
    }

    /// Stop forwarding and detach the listener
    pub(crate) fn detach(&self) {
        self.element.set_listener(None);
        self.forwarder.lock().take();
    }

    /// Pause, unload and detach: the element holds no network or decoder
    /// resources afterwards.
    pub(crate) fn release(&self) {
        self.element.pause();
        self.element.clear_source();
        self.detach();
    }
}

async fn forward(
    element: Arc<dyn MediaElement>,
    gauge: Arc<ElementGauge>,
    mut events: mpsc::UnboundedReceiver<ElementEvent>,
    sink: AdapterEventSink,
    start_time: f64,
    ready: oneshot::Sender<Result<(), PlaybackError>>,
) {
    let mut ready = Some(ready);
    let mut start_pending = start_time > 0.0;

    while let Some(event) = events.recv().await {
        trace!("element event {event:?} (epoch {})", sink.epoch());
        match event {
            ElementEvent::LoadedMetadata { duration } => {
                if start_pending {
                    start_pending = false;
                    let target = if duration.is_finite() && duration > 0.0 {
                        start_time.min(duration)
                    } else {
                        start_time
                    };
                    debug!("applying start time {target:.2}s");
                    element.set_current_time(target);
                }
                emit_duration(&sink, duration);
            }
            ElementEvent::DurationChange { duration } => {
                emit_duration(&sink, duration);
            }
            ElementEvent::CanPlay => {
                gauge.playable.store(true, Ordering::Release);
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }
            }
            ElementEvent::Playing => {
                gauge.starved.store(false, Ordering::Release);
                sink.emit(AdapterEvent::Playing);
            }
            ElementEvent::Pause => sink.emit(AdapterEvent::Paused),
            ElementEvent::Waiting => {
                gauge.starved.store(true, Ordering::Release);
                sink.emit(AdapterEvent::Buffering);
            }
            ElementEvent::TimeUpdate {
                current_time,
                duration,
            } => sink.emit(AdapterEvent::Progress {
                current_time,
                duration,
            }),
            ElementEvent::Ended => sink.emit(AdapterEvent::Ended),
            ElementEvent::Error { code, message } => {
                let error = PlaybackError::media_load(match code {
                    Some(code) => format!("media element error {code}: {message}"),
                    None => format!("media element error: {message}"),
                });
                match ready.take() {
                    Some(ready) => {
                        let _ = ready.send(Err(error));
                    }
                    None => sink.emit(AdapterEvent::Failed(error)),
                }
            }
        }
    }
}

fn emit_duration(sink: &AdapterEventSink, duration: f64) {
    if duration.is_finite() && duration > 0.0 {
        sink.emit(AdapterEvent::DurationChanged(duration));
    }
}
