//! Hover previews for content cards.
//!
//! Each card gets its own entry in a concurrent map. Entering a card arms an
//! activation timer; only when the pointer stays for the full delay is a
//! [`HoverAdapter`](crate::adapters::HoverAdapter) built and loaded. Leaving
//! tears the entry down, including any load still in flight.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use log::{debug, trace, warn};
use marquee_config::constants::DEFAULT_EVENT_CHANNEL_CAPACITY;
use marquee_config::{HoverConfig, PlayerConfig};
use marquee_model::{
    AdapterEvent, CardId, CardView, HoverEvent, HoverPhase, MediaKind,
    MediaReference, PlaybackError, PlaybackOptions,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::adapters::{
    AdapterEventSink, AdapterFactory, AdapterMode, BackendAdapterFactory,
    EpochEvent, PlaybackAdapter, TaskGuard,
};
use crate::backends::PlaybackBackends;
use crate::resolver;

struct CardEntry {
    generation: u64,
    reference: MediaReference,
    phase: HoverPhase,
    preview_visible: bool,
    timer: Option<TaskGuard>,
    adapter: Option<Arc<dyn PlaybackAdapter>>,
}

impl CardEntry {
    fn view(&self, card_id: CardId) -> CardView {
        CardView {
            card_id,
            phase: self.phase,
            poster_visible: !self.preview_visible,
            preview_visible: self.preview_visible,
        }
    }
}

struct HoverInner {
    factory: Arc<dyn AdapterFactory>,
    delay: Duration,
    cards: DashMap<CardId, CardEntry>,
    generation: AtomicU64,
    events: broadcast::Sender<HoverEvent>,
    adapter_tx: mpsc::UnboundedSender<EpochEvent>,
    drain: Mutex<Option<TaskGuard>>,
}

impl HoverInner {
    fn publish(&self, event: HoverEvent) {
        trace!("hover event {event:?}");
        let _ = self.events.send(event);
    }

    /// Whether `card_id` is still hovered by the pointer that armed
    /// `generation`
    fn is_current(&self, card_id: CardId, generation: u64) -> bool {
        self.cards
            .get(&card_id)
            .is_some_and(|entry| entry.generation == generation)
    }

    fn fail(&self, card_id: CardId, generation: u64, error: PlaybackError) {
        let adapter = match self.cards.get_mut(&card_id) {
            Some(mut entry) if entry.generation == generation => {
                entry.phase = HoverPhase::Idle;
                entry.preview_visible = false;
                entry.adapter.take()
            }
            _ => return,
        };
        if let Some(adapter) = adapter {
            adapter.destroy();
        }
        warn!("hover preview for {card_id} failed: {error}");
        self.publish(HoverEvent::PreviewFailed { card_id, error });
    }

    fn leave(&self, card_id: CardId) {
        let Some((_, entry)) = self.cards.remove(&card_id) else {
            return;
        };
        drop(entry.timer);
        if let Some(adapter) = entry.adapter {
            adapter.destroy();
        }
        if entry.preview_visible {
            debug!("hover preview hidden for {card_id}");
            self.publish(HoverEvent::PreviewHidden { card_id });
        }
    }

    fn handle_adapter_event(&self, EpochEvent { epoch, event }: EpochEvent) {
        let AdapterEvent::Failed(error) = event else {
            return;
        };
        let card_id = self
            .cards
            .iter()
            .find(|entry| entry.generation == epoch)
            .map(|entry| *entry.key());
        if let Some(card_id) = card_id {
            self.fail(card_id, epoch, error);
        }
    }
}

/// Owns every hover preview of a card grid
pub struct HoverPreviewManager {
    inner: Arc<HoverInner>,
}

impl fmt::Debug for HoverPreviewManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoverPreviewManager")
            .field("delay", &self.inner.delay)
            .field("cards", &self.inner.cards.len())
            .finish_non_exhaustive()
    }
}

impl HoverPreviewManager {
    /// Must be called inside a tokio runtime
    pub fn new(factory: Arc<dyn AdapterFactory>, config: &HoverConfig) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        let (adapter_tx, adapter_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(HoverInner {
            factory,
            delay: config.activation_delay(),
            cards: DashMap::new(),
            generation: AtomicU64::new(0),
            events,
            adapter_tx,
            drain: Mutex::new(None),
        });
        let drain = TaskGuard::spawn(drain_adapter_events(
            Arc::downgrade(&inner),
            adapter_rx,
        ));
        *inner.drain.lock() = Some(drain);
        Self { inner }
    }

    pub fn with_backends(
        backends: Arc<PlaybackBackends>,
        config: Arc<PlayerConfig>,
    ) -> Self {
        let hover = config.hover.clone();
        Self::new(Arc::new(BackendAdapterFactory::new(backends, config)), &hover)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HoverEvent> {
        self.inner.events.subscribe()
    }

    pub fn card_view(&self, card_id: CardId) -> CardView {
        self.inner
            .cards
            .get(&card_id)
            .map(|entry| entry.view(card_id))
            .unwrap_or_else(|| CardView::idle(card_id))
    }

    /// Arm the activation timer for `card_id`. Cards without a usable
    /// trailer keep showing their poster.
    pub fn pointer_enter(&self, card_id: CardId, trailer: &str) {
        let reference = match resolver::resolve(trailer) {
            Ok(reference) => reference,
            Err(err) => {
                debug!("no hover preview for {card_id}: {err}");
                return;
            }
        };
        if reference.kind() == MediaKind::Torrent {
            debug!("no hover preview for {card_id}: torrent trailers are not previewed");
            return;
        }
        if self
            .inner
            .cards
            .get(&card_id)
            .is_some_and(|entry| entry.phase != HoverPhase::Idle)
        {
            trace!("pointer already over {card_id}");
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        // A previous failed attempt may still hold the slot
        self.inner.leave(card_id);
        self.inner.cards.insert(
            card_id,
            CardEntry {
                generation,
                reference,
                phase: HoverPhase::PendingActivation,
                preview_visible: false,
                timer: None,
                adapter: None,
            },
        );

        let timer = TaskGuard::spawn(activate(
            Arc::downgrade(&self.inner),
            card_id,
            generation,
        ));
        match self.inner.cards.get_mut(&card_id) {
            Some(mut entry) if entry.generation == generation => {
                entry.timer = Some(timer);
            }
            _ => drop(timer),
        }
    }

    /// Cancel a pending activation or tear down the running preview
    pub fn pointer_leave(&self, card_id: CardId) {
        self.inner.leave(card_id);
    }

    /// Leave every card
    pub fn clear(&self) {
        let cards: Vec<CardId> =
            self.inner.cards.iter().map(|entry| *entry.key()).collect();
        for card_id in cards {
            self.inner.leave(card_id);
        }
    }

    /// Cards with a pending or running preview
    pub fn active_cards(&self) -> usize {
        self.inner.cards.len()
    }
}

impl Drop for HoverPreviewManager {
    fn drop(&mut self) {
        self.clear();
        self.inner.drain.lock().take();
    }
}

async fn activate(inner: Weak<HoverInner>, card_id: CardId, generation: u64) {
    let delay = match inner.upgrade() {
        Some(inner) => inner.delay,
        None => return,
    };
    tokio::time::sleep(delay).await;

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let reference = match inner.cards.get(&card_id) {
        Some(entry) if entry.generation == generation => entry.reference.clone(),
        _ => return,
    };

    debug!("activating hover preview for {card_id}: {reference}");
    let sink = AdapterEventSink::new(generation, inner.adapter_tx.clone());
    let adapter = match inner.factory.create(&reference, AdapterMode::Hover, sink)
    {
        Ok(adapter) => adapter,
        Err(error) => {
            inner.fail(card_id, generation, error);
            return;
        }
    };

    let stored = match inner.cards.get_mut(&card_id) {
        Some(mut entry) if entry.generation == generation => {
            entry.adapter = Some(Arc::clone(&adapter));
            true
        }
        _ => false,
    };
    if !stored {
        adapter.destroy();
        return;
    }

    // Hover adapters impose their own muted preview options
    let result = adapter.load(&reference, &PlaybackOptions::default()).await;

    if !inner.is_current(card_id, generation) {
        debug!("pointer left {card_id} during preview load");
        adapter.destroy();
        return;
    }
    if let Err(error) = result {
        inner.fail(card_id, generation, error);
        return;
    }

    adapter.play();
    let shown = match inner.cards.get_mut(&card_id) {
        Some(mut entry) if entry.generation == generation => {
            entry.phase = HoverPhase::Active;
            entry.preview_visible = true;
            true
        }
        _ => false,
    };
    if shown {
        debug!("hover preview shown for {card_id}");
        inner.publish(HoverEvent::PreviewShown { card_id });
    } else {
        adapter.destroy();
    }
}

async fn drain_adapter_events(
    inner: Weak<HoverInner>,
    mut events: mpsc::UnboundedReceiver<EpochEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_adapter_event(event);
    }
}
