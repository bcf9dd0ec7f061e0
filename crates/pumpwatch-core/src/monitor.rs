// ── Monitor ──
//
// Full lifecycle management for one station: polls the status and
// reading feeds, bridges the push hub, keeps the catalog caches warm and
// republishes the assembled view on every change. Operator requests
// (presets, fueling history) go through the same feed.

use std::sync::Arc;
use std::time::Duration;

use pumpwatch_api::{HubConnectionState, HubEvent, HubHandle, ReconnectConfig, StationClient};
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CachedCatalog, CatalogSnapshot};
use crate::config::MonitorConfig;
use crate::convert;
use crate::error::CoreError;
use crate::feed::StationFeed;
use crate::model::{
    AttendantIdentity, FuelingTransaction, HistoryQuery, NozzleCode, NozzleReading, PresetOrder,
    ReadingUpdate,
};
use crate::store::RawReadingStore;
use crate::stream::ViewStream;
use crate::view::{StationView, ViewAssembler};

// ── ConnectionState ──────────────────────────────────────────────

/// Push channel state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

impl From<HubConnectionState> for ConnectionState {
    fn from(state: HubConnectionState) -> Self {
        match state {
            HubConnectionState::Disconnected => Self::Disconnected,
            HubConnectionState::Connecting => Self::Connecting,
            HubConnectionState::Connected => Self::Connected,
            HubConnectionState::Reconnecting { attempt } => Self::Reconnecting { attempt },
        }
    }
}

/// A change routed through the single writer. Every published view is
/// built by the writer, in the order these arrive.
#[derive(Debug)]
enum StoreOp {
    /// A fresh authoritative status snapshot.
    Statuses(Arc<Vec<NozzleReading>>),
    Merge(Vec<ReadingUpdate>),
    /// Catalogs were refetched.
    Refresh,
}

// ── Monitor ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Call [`start`](Self::start)
/// for live mode or [`snapshot`](Self::snapshot) for a single round.
pub struct Monitor<F: StationFeed = StationClient> {
    inner: Arc<MonitorInner<F>>,
}

impl<F: StationFeed> Clone for Monitor<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MonitorInner<F> {
    config: MonitorConfig,
    feed: F,
    assembler: ViewAssembler,
    store: Arc<RawReadingStore>,
    catalog: CachedCatalog,
    statuses: watch::Sender<Arc<Vec<NozzleReading>>>,
    views: watch::Sender<Arc<StationView>>,
    push_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    ops_tx: Mutex<mpsc::UnboundedSender<StoreOp>>,
    ops_rx: Mutex<Option<mpsc::UnboundedReceiver<StoreOp>>>,
    status_wake: Notify,
    push_source: Mutex<Option<broadcast::Receiver<Arc<HubEvent>>>>,
    hub: Mutex<Option<HubHandle>>,
}

impl Monitor<StationClient> {
    /// Build a monitor backed by the HTTP client described in `config`.
    pub fn connect(config: MonitorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = config.build_client()?;
        Ok(Self::new(config, client))
    }
}

impl<F: StationFeed> Monitor<F> {
    /// Create a monitor. Does NOT fetch anything; call
    /// [`start`](Self::start) or [`snapshot`](Self::snapshot).
    pub fn new(config: MonitorConfig, feed: F) -> Self {
        Self::build(config, feed, None)
    }

    /// Create a monitor fed by an external push source instead of the
    /// hub connection described in the config.
    pub fn with_push_events(
        config: MonitorConfig,
        feed: F,
        events: broadcast::Receiver<Arc<HubEvent>>,
    ) -> Self {
        Self::build(config, feed, Some(events))
    }

    fn build(
        config: MonitorConfig,
        feed: F,
        push_source: Option<broadcast::Receiver<Arc<HubEvent>>>,
    ) -> Self {
        let mut store = RawReadingStore::new();
        if let Some(ttl) = config.reading_ttl {
            store = store.with_ttl(ttl);
        }
        let assembler = ViewAssembler::new(Arc::clone(&config.layout), config.cash_scale);
        let catalog = CachedCatalog::new(config.attendant_cache_window, config.price_cache_window);
        let (statuses, _) = watch::channel(Arc::new(Vec::new()));
        let (views, _) = watch::channel(Arc::new(StationView::default()));
        let (push_state, _) = watch::channel(ConnectionState::Disconnected);
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(MonitorInner {
                config,
                feed,
                assembler,
                store: Arc::new(store),
                catalog,
                statuses,
                views,
                push_state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
                ops_tx: Mutex::new(ops_tx),
                ops_rx: Mutex::new(Some(ops_rx)),
                status_wake: Notify::new(),
                push_source: Mutex::new(push_source),
                hub: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn feed(&self) -> &F {
        &self.inner.feed
    }

    pub fn store(&self) -> &Arc<RawReadingStore> {
        &self.inner.store
    }

    pub fn catalog(&self) -> CatalogSnapshot {
        self.inner.catalog.snapshot()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Fetch once, then spawn the background tasks.
    ///
    /// Fetch failures during the initial round are logged and never
    /// fatal: the tasks keep retrying on their cadence.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.inner.config.validate()?;

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("monitor already running");
            return Ok(());
        }

        // Fresh child token for this run (supports restart).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        if let Err(e) = self.fetch_round().await {
            warn!(error = %e, "initial status fetch failed, continuing with polls");
        }

        let ops = self.inner.ops_tx.lock().await.clone();
        if let Some(rx) = self.inner.ops_rx.lock().await.take() {
            handles.push(tokio::spawn(reading_merge_task(self.clone(), rx, child.clone())));
        }

        let config = &self.inner.config;
        handles.push(tokio::spawn(status_poll_task(
            self.clone(),
            config.status_interval,
            ops.clone(),
            child.clone(),
        )));
        handles.push(tokio::spawn(visualization_poll_task(
            self.clone(),
            config.visualization_interval,
            ops.clone(),
            child.clone(),
        )));
        handles.push(tokio::spawn(catalog_refresh_task(
            self.clone(),
            config.catalog_check_interval,
            ops.clone(),
            child.clone(),
        )));

        self.spawn_push(ops, &child, &mut handles).await;

        info!(
            backend = %config.backend_url,
            nozzles = config.layout.nozzle_count(),
            "monitor started"
        );
        Ok(())
    }

    /// Start the push bridge from the injected source or the hub.
    ///
    /// Non-fatal on failure: the polls alone keep the view current.
    async fn spawn_push(
        &self,
        ops: mpsc::UnboundedSender<StoreOp>,
        cancel: &CancellationToken,
        handles: &mut Vec<JoinHandle<()>>,
    ) {
        // The injected source is kept so a restart can resubscribe to it.
        let injected = self
            .inner
            .push_source
            .lock()
            .await
            .as_ref()
            .map(broadcast::Receiver::resubscribe);
        if let Some(events) = injected {
            self.inner.push_state.send_replace(ConnectionState::Connected);
            handles.push(tokio::spawn(push_bridge_task(
                self.clone(),
                events,
                ops,
                cancel.clone(),
            )));
            return;
        }

        let config = &self.inner.config;
        if !config.push_enabled {
            debug!("push hub disabled, polling only");
            return;
        }

        let hub_url = match config.hub_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "invalid hub URL, polling only");
                return;
            }
        };

        let hub_cancel = cancel.child_token();
        let token = config.token.as_ref().map(|t| t.expose_secret().to_owned());
        let hub = HubHandle::connect(hub_url, token, ReconnectConfig::default(), hub_cancel.clone());

        handles.push(tokio::spawn(push_state_task(
            self.clone(),
            hub.state(),
            hub_cancel.clone(),
        )));
        handles.push(tokio::spawn(push_bridge_task(
            self.clone(),
            hub.subscribe(),
            ops,
            hub_cancel,
        )));

        *self.inner.hub.lock().await = Some(hub);
        info!("push hub spawned (handshake in progress)");
    }

    /// Cancel the background tasks and wait for them.
    ///
    /// The store keeps its readings; a later [`start`](Self::start)
    /// resumes from them.
    pub async fn stop(&self) {
        // Cancel the child token (not the parent, so restart works).
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        if let Some(hub) = self.inner.hub.lock().await.take() {
            hub.shutdown();
        }

        // Recreate the op channel; the previous receiver was consumed by
        // the merge task.
        {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.inner.ops_tx.lock().await = tx;
            *self.inner.ops_rx.lock().await = Some(rx);
        }

        self.inner.push_state.send_replace(ConnectionState::Disconnected);
        debug!("monitor stopped");
    }

    // ── One-shot ─────────────────────────────────────────────────

    /// One fetch round without background tasks.
    ///
    /// Fails only when the authoritative status snapshot cannot be
    /// fetched; reading and catalog failures degrade the view instead.
    pub async fn snapshot(&self) -> Result<Arc<StationView>, CoreError> {
        self.inner.config.validate()?;
        self.fetch_round().await
    }

    /// Runs outside the writer task, before it is spawned.
    async fn fetch_round(&self) -> Result<Arc<StationView>, CoreError> {
        let inner = &self.inner;
        let (statuses, readings, _) = tokio::join!(
            self.fetch_statuses(),
            inner.feed.visualizations(),
            inner.catalog.refresh(&inner.feed, true),
        );

        // Statuses first, so tags from hung-up nozzles are not retained.
        let statuses = statuses.map(|current| {
            self.apply(StoreOp::Statuses(current));
        });
        match readings {
            Ok(dtos) => {
                self.apply(StoreOp::Merge(convert::reading_updates(dtos)));
                debug!("initial readings merged");
            }
            Err(e) => warn!(error = %e, "visualization fetch failed"),
        }

        let view = self.recompute();
        statuses.map(|()| view)
    }

    // ── Operator requests ────────────────────────────────────────

    /// Authorize a nozzle for one fueling under an attendant's tag.
    ///
    /// The tag must belong to an active attendant and the nozzle's
    /// dispenser must currently be available or blocked. Returns the
    /// attendant the preset was sent for.
    pub async fn preset(&self, order: &PresetOrder) -> Result<AttendantIdentity, CoreError> {
        let inner = &self.inner;
        inner.config.validate()?;
        order.validate()?;
        if !inner.config.layout.contains(order.nozzle) {
            return Err(CoreError::InvalidRequest {
                message: format!("nozzle {} is not part of this station", order.nozzle),
            });
        }

        let (attendant, statuses) = tokio::join!(
            inner.catalog.resolve_attendant(&inner.feed, &order.tag),
            self.fetch_statuses(),
        );
        let attendant = attendant?.ok_or_else(|| CoreError::UnknownAttendant {
            tag: order.tag.to_string(),
        })?;

        let statuses = statuses?;
        let status = inner
            .assembler
            .dispensers(&statuses, &inner.store, &inner.catalog.snapshot())
            .into_iter()
            .find(|d| d.nozzle_codes.contains(&order.nozzle))
            .map(|d| d.status);
        match status {
            Some(status) if status.accepts_preset() => {}
            other => {
                return Err(CoreError::NozzleUnavailable {
                    code: order.nozzle.to_string(),
                    status: other.map_or_else(|| "unreported".into(), |s| s.to_string()),
                });
            }
        }

        inner.feed.preset_with_tag(&convert::preset_request(order)).await?;
        info!(
            nozzle = %order.nozzle,
            attendant = %attendant.name,
            limit = ?order.limit,
            "preset sent"
        );
        Ok(attendant)
    }

    /// Completed fuelings. Attendant names the backend left blank are
    /// filled in from the directory by tag.
    pub async fn history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<FuelingTransaction>, CoreError> {
        let inner = &self.inner;
        inner.config.validate()?;
        query.validate()?;

        let dto_query = convert::transaction_query(query);
        let (dtos, _) = tokio::join!(
            inner.feed.fueling_transactions(&dto_query),
            inner.catalog.refresh(&inner.feed, false),
        );
        let mut transactions = convert::fueling_transactions(dtos?);

        let attendants = inner.catalog.snapshot().attendants;
        for transaction in transactions.iter_mut().filter(|t| t.attendant_name.is_none()) {
            let Some(found) = transaction.tag.as_ref().and_then(|t| attendants.lookup(t)) else {
                continue;
            };
            transaction.attendant_name = Some(found.name.clone());
            if transaction.attendant_code.is_none() {
                transaction.attendant_code.clone_from(&found.code);
            }
        }
        debug!(count = transactions.len(), "fueling history fetched");
        Ok(transactions)
    }

    // ── Observation ──────────────────────────────────────────────

    /// The most recently published view.
    pub fn view(&self) -> Arc<StationView> {
        self.inner.views.borrow().clone()
    }

    pub fn subscribe(&self) -> ViewStream {
        ViewStream::new(self.inner.views.subscribe())
    }

    pub fn push_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.push_state.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────

    async fn fetch_statuses(&self) -> Result<Arc<Vec<NozzleReading>>, CoreError> {
        let dtos = self.inner.feed.nozzle_statuses().await?;
        Ok(Arc::new(convert::nozzle_readings(dtos, &self.inner.config.layout)))
    }

    /// Apply one change to the statuses or the store. Returns `true` when
    /// the view needs rebuilding.
    ///
    /// A tag is only retained while its nozzle is engaged: every status
    /// snapshot releases the tags of idle nozzles, and a tag reported for a
    /// nozzle that is idle in the latest snapshot is not stored. Readings
    /// can echo the previous attendant's tag after the hose is hung up.
    fn apply(&self, op: StoreOp) -> bool {
        let inner = &self.inner;
        match op {
            StoreOp::Statuses(current) => {
                let released = release_idle_tags(&inner.store, &current);
                if !released.is_empty() {
                    debug!(?released, "fueling episodes ended");
                }
                inner.statuses.send_replace(current);
                true
            }
            StoreOp::Merge(mut updates) => {
                let statuses = inner.statuses.borrow().clone();
                strip_idle_tags(&mut updates, &statuses);
                inner.store.merge_batch(updates) > 0
            }
            StoreOp::Refresh => true,
        }
    }

    /// Rebuild the view from the latest statuses, store and catalog.
    fn recompute(&self) -> Arc<StationView> {
        let inner = &self.inner;
        let statuses = inner.statuses.borrow().clone();
        let view = Arc::new(
            inner
                .assembler
                .assemble(&statuses, &inner.store, &inner.catalog.snapshot()),
        );
        inner.views.send_modify(|v| *v = Arc::clone(&view));
        view
    }
}

/// Clear the retained tag of every idle nozzle; returns the ones cleared.
fn release_idle_tags(store: &RawReadingStore, statuses: &[NozzleReading]) -> Vec<NozzleCode> {
    statuses
        .iter()
        .filter(|nozzle| nozzle.status.is_idle())
        .map(|nozzle| nozzle.code)
        .filter(|code| store.end_episode(*code))
        .collect()
}

/// Drop the tags of updates for nozzles idle in `statuses`. Cash is kept.
fn strip_idle_tags(updates: &mut [ReadingUpdate], statuses: &[NozzleReading]) {
    for update in updates.iter_mut().filter(|u| u.tag.is_some()) {
        let idle = statuses
            .iter()
            .any(|nozzle| nozzle.code == update.code && nozzle.status.is_idle());
        if idle {
            update.tag = None;
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Single writer: applies every status snapshot and store mutation,
/// then republishes.
async fn reading_merge_task<F: StationFeed>(
    monitor: Monitor<F>,
    mut rx: mpsc::UnboundedReceiver<StoreOp>,
    cancel: CancellationToken,
) {
    loop {
        let op = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            op = rx.recv() => match op {
                Some(op) => op,
                None => break,
            },
        };

        if monitor.apply(op) {
            monitor.recompute();
        }
    }
}

/// Authoritative status snapshot, on a cadence or when a push event
/// reports a status change.
async fn status_poll_task<F: StationFeed>(
    monitor: Monitor<F>,
    period: Duration,
    ops: mpsc::UnboundedSender<StoreOp>,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = monitor.inner.status_wake.notified() => interval.reset(),
            _ = interval.tick() => {}
        }

        match monitor.fetch_statuses().await {
            Ok(current) => {
                let _ = ops.send(StoreOp::Statuses(current));
            }
            Err(e) => warn!(error = %e, "status poll failed"),
        }
    }
}

/// Running totals and tags at the fast cadence.
async fn visualization_poll_task<F: StationFeed>(
    monitor: Monitor<F>,
    period: Duration,
    ops: mpsc::UnboundedSender<StoreOp>,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match monitor.inner.feed.visualizations().await {
                    Ok(dtos) => {
                        let updates = convert::reading_updates(dtos);
                        if !updates.is_empty() {
                            let _ = ops.send(StoreOp::Merge(updates));
                        }
                    }
                    Err(e) => warn!(error = %e, "visualization poll failed"),
                }
            }
        }
    }
}

/// Refetch catalogs once their cache window lapses.
async fn catalog_refresh_task<F: StationFeed>(
    monitor: Monitor<F>,
    period: Duration,
    ops: mpsc::UnboundedSender<StoreOp>,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let inner = &monitor.inner;
                if inner.catalog.refresh(&inner.feed, false).await.any() {
                    let _ = ops.send(StoreOp::Refresh);
                }
            }
        }
    }
}

/// Push events → store ops and status wake-ups.
async fn push_bridge_task<F: StationFeed>(
    monitor: Monitor<F>,
    mut events: broadcast::Receiver<Arc<HubEvent>>,
    ops: mpsc::UnboundedSender<StoreOp>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = events.recv() => match result {
                Ok(event) => match event.as_ref() {
                    HubEvent::StatusChanged { nozzle_number, status, .. } => {
                        debug!(nozzle = nozzle_number, status, "pushed status change");
                        monitor.inner.status_wake.notify_one();
                    }
                    HubEvent::VisualizationUpdated(dtos) => {
                        let updates = convert::reading_updates(dtos.clone());
                        if !updates.is_empty() {
                            let _ = ops.send(StoreOp::Merge(updates));
                        }
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "push bridge lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    monitor.inner.push_state.send_replace(ConnectionState::Disconnected);
                    break;
                }
            },
        }
    }
}

/// Mirror the hub's connection state.
async fn push_state_task<F: StationFeed>(
    monitor: Monitor<F>,
    mut state: watch::Receiver<HubConnectionState>,
    cancel: CancellationToken,
) {
    loop {
        let current = ConnectionState::from(*state.borrow_and_update());
        monitor.inner.push_state.send_replace(current);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
