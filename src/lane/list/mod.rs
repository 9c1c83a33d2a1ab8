//! The list lane: an ordered, 0-indexed, key-augmented sequence of typed
//! values.
//!
//! Every structural mutation — insert, update, remove, move, drop-prefix,
//! take-prefix, clear — is a dedicated relay driven through the phased relay
//! engine against the lane's current view snapshot: phase 0 dispatches the
//! "will" observers (which may veto or transform), phase 1 applies the
//! change to storage and dispatches the "did" observers.
//!
//! [`ListLaneModel`] owns the canonical state and the view set;
//! [`ListLaneView`] is the agent-facing handle holding the value form and
//! the observer registrations.

pub mod observers;
mod relays;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use uuid::Uuid;

use crate::address::LaneAddress;
use crate::binding::{AgentContext, CommandMessage, LaneBinding, Uplink};
use crate::data::{ListData, ListEntry, MemoryListData};
use crate::error::LaneError;
use crate::form::Form;
use crate::observer::{ObserverId, ObserverSet};
use crate::relay::{RelayRun, Step};
use crate::stage::{Schedule, Stage};

use observers::{ListObserver, ListOp};
use relays::{
    ClearRelay, DropRelay, InsertRelay, MoveRelay, RemoveRelay, TakeRelay, UpdateRelay,
};

const RESIDENT: u32 = 1 << 0;
const TRANSIENT: u32 = 1 << 1;
const SIGNED: u32 = 1 << 2;

fn set_flag(flags: &AtomicU32, bit: u32, on: bool) {
    if on {
        flags.fetch_or(bit, Ordering::Relaxed);
    } else {
        flags.fetch_and(!bit, Ordering::Relaxed);
    }
}

fn get_flag(flags: &AtomicU32, bit: u32) -> bool {
    flags.load(Ordering::Relaxed) & bit != 0
}

type FailFn = Arc<dyn Fn(&LaneError) + Send + Sync>;

// ---------------------------------------------------------------------------
// ListLaneModel
// ---------------------------------------------------------------------------

/// The runtime half of a list lane: canonical storage, the current view
/// set, uplink bookkeeping, and the mutation entry points that construct
/// and drive relays.
///
/// The view set is an immutable sequence swapped on open/close, never
/// mutated in place — a relay iterating a captured snapshot is isolated
/// from concurrent view lifecycle.
pub struct ListLaneModel<V> {
    me: Weak<ListLaneModel<V>>,
    address: LaneAddress,
    form: Arc<dyn Form<Value = V>>,
    data: Mutex<Box<dyn ListData<V>>>,
    views: RwLock<Arc<[Arc<ListLaneView<V>>]>>,
    flags: AtomicU32,
    stage: Arc<dyn Stage>,
    schedule: Arc<dyn Schedule>,
    uplinks: DashMap<Uuid, Uplink>,
    commands: Mutex<VecDeque<CommandMessage>>,
    on_fail: RwLock<Option<FailFn>>,
}

impl<V: Clone + Send + Sync + 'static> ListLaneModel<V> {
    /// Create a lane model with fresh in-memory storage.
    pub fn new(
        address: LaneAddress,
        form: Arc<dyn Form<Value = V>>,
        stage: Arc<dyn Stage>,
        schedule: Arc<dyn Schedule>,
    ) -> Arc<Self> {
        Self::with_data(address, form, Box::new(MemoryListData::new()), stage, schedule)
    }

    /// Create a lane model over caller-supplied storage.
    pub fn with_data(
        address: LaneAddress,
        form: Arc<dyn Form<Value = V>>,
        data: Box<dyn ListData<V>>,
        stage: Arc<dyn Stage>,
        schedule: Arc<dyn Schedule>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            address,
            form,
            data: Mutex::new(data),
            views: RwLock::new(Arc::from(Vec::new())),
            flags: AtomicU32::new(0),
            stage,
            schedule,
            uplinks: DashMap::new(),
            commands: Mutex::new(VecDeque::new()),
            on_fail: RwLock::new(None),
        })
    }

    /// The lane's value form.
    pub fn form(&self) -> &Arc<dyn Form<Value = V>> {
        &self.form
    }

    /// The background execution stage suspended relays resume on.
    pub fn stage(&self) -> Arc<dyn Stage> {
        self.stage.clone()
    }

    /// The deferred-callback scheduler shared with the container.
    pub fn schedule(&self) -> Arc<dyn Schedule> {
        self.schedule.clone()
    }

    /// The current frozen view sequence.
    pub fn view_snapshot(&self) -> Arc<[Arc<ListLaneView<V>>]> {
        self.views.read().clone()
    }

    /// Run `f` against the underlying storage under the data lock.
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut dyn ListData<V>) -> R) -> R {
        let mut data = self.data.lock();
        f(data.as_mut())
    }

    /// Install the lane-level failure hook.
    pub fn on_fail(&self, hook: impl Fn(&LaneError) + Send + Sync + 'static) {
        *self.on_fail.write() = Some(Arc::new(hook));
    }

    /// Report a fatal lane failure; never attributed to a view.
    pub(crate) fn did_fail(&self, error: &LaneError) {
        log::error!("[ListLaneModel] lane failure on {}: {error}", self.address);
        let hook = self.on_fail.read().clone();
        if let Some(hook) = hook {
            hook(error);
        }
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    /// Whether lane state is kept resident in memory.
    pub fn is_resident(&self) -> bool {
        get_flag(&self.flags, RESIDENT)
    }

    /// Toggle residency lane-wide. Takes effect on the next constructed
    /// relay, never on one already running.
    pub fn set_resident(&self, resident: bool) {
        set_flag(&self.flags, RESIDENT, resident);
        for view in self.view_snapshot().iter() {
            view.did_set_resident(resident);
        }
    }

    /// Whether lane state skips persistence.
    pub fn is_transient(&self) -> bool {
        get_flag(&self.flags, TRANSIENT)
    }

    /// Toggle transience lane-wide.
    pub fn set_transient(&self, transient: bool) {
        set_flag(&self.flags, TRANSIENT, transient);
        for view in self.view_snapshot().iter() {
            view.did_set_transient(transient);
        }
    }

    /// Whether lane updates are signed.
    pub fn is_signed(&self) -> bool {
        get_flag(&self.flags, SIGNED)
    }

    /// Toggle signing lane-wide.
    pub fn set_signed(&self, signed: bool) {
        set_flag(&self.flags, SIGNED, signed);
        for view in self.view_snapshot().iter() {
            view.did_set_signed(signed);
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<V> {
        self.data.lock().get(index)
    }

    /// Entry (key + value) at `index`.
    pub fn get_entry(&self, index: usize) -> Option<ListEntry<V>> {
        self.data.lock().get_entry(index)
    }

    /// A point-in-time copy of all entries.
    pub fn snapshot(&self) -> Vec<ListEntry<V>> {
        self.data.lock().snapshot()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Insert `value` at `index`. Returns whether the size increased.
    pub fn add(
        self: &Arc<Self>,
        index: usize,
        value: V,
        key: Option<Uuid>,
    ) -> Result<bool, LaneError> {
        let len = self.data.lock().len();
        if index > len {
            return Err(LaneError::IndexOutOfBounds { index, len });
        }
        let relay = InsertRelay::new(self.clone(), index, value, key);
        RelayRun::new(relay, self.view_snapshot()).drive()?;
        Ok(true)
    }

    /// Replace the value at `index` (resolved through `key` when supplied),
    /// returning the prior value.
    pub fn set(
        self: &Arc<Self>,
        index: usize,
        value: V,
        key: Option<Uuid>,
    ) -> Result<V, LaneError> {
        let (resolved, prior) = {
            let data = self.data.lock();
            let resolved = data
                .resolve(index, key.as_ref())
                .ok_or(LaneError::IndexOutOfBounds {
                    index,
                    len: data.len(),
                })?;
            let prior = data
                .get(resolved)
                .ok_or_else(|| LaneError::invariant("resolved index out of range"))?;
            (resolved, prior)
        };
        let relay = UpdateRelay::new(self.clone(), resolved, value, key);
        RelayRun::new(relay, self.view_snapshot()).drive()?;
        Ok(prior)
    }

    /// Remove the entry at `index` (resolved through `key` when supplied),
    /// returning the prior value — or the form's unit value when nothing is
    /// there.
    pub fn remove(
        self: &Arc<Self>,
        index: usize,
        key: Option<Uuid>,
    ) -> Result<V, LaneError> {
        let located = {
            let data = self.data.lock();
            data.resolve(index, key.as_ref())
                .and_then(|resolved| data.get(resolved).map(|prior| (resolved, prior)))
        };
        let (resolved, prior) = match located {
            Some(found) => found,
            None => return Ok(self.form.unit()),
        };
        let relay = RemoveRelay::new(self.clone(), resolved, key);
        RelayRun::new(relay, self.view_snapshot()).drive()?;
        Ok(prior)
    }

    /// Move the entry at `from` (resolved through `key` when supplied) to
    /// `to`.
    pub fn move_entry(
        self: &Arc<Self>,
        from: usize,
        to: usize,
        key: Option<Uuid>,
    ) -> Result<(), LaneError> {
        let (resolved, value) = {
            let data = self.data.lock();
            let len = data.len();
            if to >= len {
                return Err(LaneError::IndexOutOfBounds { index: to, len });
            }
            let resolved = data
                .resolve(from, key.as_ref())
                .ok_or(LaneError::IndexOutOfBounds { index: from, len })?;
            let value = data
                .get(resolved)
                .ok_or_else(|| LaneError::invariant("resolved index out of range"))?;
            (resolved, value)
        };
        let relay = MoveRelay::new(self.clone(), resolved, to, key, value);
        RelayRun::new(relay, self.view_snapshot()).drive()?;
        Ok(())
    }

    /// Discard the first `lower` elements. Returns how many will be removed.
    pub fn drop_prefix(self: &Arc<Self>, lower: usize) -> Result<usize, LaneError> {
        let removed = lower.min(self.data.lock().len());
        if removed == 0 {
            return Ok(0);
        }
        let relay = DropRelay::new(self.clone(), lower);
        RelayRun::new(relay, self.view_snapshot()).drive()?;
        Ok(removed)
    }

    /// Keep the first `upper` elements, discarding the rest. Returns how
    /// many will be removed.
    pub fn take_prefix(self: &Arc<Self>, upper: usize) -> Result<usize, LaneError> {
        let removed = self.data.lock().len().saturating_sub(upper);
        if removed == 0 {
            return Ok(0);
        }
        let relay = TakeRelay::new(self.clone(), upper);
        RelayRun::new(relay, self.view_snapshot()).drive()?;
        Ok(removed)
    }

    /// Discard everything.
    pub fn clear(self: &Arc<Self>) -> Result<(), LaneError> {
        let relay = ClearRelay::new(self.clone());
        RelayRun::new(relay, self.view_snapshot()).drive()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Command intake
    // -----------------------------------------------------------------------

    /// Drain and apply every queued inbound command.
    ///
    /// Malformed bodies and stale indices are logged and skipped — remote
    /// garbage must not wedge the queue. Observer failures surface to the
    /// caller like any local mutation's would. Returns how many commands
    /// applied.
    pub fn apply_up_commands(self: &Arc<Self>) -> Result<usize, LaneError> {
        let drained: Vec<CommandMessage> = {
            let mut commands = self.commands.lock();
            commands.drain(..).collect()
        };
        let mut applied = 0;
        for message in drained {
            let command: ListCommand = match serde_json::from_value(message.body.clone()) {
                Ok(command) => command,
                Err(err) => {
                    log::warn!("[ListLaneModel] skipping malformed command: {err}");
                    continue;
                }
            };
            match self.apply_command(command) {
                Ok(()) => applied += 1,
                Err(LaneError::Codec { .. }) | Err(LaneError::IndexOutOfBounds { .. }) => {
                    log::warn!("[ListLaneModel] skipping inapplicable command");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(applied)
    }

    fn apply_command(self: &Arc<Self>, command: ListCommand) -> Result<(), LaneError> {
        match command {
            ListCommand::Insert { index, value, key } => {
                let value = self.form.cast(&value)?;
                self.add(index, value, key)?;
            }
            ListCommand::Update { index, value, key } => {
                let value = self.form.cast(&value)?;
                self.set(index, value, key)?;
            }
            ListCommand::Remove { index, key } => {
                self.remove(index, key)?;
            }
            ListCommand::Move { from, to, key } => {
                self.move_entry(from, to, key)?;
            }
            ListCommand::Drop { lower } => {
                self.drop_prefix(lower)?;
            }
            ListCommand::Take { upper } => {
                self.take_prefix(upper)?;
            }
            ListCommand::Clear => {
                self.clear()?;
            }
        }
        Ok(())
    }
}

/// Structural body of an inbound list command.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ListCommand {
    Insert {
        index: usize,
        value: serde_json::Value,
        #[serde(default)]
        key: Option<Uuid>,
    },
    Update {
        index: usize,
        value: serde_json::Value,
        #[serde(default)]
        key: Option<Uuid>,
    },
    Remove {
        index: usize,
        #[serde(default)]
        key: Option<Uuid>,
    },
    Move {
        from: usize,
        to: usize,
        #[serde(default)]
        key: Option<Uuid>,
    },
    Drop {
        lower: usize,
    },
    Take {
        upper: usize,
    },
    Clear,
}

impl<V: Clone + Send + Sync + 'static> LaneBinding for ListLaneModel<V> {
    type View = ListLaneView<V>;

    fn address(&self) -> &LaneAddress {
        &self.address
    }

    fn schedule(&self) -> Arc<dyn Schedule> {
        self.schedule.clone()
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.stage.clone()
    }

    fn lane_view(&self, agent: &AgentContext) -> Option<Arc<ListLaneView<V>>> {
        self.view_snapshot()
            .iter()
            .find(|view| view.agent().id == agent.id)
            .cloned()
    }

    fn open_lane_view(&self, view: Arc<ListLaneView<V>>) {
        let mut views = self.views.write();
        if views.iter().any(|open| Arc::ptr_eq(open, &view)) {
            return;
        }
        view.bind(self.me.clone());
        view.did_set_resident(self.is_resident());
        view.did_set_transient(self.is_transient());
        view.did_set_signed(self.is_signed());
        let mut next: Vec<Arc<ListLaneView<V>>> = views.iter().cloned().collect();
        next.push(view);
        *views = Arc::from(next);
        log::debug!(
            "[ListLaneModel] opened view on {} ({} open)",
            self.address,
            views.len()
        );
    }

    fn close_lane_view(&self, view: &Arc<ListLaneView<V>>) {
        let mut views = self.views.write();
        if !views.iter().any(|open| Arc::ptr_eq(open, view)) {
            return;
        }
        let next: Vec<Arc<ListLaneView<V>>> = views
            .iter()
            .filter(|open| !Arc::ptr_eq(open, view))
            .cloned()
            .collect();
        *views = Arc::from(next);
        view.unbind();
        log::debug!(
            "[ListLaneModel] closed view on {} ({} open)",
            self.address,
            views.len()
        );
    }

    fn uplinks(&self) -> Vec<Uplink> {
        self.uplinks.iter().map(|entry| entry.value().clone()).collect()
    }

    fn open_uplink(&self, uplink: Uplink) {
        log::debug!(
            "[ListLaneModel] opened uplink {} from {}",
            uplink.key,
            uplink.remote_node_uri
        );
        self.uplinks.insert(uplink.key, uplink);
    }

    fn close_uplink(&self, key: &Uuid) {
        if self.uplinks.remove(key).is_some() {
            log::debug!("[ListLaneModel] closed uplink {key}");
        }
    }

    fn push_up_command(&self, message: CommandMessage) {
        log::debug!(
            "[ListLaneModel] queued command for {}#{}",
            message.node_uri,
            message.lane_uri
        );
        self.commands.lock().push_back(message);
    }
}

// ---------------------------------------------------------------------------
// ListLaneView
// ---------------------------------------------------------------------------

/// The agent-facing handle onto a list lane.
///
/// Holds the value form, the lane flag bits, and the ordered observer
/// registrations. Exactly one model backs a view; mutations delegate to it.
pub struct ListLaneView<V> {
    agent: AgentContext,
    form: Arc<dyn Form<Value = V>>,
    flags: AtomicU32,
    observers: ObserverSet<ListObserver<V>>,
    on_fail: RwLock<Option<FailFn>>,
    binding: RwLock<Weak<ListLaneModel<V>>>,
}

impl<V: Clone + Send + Sync + 'static> ListLaneView<V> {
    /// Create a view for `agent` with the given value form.
    ///
    /// The view is inert until opened on a model via
    /// [`LaneBinding::open_lane_view`].
    pub fn new(agent: AgentContext, form: Arc<dyn Form<Value = V>>) -> Arc<Self> {
        Arc::new(Self {
            agent,
            form,
            flags: AtomicU32::new(0),
            observers: ObserverSet::new(),
            on_fail: RwLock::new(None),
            binding: RwLock::new(Weak::new()),
        })
    }

    /// The agent context this view belongs to.
    pub fn agent(&self) -> &AgentContext {
        &self.agent
    }

    /// The view's value form.
    pub fn form(&self) -> &Arc<dyn Form<Value = V>> {
        &self.form
    }

    pub(crate) fn bind(&self, model: Weak<ListLaneModel<V>>) {
        *self.binding.write() = model;
    }

    pub(crate) fn unbind(&self) {
        *self.binding.write() = Weak::new();
    }

    fn model(&self) -> Result<Arc<ListLaneModel<V>>, LaneError> {
        self.binding.read().upgrade().ok_or(LaneError::Unbound)
    }

    /// Close this view on its model. Closing twice is a no-op.
    pub fn close(self: &Arc<Self>) {
        // Drop the binding guard before delegating: close_lane_view unbinds
        // this view, which takes the write lock.
        let model = self.binding.read().upgrade();
        if let Some(model) = model {
            model.close_lane_view(self);
        }
    }

    // -----------------------------------------------------------------------
    // Observer registration
    // -----------------------------------------------------------------------

    /// Register an observer. `preemptive` declares whether its callback may
    /// run on the mutating caller's thread; non-preemptive observers force
    /// the relay onto the background stage before any observer for that
    /// operation fires.
    pub fn observe(&self, observer: ListObserver<V>, preemptive: bool) -> ObserverId {
        self.observers.observe(observer, preemptive)
    }

    /// Deregister an observer. Returns whether it was present.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        self.observers.unobserve(id)
    }

    /// Register a preemptive will-update observer.
    pub fn will_update(
        &self,
        f: impl Fn(usize, V) -> Result<V, LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::will_update(f), true)
    }

    /// Register a preemptive did-update observer.
    pub fn did_update(
        &self,
        f: impl Fn(usize, &V, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::did_update(f), true)
    }

    /// Register a preemptive will-move observer.
    pub fn will_move(
        &self,
        f: impl Fn(usize, usize, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::will_move(f), true)
    }

    /// Register a preemptive did-move observer.
    pub fn did_move(
        &self,
        f: impl Fn(usize, usize, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::did_move(f), true)
    }

    /// Register a preemptive will-remove observer.
    pub fn will_remove(
        &self,
        f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::will_remove(f), true)
    }

    /// Register a preemptive did-remove observer.
    pub fn did_remove(
        &self,
        f: impl Fn(usize, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::did_remove(f), true)
    }

    /// Register a preemptive will-drop observer.
    pub fn will_drop(
        &self,
        f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::will_drop(f), true)
    }

    /// Register a preemptive did-drop observer.
    pub fn did_drop(
        &self,
        f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::did_drop(f), true)
    }

    /// Register a preemptive will-take observer.
    pub fn will_take(
        &self,
        f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::will_take(f), true)
    }

    /// Register a preemptive did-take observer.
    pub fn did_take(
        &self,
        f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::did_take(f), true)
    }

    /// Register a preemptive will-clear observer.
    pub fn will_clear(
        &self,
        f: impl Fn() -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::will_clear(f), true)
    }

    /// Register a preemptive did-clear observer.
    pub fn did_clear(
        &self,
        f: impl Fn() -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(ListObserver::did_clear(f), true)
    }

    /// Install this view's failure hook, fired when one of its observers
    /// raises a recoverable error.
    pub fn on_fail(&self, hook: impl Fn(&LaneError) + Send + Sync + 'static) {
        *self.on_fail.write() = Some(Arc::new(hook));
    }

    pub(crate) fn lane_did_fail(&self, error: &LaneError) {
        log::warn!("[ListLaneView] observer failure: {error}");
        let hook = self.on_fail.read().clone();
        if let Some(hook) = hook {
            hook(error);
        }
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    /// Whether lane state is kept resident in memory.
    pub fn is_resident(&self) -> bool {
        get_flag(&self.flags, RESIDENT)
    }

    /// Toggle residency lane-wide through the model.
    pub fn set_resident(&self, resident: bool) {
        set_flag(&self.flags, RESIDENT, resident);
        let model = self.binding.read().upgrade();
        if let Some(model) = model {
            model.set_resident(resident);
        }
    }

    pub(crate) fn did_set_resident(&self, resident: bool) {
        set_flag(&self.flags, RESIDENT, resident);
    }

    /// Whether lane state skips persistence.
    pub fn is_transient(&self) -> bool {
        get_flag(&self.flags, TRANSIENT)
    }

    /// Toggle transience lane-wide through the model.
    pub fn set_transient(&self, transient: bool) {
        set_flag(&self.flags, TRANSIENT, transient);
        let model = self.binding.read().upgrade();
        if let Some(model) = model {
            model.set_transient(transient);
        }
    }

    pub(crate) fn did_set_transient(&self, transient: bool) {
        set_flag(&self.flags, TRANSIENT, transient);
    }

    /// Whether lane updates are signed.
    pub fn is_signed(&self) -> bool {
        get_flag(&self.flags, SIGNED)
    }

    /// Toggle signing lane-wide through the model.
    pub fn set_signed(&self, signed: bool) {
        set_flag(&self.flags, SIGNED, signed);
        let model = self.binding.read().upgrade();
        if let Some(model) = model {
            model.set_signed(signed);
        }
    }

    pub(crate) fn did_set_signed(&self, signed: bool) {
        set_flag(&self.flags, SIGNED, signed);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Number of stored elements.
    pub fn len(&self) -> Result<usize, LaneError> {
        Ok(self.model()?.len())
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> Result<bool, LaneError> {
        Ok(self.model()?.is_empty())
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Result<Option<V>, LaneError> {
        Ok(self.model()?.get(index))
    }

    /// Entry (key + value) at `index`.
    pub fn get_entry(&self, index: usize) -> Result<Option<ListEntry<V>>, LaneError> {
        Ok(self.model()?.get_entry(index))
    }

    /// A point-in-time copy of all entries.
    pub fn snapshot(&self) -> Result<Vec<ListEntry<V>>, LaneError> {
        Ok(self.model()?.snapshot())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Insert `value` at `index`. Returns whether the size increased.
    pub fn add(&self, index: usize, value: V) -> Result<bool, LaneError> {
        self.model()?.add(index, value, None)
    }

    /// Insert a keyed `value` at `index`.
    pub fn add_keyed(&self, index: usize, value: V, key: Uuid) -> Result<bool, LaneError> {
        self.model()?.add(index, value, Some(key))
    }

    /// Append `value` at the end of the sequence.
    pub fn push(&self, value: V) -> Result<bool, LaneError> {
        let model = self.model()?;
        let len = model.len();
        model.add(len, value, None)
    }

    /// Replace the value at `index`, returning the prior value.
    pub fn set(&self, index: usize, value: V) -> Result<V, LaneError> {
        self.model()?.set(index, value, None)
    }

    /// Replace the value at `index`, resolved through `key`.
    pub fn set_keyed(&self, index: usize, value: V, key: Uuid) -> Result<V, LaneError> {
        self.model()?.set(index, value, Some(key))
    }

    /// Remove the entry at `index`, returning the prior value or the form's
    /// unit value when nothing is there.
    pub fn remove(&self, index: usize) -> Result<V, LaneError> {
        self.model()?.remove(index, None)
    }

    /// Remove the entry at `index`, resolved through `key`.
    pub fn remove_keyed(&self, index: usize, key: Uuid) -> Result<V, LaneError> {
        self.model()?.remove(index, Some(key))
    }

    /// Move the entry at `from` to `to`.
    pub fn move_entry(&self, from: usize, to: usize) -> Result<(), LaneError> {
        self.model()?.move_entry(from, to, None)
    }

    /// Move the entry at `from` (resolved through `key`) to `to`.
    pub fn move_keyed(&self, from: usize, to: usize, key: Uuid) -> Result<(), LaneError> {
        self.model()?.move_entry(from, to, Some(key))
    }

    /// Discard the first `lower` elements.
    pub fn drop_prefix(&self, lower: usize) -> Result<usize, LaneError> {
        self.model()?.drop_prefix(lower)
    }

    /// Keep the first `upper` elements, discarding the rest.
    pub fn take_prefix(&self, upper: usize) -> Result<usize, LaneError> {
        self.model()?.take_prefix(upper)
    }

    /// Discard everything.
    pub fn clear(&self) -> Result<(), LaneError> {
        self.model()?.clear()
    }
}

impl<V: Clone + PartialEq + Send + Sync + 'static> ListLaneView<V> {
    /// Whether `value` is present in the sequence.
    pub fn contains(&self, value: &V) -> Result<bool, LaneError> {
        Ok(self.index_of(value)?.is_some())
    }

    /// Position of the first occurrence of `value`.
    pub fn index_of(&self, value: &V) -> Result<Option<usize>, LaneError> {
        let snapshot = self.model()?.snapshot();
        Ok(snapshot.iter().position(|entry| entry.value == *value))
    }

    /// Append every value in order. Returns whether anything was added.
    ///
    /// Defined as repeated single-element inserts; failure semantics are the
    /// single-element operation's.
    pub fn add_all(&self, values: impl IntoIterator<Item = V>) -> Result<bool, LaneError> {
        let mut added = false;
        for value in values {
            added |= self.push(value)?;
        }
        Ok(added)
    }

    /// Remove the first occurrence of each value. Returns whether anything
    /// was removed.
    pub fn remove_all(&self, values: &[V]) -> Result<bool, LaneError> {
        let mut removed = false;
        for value in values {
            if let Some(index) = self.index_of(value)? {
                self.remove(index)?;
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Retain only elements present in `values`, removing the rest. Returns
    /// whether anything was removed.
    pub fn retain_all(&self, values: &[V]) -> Result<bool, LaneError> {
        let mut modified = false;
        loop {
            let snapshot = self.snapshot()?;
            let victim = snapshot
                .iter()
                .position(|entry| !values.contains(&entry.value));
            match victim {
                Some(index) => {
                    self.remove(index)?;
                    modified = true;
                }
                None => return Ok(modified),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Observer dispatch (driven by the relay types)
// ---------------------------------------------------------------------------

impl<V: Clone + Send + Sync + 'static> ListLaneView<V> {
    /// Run the matching observers for one (operation, will/did) capability.
    ///
    /// On a preemptive pass, the presence of any non-preemptive observer for
    /// the capability reports the step incomplete without running anything,
    /// so that after the stage hand-off every observer fires exactly once in
    /// registration order.
    fn dispatch(
        &self,
        op: ListOp,
        will: bool,
        preemptive: bool,
        mut invoke: impl FnMut(&ListObserver<V>) -> Result<(), LaneError>,
    ) -> Result<Step, LaneError> {
        let entries = self.observers.snapshot();
        if preemptive
            && entries.iter().any(|entry| {
                !entry.preemptive
                    && entry.observer.op() == op
                    && entry.observer.is_will() == will
            })
        {
            return Ok(Step::Incomplete);
        }
        for entry in entries.iter() {
            if entry.observer.op() == op && entry.observer.is_will() == will {
                invoke(&entry.observer)?;
            }
        }
        Ok(Step::Complete)
    }

    pub(crate) fn dispatch_will_update(
        &self,
        index: usize,
        mut value: V,
        preemptive: bool,
    ) -> Result<(Step, V), LaneError> {
        let entries = self.observers.snapshot();
        if preemptive
            && entries.iter().any(|entry| {
                !entry.preemptive && matches!(entry.observer, ListObserver::WillUpdate(_))
            })
        {
            return Ok((Step::Incomplete, value));
        }
        for entry in entries.iter() {
            if let ListObserver::WillUpdate(f) = &entry.observer {
                value = f(index, value)?;
            }
        }
        Ok((Step::Complete, value))
    }

    pub(crate) fn dispatch_did_update(
        &self,
        index: usize,
        new_value: &V,
        old_value: &V,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Update, false, preemptive, |observer| {
            match observer {
                ListObserver::DidUpdate(f) => f(index, new_value, old_value),
                _ => Ok(()),
            }
        })
    }

    pub(crate) fn dispatch_will_move(
        &self,
        from: usize,
        to: usize,
        value: &V,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Move, true, preemptive, |observer| match observer {
            ListObserver::WillMove(f) => f(from, to, value),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_did_move(
        &self,
        from: usize,
        to: usize,
        value: &V,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Move, false, preemptive, |observer| match observer {
            ListObserver::DidMove(f) => f(from, to, value),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_will_remove(
        &self,
        index: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Remove, true, preemptive, |observer| match observer {
            ListObserver::WillRemove(f) => f(index),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_did_remove(
        &self,
        index: usize,
        old_value: &V,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Remove, false, preemptive, |observer| match observer {
            ListObserver::DidRemove(f) => f(index, old_value),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_will_drop(
        &self,
        lower: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Drop, true, preemptive, |observer| match observer {
            ListObserver::WillDrop(f) => f(lower),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_did_drop(
        &self,
        lower: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Drop, false, preemptive, |observer| match observer {
            ListObserver::DidDrop(f) => f(lower),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_will_take(
        &self,
        upper: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Take, true, preemptive, |observer| match observer {
            ListObserver::WillTake(f) => f(upper),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_did_take(
        &self,
        upper: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Take, false, preemptive, |observer| match observer {
            ListObserver::DidTake(f) => f(upper),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_will_clear(&self, preemptive: bool) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Clear, true, preemptive, |observer| match observer {
            ListObserver::WillClear(f) => f(),
            _ => Ok(()),
        })
    }

    pub(crate) fn dispatch_did_clear(&self, preemptive: bool) -> Result<Step, LaneError> {
        self.dispatch(ListOp::Clear, false, preemptive, |observer| match observer {
            ListObserver::DidClear(f) => f(),
            _ => Ok(()),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
