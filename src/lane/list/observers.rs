//! Observer callbacks for list lane mutations.
//!
//! The callback surface is closed and known at design time, so it is a
//! tagged enum rather than an open trait: one will/did pair per mutation
//! kind. Observers registered for other kinds are skipped, not errors.
//!
//! Will-callbacks run before the mutation commits; a will-update may
//! transform the incoming value, and any will-callback may veto the mutation
//! by returning an error. Did-callbacks observe the committed change.

use std::sync::Arc;

use crate::error::LaneError;

/// Transforms (or vetoes) the value about to be written at an index.
pub type WillUpdateFn<V> = Arc<dyn Fn(usize, V) -> Result<V, LaneError> + Send + Sync>;
/// Observes a committed write: `(index, new_value, old_value)`.
pub type DidUpdateFn<V> = Arc<dyn Fn(usize, &V, &V) -> Result<(), LaneError> + Send + Sync>;
/// Observes an impending move: `(from, to, value)`.
pub type WillMoveFn<V> = Arc<dyn Fn(usize, usize, &V) -> Result<(), LaneError> + Send + Sync>;
/// Observes a committed move: `(from, to, value)`.
pub type DidMoveFn<V> = Arc<dyn Fn(usize, usize, &V) -> Result<(), LaneError> + Send + Sync>;
/// Observes an impending removal at an index.
pub type WillRemoveFn = Arc<dyn Fn(usize) -> Result<(), LaneError> + Send + Sync>;
/// Observes a committed removal: `(index, old_value)`.
pub type DidRemoveFn<V> = Arc<dyn Fn(usize, &V) -> Result<(), LaneError> + Send + Sync>;
/// Observes an impending or committed prefix drop of `lower` elements.
pub type DropFn = Arc<dyn Fn(usize) -> Result<(), LaneError> + Send + Sync>;
/// Observes an impending or committed truncation to `upper` elements.
pub type TakeFn = Arc<dyn Fn(usize) -> Result<(), LaneError> + Send + Sync>;
/// Observes an impending or committed clear.
pub type ClearFn = Arc<dyn Fn() -> Result<(), LaneError> + Send + Sync>;

/// Which mutation kind an observer is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListOp {
    Update,
    Move,
    Remove,
    Drop,
    Take,
    Clear,
}

/// One list lane observer callback.
pub enum ListObserver<V> {
    /// Will-update (also fired for inserts, with the unit value as prior).
    WillUpdate(WillUpdateFn<V>),
    /// Did-update (also fired for inserts, with the unit value as prior).
    DidUpdate(DidUpdateFn<V>),
    /// Will-move.
    WillMove(WillMoveFn<V>),
    /// Did-move.
    DidMove(DidMoveFn<V>),
    /// Will-remove.
    WillRemove(WillRemoveFn),
    /// Did-remove.
    DidRemove(DidRemoveFn<V>),
    /// Will-drop.
    WillDrop(DropFn),
    /// Did-drop.
    DidDrop(DropFn),
    /// Will-take.
    WillTake(TakeFn),
    /// Did-take.
    DidTake(TakeFn),
    /// Will-clear.
    WillClear(ClearFn),
    /// Did-clear.
    DidClear(ClearFn),
}

impl<V> Clone for ListObserver<V> {
    fn clone(&self) -> Self {
        match self {
            ListObserver::WillUpdate(f) => ListObserver::WillUpdate(f.clone()),
            ListObserver::DidUpdate(f) => ListObserver::DidUpdate(f.clone()),
            ListObserver::WillMove(f) => ListObserver::WillMove(f.clone()),
            ListObserver::DidMove(f) => ListObserver::DidMove(f.clone()),
            ListObserver::WillRemove(f) => ListObserver::WillRemove(f.clone()),
            ListObserver::DidRemove(f) => ListObserver::DidRemove(f.clone()),
            ListObserver::WillDrop(f) => ListObserver::WillDrop(f.clone()),
            ListObserver::DidDrop(f) => ListObserver::DidDrop(f.clone()),
            ListObserver::WillTake(f) => ListObserver::WillTake(f.clone()),
            ListObserver::DidTake(f) => ListObserver::DidTake(f.clone()),
            ListObserver::WillClear(f) => ListObserver::WillClear(f.clone()),
            ListObserver::DidClear(f) => ListObserver::DidClear(f.clone()),
        }
    }
}

impl<V> ListObserver<V> {
    /// Wrap a will-update callback.
    pub fn will_update(
        f: impl Fn(usize, V) -> Result<V, LaneError> + Send + Sync + 'static,
    ) -> Self {
        ListObserver::WillUpdate(Arc::new(f))
    }

    /// Wrap a did-update callback.
    pub fn did_update(
        f: impl Fn(usize, &V, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> Self {
        ListObserver::DidUpdate(Arc::new(f))
    }

    /// Wrap a will-move callback.
    pub fn will_move(
        f: impl Fn(usize, usize, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> Self {
        ListObserver::WillMove(Arc::new(f))
    }

    /// Wrap a did-move callback.
    pub fn did_move(
        f: impl Fn(usize, usize, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> Self {
        ListObserver::DidMove(Arc::new(f))
    }

    /// Wrap a will-remove callback.
    pub fn will_remove(
        f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> Self {
        ListObserver::WillRemove(Arc::new(f))
    }

    /// Wrap a did-remove callback.
    pub fn did_remove(
        f: impl Fn(usize, &V) -> Result<(), LaneError> + Send + Sync + 'static,
    ) -> Self {
        ListObserver::DidRemove(Arc::new(f))
    }

    /// Wrap a will-drop callback.
    pub fn will_drop(f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static) -> Self {
        ListObserver::WillDrop(Arc::new(f))
    }

    /// Wrap a did-drop callback.
    pub fn did_drop(f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static) -> Self {
        ListObserver::DidDrop(Arc::new(f))
    }

    /// Wrap a will-take callback.
    pub fn will_take(f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static) -> Self {
        ListObserver::WillTake(Arc::new(f))
    }

    /// Wrap a did-take callback.
    pub fn did_take(f: impl Fn(usize) -> Result<(), LaneError> + Send + Sync + 'static) -> Self {
        ListObserver::DidTake(Arc::new(f))
    }

    /// Wrap a will-clear callback.
    pub fn will_clear(f: impl Fn() -> Result<(), LaneError> + Send + Sync + 'static) -> Self {
        ListObserver::WillClear(Arc::new(f))
    }

    /// Wrap a did-clear callback.
    pub fn did_clear(f: impl Fn() -> Result<(), LaneError> + Send + Sync + 'static) -> Self {
        ListObserver::DidClear(Arc::new(f))
    }

    pub(crate) fn op(&self) -> ListOp {
        match self {
            ListObserver::WillUpdate(_) | ListObserver::DidUpdate(_) => ListOp::Update,
            ListObserver::WillMove(_) | ListObserver::DidMove(_) => ListOp::Move,
            ListObserver::WillRemove(_) | ListObserver::DidRemove(_) => ListOp::Remove,
            ListObserver::WillDrop(_) | ListObserver::DidDrop(_) => ListOp::Drop,
            ListObserver::WillTake(_) | ListObserver::DidTake(_) => ListOp::Take,
            ListObserver::WillClear(_) | ListObserver::DidClear(_) => ListOp::Clear,
        }
    }

    pub(crate) fn is_will(&self) -> bool {
        matches!(
            self,
            ListObserver::WillUpdate(_)
                | ListObserver::WillMove(_)
                | ListObserver::WillRemove(_)
                | ListObserver::WillDrop(_)
                | ListObserver::WillTake(_)
                | ListObserver::WillClear(_)
        )
    }
}
