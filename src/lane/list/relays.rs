//! Relay types for list lane mutations.
//!
//! One relay per structural mutation, each a two-phase protocol: phase 0
//! dispatches the "will" observers, the phase-1 begin transition applies the
//! change to storage, and the phase-1 per-view steps dispatch the "did"
//! observers. Inserts dispatch the update observer pair, with the form's
//! unit value standing in for the nonexistent prior value.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::LaneError;
use crate::relay::{Relay, Step};
use crate::stage::Stage;

use super::{ListLaneModel, ListLaneView};

/// Inserts a value at an index.
pub(crate) struct InsertRelay<V> {
    model: Arc<ListLaneModel<V>>,
    index: usize,
    key: Option<Uuid>,
    value: V,
    unit: V,
}

impl<V: Clone + Send + Sync + 'static> InsertRelay<V> {
    pub(crate) fn new(
        model: Arc<ListLaneModel<V>>,
        index: usize,
        value: V,
        key: Option<Uuid>,
    ) -> Self {
        let unit = model.form().unit();
        Self {
            model,
            index,
            key,
            value,
            unit,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay for InsertRelay<V> {
    type View = ListLaneView<V>;

    fn phase_count(&self) -> usize {
        2
    }

    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        if phase == 1 {
            let index = self.index;
            let value = self.value.clone();
            let key = self.key;
            self.model.with_store(|data| data.insert(index, value, key));
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        view: &ListLaneView<V>,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        match phase {
            0 => {
                let (step, value) =
                    view.dispatch_will_update(self.index, self.value.clone(), preemptive)?;
                if step == Step::Complete {
                    self.value = value;
                }
                Ok(step)
            }
            _ => view.dispatch_did_update(self.index, &self.value, &self.unit, preemptive),
        }
    }

    fn view_failed(&self, view: &ListLaneView<V>, error: &LaneError) {
        view.lane_did_fail(error);
    }

    fn relay_failed(&self, error: &LaneError) {
        self.model.did_fail(error);
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.model.stage()
    }
}

/// Replaces the value at an index.
pub(crate) struct UpdateRelay<V> {
    model: Arc<ListLaneModel<V>>,
    index: usize,
    key: Option<Uuid>,
    value: V,
    old: Option<V>,
    unit: V,
}

impl<V: Clone + Send + Sync + 'static> UpdateRelay<V> {
    pub(crate) fn new(
        model: Arc<ListLaneModel<V>>,
        index: usize,
        value: V,
        key: Option<Uuid>,
    ) -> Self {
        let unit = model.form().unit();
        Self {
            model,
            index,
            key,
            value,
            old: None,
            unit,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay for UpdateRelay<V> {
    type View = ListLaneView<V>;

    fn phase_count(&self) -> usize {
        2
    }

    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        if phase == 1 {
            let index = self.index;
            let value = self.value.clone();
            let key = self.key;
            self.old = self.model.with_store(|data| data.set(index, value, key));
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        view: &ListLaneView<V>,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        match phase {
            0 => {
                let (step, value) =
                    view.dispatch_will_update(self.index, self.value.clone(), preemptive)?;
                if step == Step::Complete {
                    self.value = value;
                }
                Ok(step)
            }
            _ => {
                let old = self.old.as_ref().unwrap_or(&self.unit);
                view.dispatch_did_update(self.index, &self.value, old, preemptive)
            }
        }
    }

    fn view_failed(&self, view: &ListLaneView<V>, error: &LaneError) {
        view.lane_did_fail(error);
    }

    fn relay_failed(&self, error: &LaneError) {
        self.model.did_fail(error);
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.model.stage()
    }
}

/// Removes the entry at an index.
pub(crate) struct RemoveRelay<V> {
    model: Arc<ListLaneModel<V>>,
    index: usize,
    key: Option<Uuid>,
    old: Option<V>,
    unit: V,
}

impl<V: Clone + Send + Sync + 'static> RemoveRelay<V> {
    pub(crate) fn new(model: Arc<ListLaneModel<V>>, index: usize, key: Option<Uuid>) -> Self {
        let unit = model.form().unit();
        Self {
            model,
            index,
            key,
            old: None,
            unit,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay for RemoveRelay<V> {
    type View = ListLaneView<V>;

    fn phase_count(&self) -> usize {
        2
    }

    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        if phase == 1 {
            let index = self.index;
            let key = self.key;
            self.old = self.model.with_store(|data| data.remove(index, key));
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        view: &ListLaneView<V>,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        match phase {
            0 => view.dispatch_will_remove(self.index, preemptive),
            _ => {
                let old = self.old.as_ref().unwrap_or(&self.unit);
                view.dispatch_did_remove(self.index, old, preemptive)
            }
        }
    }

    fn view_failed(&self, view: &ListLaneView<V>, error: &LaneError) {
        view.lane_did_fail(error);
    }

    fn relay_failed(&self, error: &LaneError) {
        self.model.did_fail(error);
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.model.stage()
    }
}

/// Moves the entry at one index to another.
pub(crate) struct MoveRelay<V> {
    model: Arc<ListLaneModel<V>>,
    from: usize,
    to: usize,
    key: Option<Uuid>,
    value: V,
}

impl<V: Clone + Send + Sync + 'static> MoveRelay<V> {
    pub(crate) fn new(
        model: Arc<ListLaneModel<V>>,
        from: usize,
        to: usize,
        key: Option<Uuid>,
        value: V,
    ) -> Self {
        Self {
            model,
            from,
            to,
            key,
            value,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay for MoveRelay<V> {
    type View = ListLaneView<V>;

    fn phase_count(&self) -> usize {
        2
    }

    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        if phase == 1 {
            let from = self.from;
            let to = self.to;
            let key = self.key;
            self.model.with_store(|data| data.move_entry(from, to, key));
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        view: &ListLaneView<V>,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        match phase {
            0 => view.dispatch_will_move(self.from, self.to, &self.value, preemptive),
            _ => view.dispatch_did_move(self.from, self.to, &self.value, preemptive),
        }
    }

    fn view_failed(&self, view: &ListLaneView<V>, error: &LaneError) {
        view.lane_did_fail(error);
    }

    fn relay_failed(&self, error: &LaneError) {
        self.model.did_fail(error);
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.model.stage()
    }
}

/// Discards a prefix of the sequence.
pub(crate) struct DropRelay<V> {
    model: Arc<ListLaneModel<V>>,
    lower: usize,
}

impl<V: Clone + Send + Sync + 'static> DropRelay<V> {
    pub(crate) fn new(model: Arc<ListLaneModel<V>>, lower: usize) -> Self {
        Self { model, lower }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay for DropRelay<V> {
    type View = ListLaneView<V>;

    fn phase_count(&self) -> usize {
        2
    }

    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        if phase == 1 {
            let lower = self.lower;
            self.model.with_store(|data| data.drop_prefix(lower));
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        view: &ListLaneView<V>,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        match phase {
            0 => view.dispatch_will_drop(self.lower, preemptive),
            _ => view.dispatch_did_drop(self.lower, preemptive),
        }
    }

    fn view_failed(&self, view: &ListLaneView<V>, error: &LaneError) {
        view.lane_did_fail(error);
    }

    fn relay_failed(&self, error: &LaneError) {
        self.model.did_fail(error);
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.model.stage()
    }
}

/// Truncates the sequence beyond an upper bound.
pub(crate) struct TakeRelay<V> {
    model: Arc<ListLaneModel<V>>,
    upper: usize,
}

impl<V: Clone + Send + Sync + 'static> TakeRelay<V> {
    pub(crate) fn new(model: Arc<ListLaneModel<V>>, upper: usize) -> Self {
        Self { model, upper }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay for TakeRelay<V> {
    type View = ListLaneView<V>;

    fn phase_count(&self) -> usize {
        2
    }

    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        if phase == 1 {
            let upper = self.upper;
            self.model.with_store(|data| data.take_prefix(upper));
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        view: &ListLaneView<V>,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        match phase {
            0 => view.dispatch_will_take(self.upper, preemptive),
            _ => view.dispatch_did_take(self.upper, preemptive),
        }
    }

    fn view_failed(&self, view: &ListLaneView<V>, error: &LaneError) {
        view.lane_did_fail(error);
    }

    fn relay_failed(&self, error: &LaneError) {
        self.model.did_fail(error);
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.model.stage()
    }
}

/// Discards the whole sequence.
pub(crate) struct ClearRelay<V> {
    model: Arc<ListLaneModel<V>>,
}

impl<V: Clone + Send + Sync + 'static> ClearRelay<V> {
    pub(crate) fn new(model: Arc<ListLaneModel<V>>) -> Self {
        Self { model }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay for ClearRelay<V> {
    type View = ListLaneView<V>;

    fn phase_count(&self) -> usize {
        2
    }

    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        if phase == 1 {
            self.model.with_store(|data| data.clear());
        }
        Ok(())
    }

    fn run_phase(
        &mut self,
        view: &ListLaneView<V>,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError> {
        match phase {
            0 => view.dispatch_will_clear(preemptive),
            _ => view.dispatch_did_clear(preemptive),
        }
    }

    fn view_failed(&self, view: &ListLaneView<V>, error: &LaneError) {
        view.lane_did_fail(error);
    }

    fn relay_failed(&self, error: &LaneError) {
        self.model.did_fail(error);
    }

    fn stage(&self) -> Arc<dyn Stage> {
        self.model.stage()
    }
}
