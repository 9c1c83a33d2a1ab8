//! The phased relay engine.
//!
//! A relay fans one state-changing operation out to an ordered snapshot of
//! lane views across N semantic phases. [`RelayRun`] drives the protocol:
//! begin-phase once per phase, one per-view step per (phase, view) pair in
//! snapshot order, end-phase once per phase, terminal completion exactly
//! once. A step may decline to complete on a preemptive pass, in which case
//! the run suspends and resumes on the background stage — at most once per
//! relay instance.
//!
//! The resumable state is an explicit [`RelayCursor`] value owned by the run;
//! suspension moves the whole run into the queued stage task, so no mutable
//! state is shared across the suspend boundary.

use std::sync::Arc;

use crate::error::LaneError;
use crate::stage::Stage;

/// Outcome of one per-view step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The step ran to completion for this view.
    Complete,
    /// The step could not complete without leaving the caller's thread.
    ///
    /// Only meaningful on a preemptive pass; in non-preemptive mode the
    /// engine treats the step as having made progress synchronously.
    Incomplete,
}

/// How a call to [`RelayRun::drive`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The relay ran all phases to terminal completion synchronously.
    Done,
    /// The relay handed itself off to the stage and will finish there.
    Suspended,
}

/// The relay's resumable position: current phase, current view within the
/// phase, and whether steps may still decline to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCursor {
    /// Current phase, in `0..=phase_count`.
    pub phase: usize,
    /// Index of the next view to step within the current phase.
    pub view_index: usize,
    /// Whether the next step runs preemptively.
    pub preemptive: bool,
}

impl RelayCursor {
    fn start() -> Self {
        Self {
            phase: 0,
            view_index: 0,
            preemptive: true,
        }
    }
}

/// One mutation's phase protocol.
///
/// A relay is constructed per mutation with a fixed phase count and fixed
/// per-phase behavior; the engine owns the iteration. All methods take
/// `&mut self` — the engine serializes every call.
pub trait Relay: Send + 'static {
    /// The view type the relay dispatches against.
    type View: Send + Sync + 'static;

    /// Total number of phases.
    fn phase_count(&self) -> usize;

    /// Phase-wide setup, invoked once when `phase` is entered, before any
    /// view is stepped. The apply-to-storage commit of a mutation belongs
    /// here.
    fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        let _ = phase;
        Ok(())
    }

    /// One view's step for `phase`.
    fn run_phase(
        &mut self,
        view: &Self::View,
        phase: usize,
        preemptive: bool,
    ) -> Result<Step, LaneError>;

    /// Phase-wide teardown, invoked once when all views completed `phase`.
    fn end_phase(&mut self, phase: usize) -> Result<(), LaneError> {
        let _ = phase;
        Ok(())
    }

    /// Terminal completion, invoked exactly once after the final phase.
    fn done(&mut self) {}

    /// Failure hook for a recoverable error raised by `view`'s step.
    fn view_failed(&self, view: &Self::View, error: &LaneError) {
        let _ = (view, error);
    }

    /// Failure hook for a fatal error, never attributed to a view.
    fn relay_failed(&self, error: &LaneError) {
        let _ = error;
    }

    /// The stage a suspended run resumes on. Consulted only at the first
    /// suspension.
    fn stage(&self) -> Arc<dyn Stage>;
}

/// One run of the phased dispatch protocol for a single mutation against a
/// frozen snapshot of a lane's views.
pub struct RelayRun<R: Relay> {
    relay: R,
    views: Arc<[Arc<R::View>]>,
    cursor: RelayCursor,
    staged: bool,
}

impl<R: Relay> RelayRun<R> {
    /// Bind a relay to the view snapshot it will dispatch against.
    ///
    /// The snapshot is frozen for the run's lifetime; concurrent view
    /// open/close on the lane swaps in a new sequence and never touches
    /// this one.
    pub fn new(relay: R, views: Arc<[Arc<R::View>]>) -> Self {
        Self {
            relay,
            views,
            cursor: RelayCursor::start(),
            staged: false,
        }
    }

    /// Drive the relay until terminal completion or its first suspension.
    ///
    /// On a recoverable step error the offending view's failure hook has
    /// already fired; on a fatal error the lane-level hook has. Either way
    /// the error is surfaced to the caller and the relay is dead.
    pub fn drive(mut self) -> Result<RelayOutcome, LaneError> {
        if self.relay.phase_count() > 0 {
            self.relay
                .begin_phase(0)
                .map_err(|error| self.route_lane_failure(error))?;
        }
        self.advance()
    }

    /// Step the protocol from the current cursor.
    fn advance(mut self) -> Result<RelayOutcome, LaneError> {
        loop {
            if self.cursor.phase >= self.relay.phase_count() {
                self.relay.done();
                return Ok(RelayOutcome::Done);
            }
            if self.cursor.view_index < self.views.len() {
                let view = self.views[self.cursor.view_index].clone();
                let step = self
                    .relay
                    .run_phase(&view, self.cursor.phase, self.cursor.preemptive)
                    .map_err(|error| self.route_failure(&view, error))?;
                match step {
                    Step::Complete => {
                        self.cursor.view_index += 1;
                    }
                    Step::Incomplete if self.cursor.preemptive => {
                        self.cursor.preemptive = false;
                        if self.staged {
                            // Already on the stage: retry the same view
                            // synchronously.
                            continue;
                        }
                        return Ok(self.suspend());
                    }
                    Step::Incomplete => {
                        // Non-preemptive steps make progress in place; their
                        // reported outcome no longer gates advancement.
                        self.cursor.view_index += 1;
                    }
                }
            } else {
                self.relay
                    .end_phase(self.cursor.phase)
                    .map_err(|error| self.route_lane_failure(error))?;
                self.cursor.phase += 1;
                self.cursor.view_index = 0;
                self.cursor.preemptive = true;
                if self.cursor.phase < self.relay.phase_count() {
                    self.relay
                        .begin_phase(self.cursor.phase)
                        .map_err(|error| self.route_lane_failure(error))?;
                }
            }
        }
    }

    /// Hand the run off to the stage, exactly once per relay instance.
    fn suspend(mut self) -> RelayOutcome {
        self.staged = true;
        let stage = self.relay.stage();
        log::debug!(
            "[RelayRun] suspending at phase {} view {}",
            self.cursor.phase,
            self.cursor.view_index
        );
        stage.execute(Box::new(move || {
            if let Err(error) = self.advance() {
                log::warn!("[RelayRun] staged continuation failed: {error}");
            }
        }));
        RelayOutcome::Suspended
    }

    /// Route a per-view step error to the right failure hook.
    fn route_failure(&self, view: &Arc<R::View>, error: LaneError) -> LaneError {
        if error.is_fatal() {
            log::error!("[RelayRun] fatal relay failure: {error}");
            self.relay.relay_failed(&error);
        } else {
            log::warn!("[RelayRun] view step failed: {error}");
            self.relay.view_failed(view, &error);
        }
        error
    }

    /// Route a phase-transition error; never attributed to a view.
    fn route_lane_failure(&self, error: LaneError) -> LaneError {
        log::error!("[RelayRun] phase transition failed: {error}");
        self.relay.relay_failed(&error);
        error
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// A stage that queues tasks for manual, deterministic execution.
    struct QueueStage {
        tasks: Mutex<Vec<crate::stage::Task>>,
    }

    impl QueueStage {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                tasks: Mutex::new(Vec::new()),
            })
        }

        fn run_all(&self) -> usize {
            let mut count = 0;
            loop {
                let task = self.tasks.lock().pop();
                match task {
                    Some(task) => {
                        task();
                        count += 1;
                    }
                    None => return count,
                }
            }
        }

        fn pending(&self) -> usize {
            self.tasks.lock().len()
        }
    }

    impl Stage for QueueStage {
        fn execute(&self, task: crate::stage::Task) {
            self.tasks.lock().push(task);
        }
    }

    /// Call-journal events recorded by the scripted relay.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Begin(usize),
        Run { view: u32, phase: usize },
        End(usize),
        Done,
        ViewFailed(u32),
        RelayFailed,
    }

    #[derive(Default)]
    struct Script {
        /// `(view, phase)` pairs that report incomplete on a preemptive pass.
        decline_preemptive: Vec<(u32, usize)>,
        /// `(view, phase)` pair that raises an error, with its error.
        fail_at: Option<(u32, usize, LaneError)>,
    }

    struct ScriptedRelay {
        phases: usize,
        script: Script,
        journal: Arc<Mutex<Vec<Event>>>,
        stage: Arc<QueueStage>,
    }

    impl Relay for ScriptedRelay {
        type View = u32;

        fn phase_count(&self) -> usize {
            self.phases
        }

        fn begin_phase(&mut self, phase: usize) -> Result<(), LaneError> {
            self.journal.lock().push(Event::Begin(phase));
            Ok(())
        }

        fn run_phase(
            &mut self,
            view: &u32,
            phase: usize,
            preemptive: bool,
        ) -> Result<Step, LaneError> {
            if let Some((v, p, error)) = &self.script.fail_at {
                if *v == *view && *p == phase {
                    return Err(error.clone());
                }
            }
            if preemptive && self.script.decline_preemptive.contains(&(*view, phase)) {
                return Ok(Step::Incomplete);
            }
            self.journal.lock().push(Event::Run {
                view: *view,
                phase,
            });
            Ok(Step::Complete)
        }

        fn end_phase(&mut self, phase: usize) -> Result<(), LaneError> {
            self.journal.lock().push(Event::End(phase));
            Ok(())
        }

        fn done(&mut self) {
            self.journal.lock().push(Event::Done);
        }

        fn view_failed(&self, view: &u32, _error: &LaneError) {
            self.journal.lock().push(Event::ViewFailed(*view));
        }

        fn relay_failed(&self, _error: &LaneError) {
            self.journal.lock().push(Event::RelayFailed);
        }

        fn stage(&self) -> Arc<dyn Stage> {
            self.stage.clone()
        }
    }

    fn views(n: u32) -> Arc<[Arc<u32>]> {
        let views: Vec<Arc<u32>> = (0..n).map(Arc::new).collect();
        Arc::from(views)
    }

    fn run_scripted(
        phases: usize,
        view_count: u32,
        script: Script,
    ) -> (
        Result<RelayOutcome, LaneError>,
        Arc<Mutex<Vec<Event>>>,
        Arc<QueueStage>,
    ) {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let stage = QueueStage::new();
        let relay = ScriptedRelay {
            phases,
            script,
            journal: journal.clone(),
            stage: stage.clone(),
        };
        let outcome = RelayRun::new(relay, views(view_count)).drive();
        (outcome, journal, stage)
    }

    fn expected_clean(phases: usize, view_count: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for phase in 0..phases {
            events.push(Event::Begin(phase));
            for view in 0..view_count {
                events.push(Event::Run { view, phase });
            }
            events.push(Event::End(phase));
        }
        events.push(Event::Done);
        events
    }

    #[test]
    fn test_protocol_order_across_cardinalities() {
        for phases in 1..=3usize {
            for view_count in [0u32, 1, 3] {
                let (outcome, journal, stage) =
                    run_scripted(phases, view_count, Script::default());
                assert_eq!(outcome.unwrap(), RelayOutcome::Done);
                assert_eq!(stage.pending(), 0);
                assert_eq!(*journal.lock(), expected_clean(phases, view_count));
            }
        }
    }

    #[test]
    fn test_zero_views_runs_phase_bookkeeping_only() {
        let (outcome, journal, _) = run_scripted(2, 0, Script::default());
        assert_eq!(outcome.unwrap(), RelayOutcome::Done);
        assert_eq!(
            *journal.lock(),
            vec![
                Event::Begin(0),
                Event::End(0),
                Event::Begin(1),
                Event::End(1),
                Event::Done
            ]
        );
    }

    #[test]
    fn test_single_suspension_preserves_call_sequence() {
        let script = Script {
            decline_preemptive: vec![(1, 0)],
            fail_at: None,
        };
        let (outcome, journal, stage) = run_scripted(2, 3, script);
        assert_eq!(outcome.unwrap(), RelayOutcome::Suspended);
        // Only view 0 ran before the hand-off.
        assert_eq!(
            *journal.lock(),
            vec![Event::Begin(0), Event::Run { view: 0, phase: 0 }]
        );
        assert_eq!(stage.pending(), 1);

        assert_eq!(stage.run_all(), 1);
        // The continuation finished the protocol; the full journal matches a
        // never-suspended run exactly.
        assert_eq!(*journal.lock(), expected_clean(2, 3));
        // No second hand-off happened.
        assert_eq!(stage.pending(), 0);
    }

    #[test]
    fn test_at_most_one_handoff_per_relay() {
        // Declines in both phases: the first suspends, the second must be
        // absorbed by the in-place retry on the stage.
        let script = Script {
            decline_preemptive: vec![(0, 0), (0, 1), (2, 1)],
            fail_at: None,
        };
        let (outcome, journal, stage) = run_scripted(2, 3, script);
        assert_eq!(outcome.unwrap(), RelayOutcome::Suspended);
        assert_eq!(stage.run_all(), 1);
        assert_eq!(stage.pending(), 0);
        assert_eq!(*journal.lock(), expected_clean(2, 3));
    }

    #[test]
    fn test_preemptive_resets_at_phase_boundary() {
        // A decline in phase 1 after a suspension in phase 0 exercises the
        // preemptive flag being reset when the phase advances.
        let script = Script {
            decline_preemptive: vec![(1, 0), (1, 1)],
            fail_at: None,
        };
        let (outcome, _journal, stage) = run_scripted(2, 3, script);
        assert_eq!(outcome.unwrap(), RelayOutcome::Suspended);
        assert_eq!(stage.run_all(), 1);
        assert_eq!(stage.pending(), 0);
    }

    #[test]
    fn test_recoverable_error_halts_and_fires_view_hook() {
        let script = Script {
            decline_preemptive: Vec::new(),
            fail_at: Some((1, 0, LaneError::observer("bad callback"))),
        };
        let (outcome, journal, stage) = run_scripted(2, 3, script);
        assert!(matches!(outcome, Err(LaneError::Observer { .. })));
        assert_eq!(stage.pending(), 0);
        // View 0 ran, view 1 failed; view 2 and phase 1 never happened, the
        // failure hook fired exactly once, and it was the view hook.
        assert_eq!(
            *journal.lock(),
            vec![
                Event::Begin(0),
                Event::Run { view: 0, phase: 0 },
                Event::ViewFailed(1)
            ]
        );
    }

    #[test]
    fn test_fatal_error_fires_lane_hook_not_view_hook() {
        let script = Script {
            decline_preemptive: Vec::new(),
            fail_at: Some((1, 0, LaneError::resource_exhausted("oom"))),
        };
        let (outcome, journal, _) = run_scripted(2, 3, script);
        assert!(matches!(outcome, Err(LaneError::ResourceExhausted { .. })));
        assert_eq!(
            *journal.lock(),
            vec![
                Event::Begin(0),
                Event::Run { view: 0, phase: 0 },
                Event::RelayFailed
            ]
        );
    }

    #[test]
    fn test_error_after_resumption_is_routed_on_stage() {
        let script = Script {
            decline_preemptive: vec![(0, 0)],
            fail_at: Some((2, 1, LaneError::observer("late failure"))),
        };
        let (outcome, journal, stage) = run_scripted(2, 3, script);
        assert_eq!(outcome.unwrap(), RelayOutcome::Suspended);
        assert_eq!(stage.run_all(), 1);
        let journal = journal.lock();
        assert_eq!(journal.last(), Some(&Event::ViewFailed(2)));
        // Phase 1 began but never ended.
        assert!(journal.contains(&Event::Begin(1)));
        assert!(!journal.contains(&Event::End(1)));
        assert!(!journal.contains(&Event::Done));
    }
}
