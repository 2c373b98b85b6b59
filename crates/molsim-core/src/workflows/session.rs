use super::snapshot::{SessionId, Snapshot};
use crate::core::models::selection::AtomSelection;
use crate::engine::config::RunConfig;
use crate::engine::error::EngineError;
use crate::engine::minimizer::MinimizationSummary;
use crate::engine::model::MolecularModel;
use crate::engine::progress::{Progress, ProgressReporter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// State shared between the session handle and its worker threads.
#[derive(Clone)]
struct Shared {
    id: SessionId,
    model: Arc<Mutex<MolecularModel>>,
    latest: Arc<RwLock<Arc<Snapshot>>>,
    stop: Arc<AtomicBool>,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, MolecularModel>, EngineError> {
        self.model
            .lock()
            .map_err(|_| EngineError::Internal(format!("{}: model lock poisoned", self.id)))
    }

    fn publish(&self, model: &MolecularModel) {
        let snapshot = Arc::new(Snapshot::capture(self.id, model));
        match self.latest.write() {
            Ok(mut slot) => *slot = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

/// Owns one model and runs it.
///
/// The stepping thread holds the model lock for one step at a time; minimization holds it
/// for its whole duration. Consumers read positions through [`latest_snapshot`] and never
/// need the lock.
///
/// [`latest_snapshot`]: SimulationSession::latest_snapshot
pub struct SimulationSession {
    shared: Shared,
    run_config: RunConfig,
    stepper: Option<JoinHandle<Result<u64, EngineError>>>,
    minimizer: Option<JoinHandle<Result<MinimizationSummary, EngineError>>>,
}

impl SimulationSession {
    pub fn new(id: SessionId, model: MolecularModel, run_config: RunConfig) -> Self {
        let initial = Arc::new(Snapshot::capture(id, &model));
        Self {
            shared: Shared {
                id,
                model: Arc::new(Mutex::new(model)),
                latest: Arc::new(RwLock::new(initial)),
                stop: Arc::new(AtomicBool::new(false)),
            },
            run_config,
            stepper: None,
            minimizer: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    pub fn is_running(&self) -> bool {
        self.stepper
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_minimizing(&self) -> bool {
        self.minimizer
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn latest_snapshot(&self) -> Arc<Snapshot> {
        match self.shared.latest.read() {
            Ok(slot) => Arc::clone(&slot),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Runs `f` with exclusive access to the model. Blocks while a step or a minimization
    /// is in progress.
    pub fn with_model<R>(&self, f: impl FnOnce(&mut MolecularModel) -> R) -> Result<R, EngineError> {
        let mut model = self.shared.lock()?;
        Ok(f(&mut model))
    }

    fn ensure_not_running(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::Busy {
                operation,
                reason: "the stepping job is running",
            });
        }
        Ok(())
    }

    fn ensure_not_minimizing(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.is_minimizing() {
            return Err(EngineError::Busy {
                operation,
                reason: "a minimization is in progress",
            });
        }
        Ok(())
    }

    /// Starts the background stepping thread.
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.ensure_not_running("run")?;
        self.ensure_not_minimizing("run")?;
        self.reap_stepper()?;

        self.shared.stop.store(false, Ordering::Release);
        let shared = self.shared.clone();
        let run_config = self.run_config.clone();
        let handle = thread::Builder::new()
            .name(format!("molsim-{}", self.shared.id))
            .spawn(move || stepping_loop(shared, run_config))
            .map_err(|e| EngineError::Internal(format!("failed to spawn stepping thread: {}", e)))?;
        self.stepper = Some(handle);
        Ok(())
    }

    /// Stops the stepping thread, waits for it and publishes a final snapshot. Returns the
    /// number of steps the job ran.
    pub fn stop(&mut self) -> Result<u64, EngineError> {
        self.shared.stop.store(true, Ordering::Release);
        let steps = self.reap_stepper()?;
        let model = self.shared.lock()?;
        self.shared.publish(&model);
        Ok(steps)
    }

    /// Asks the stepping thread to stop after its current step and returns at once.
    pub fn stop_immediately(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    fn reap_stepper(&mut self) -> Result<u64, EngineError> {
        match self.stepper.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| EngineError::Internal("stepping thread panicked".to_string()))?,
            None => Ok(0),
        }
    }

    /// Starts a steepest-descent minimization on its own thread. Refused while the stepping
    /// job runs.
    pub fn minimize(
        &mut self,
        steps: usize,
        step_length: f64,
        selection: Option<AtomSelection>,
    ) -> Result<(), EngineError> {
        self.ensure_not_running("minimize")?;
        self.ensure_not_minimizing("minimize")?;
        if let Some(previous) = self.minimizer.take() {
            if let Ok(Err(e)) = previous.join() {
                warn!(error = %e, "Previous minimization had failed.");
            }
        }

        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name(format!("molsim-{}-minimize", self.shared.id))
            .spawn(move || -> Result<MinimizationSummary, EngineError> {
                let mut model = shared.lock()?;
                let summary =
                    model.minimize(steps, step_length, selection.as_ref(), &ProgressReporter::new())?;
                shared.publish(&model);
                Ok(summary)
            })
            .map_err(|e| EngineError::Internal(format!("failed to spawn minimizer: {}", e)))?;
        self.minimizer = Some(handle);
        Ok(())
    }

    /// Waits for the last minimization started with [`minimize`](Self::minimize).
    /// Returns `None` if there was none.
    pub fn wait_for_minimization(&mut self) -> Result<Option<MinimizationSummary>, EngineError> {
        match self.minimizer.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| EngineError::Internal("minimization thread panicked".to_string()))?
                .map(Some),
            None => Ok(None),
        }
    }

    /// Runs exactly `steps` steps on the calling thread.
    #[instrument(skip_all, name = "bounded_run", fields(session = %self.shared.id, steps = steps))]
    pub fn run_steps(&mut self, steps: u64, reporter: &ProgressReporter) -> Result<u64, EngineError> {
        self.ensure_not_running("run_steps")?;
        self.ensure_not_minimizing("run_steps")?;

        let mut model = self.shared.lock()?;
        prepare_run(&mut model, reporter)?;

        reporter.report(Progress::PhaseStart {
            name: "Dynamics",
            total_steps: steps,
        });
        info!("Starting bounded run.");
        for _ in 0..steps {
            let potential_energy = advance(&mut model, &self.shared, &self.run_config);
            reporter.report(Progress::Step {
                step: model.step_count(),
                potential_energy,
                temperature: model.temperature(),
            });
        }
        self.shared.publish(&model);
        reporter.report(Progress::PhaseFinish {
            name: "Dynamics",
            steps_completed: steps,
        });
        info!(
            temperature = model.temperature(),
            potential_energy = model.potential_energy(),
            "Bounded run finished."
        );
        Ok(steps)
    }
}

impl Drop for SimulationSession {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.stepper.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.minimizer.take() {
            let _ = handle.join();
        }
    }
}

/// Relaxes overlapping structures before dynamics, when enabled.
fn prepare_run(model: &mut MolecularModel, reporter: &ProgressReporter) -> Result<(), EngineError> {
    if model.minimization_config().auto_minimize && model.needs_minimization() {
        info!("Overlapping atoms found; relaxing before the run.");
        reporter.report(Progress::Message(
            "Overlapping atoms found, relaxing before the run".to_string(),
        ));
        model.minimize_default(reporter)?;
    }
    Ok(())
}

/// One step plus the per-step bookkeeping. Returns the average potential energy.
fn advance(model: &mut MolecularModel, shared: &Shared, run_config: &RunConfig) -> f64 {
    let energy = model.step();
    model.apply_heat_bath();
    if model.step_count() % run_config.snapshot_interval.max(1) == 0 {
        shared.publish(model);
    }
    energy
}

#[instrument(skip_all, name = "stepping_job", fields(session = %shared.id))]
fn stepping_loop(shared: Shared, run_config: RunConfig) -> Result<u64, EngineError> {
    {
        let mut model = shared.lock()?;
        prepare_run(&mut model, &ProgressReporter::new())?;
    }
    info!("Stepping job started.");

    let mut steps = 0;
    while !shared.stop.load(Ordering::Acquire) {
        let started = Instant::now();
        {
            let mut model = shared.lock()?;
            advance(&mut model, &shared, &run_config);
        }
        steps += 1;

        if let Some(remaining) = run_config.min_step_interval.checked_sub(started.elapsed()) {
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
    }

    info!(steps, "Stepping job stopped.");
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::elements::ElementTable;
    use crate::engine::config::SimulationConfigBuilder;
    use nalgebra::{Point3, Vector3};
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    fn dimer_session(separation: f64, run_config: RunConfig) -> SimulationSession {
        let config = SimulationConfigBuilder::new().seed(99).build().unwrap();
        let mut model = MolecularModel::new(&config);
        let argon = ElementTable::builtin("Ar").unwrap();
        let half = 0.5 * separation;
        model.add_atom(argon, Point3::new(-half, 0.0, 0.0), Vector3::zeros(), 0.0);
        model.add_atom(argon, Point3::new(half, 0.0, 0.0), Vector3::zeros(), 0.0);
        SimulationSession::new(SessionId(1), model, run_config)
    }

    fn paced() -> RunConfig {
        RunConfig {
            min_step_interval: Duration::from_millis(1),
            snapshot_interval: 1,
        }
    }

    #[test]
    fn initial_snapshot_is_published() {
        let session = dimer_session(3.8, RunConfig::default());
        let snapshot = session.latest_snapshot();
        assert_eq!(snapshot.step, 0);
        assert_eq!(snapshot.atom_count(), 2);
        assert_eq!(snapshot.session, SessionId(1));
    }

    #[test]
    fn run_then_stop_publishes_final_state() {
        let mut session = dimer_session(3.8, paced());
        session.run().unwrap();
        thread::sleep(Duration::from_millis(30));
        let steps = session.stop().unwrap();

        assert!(!session.is_running());
        assert!(steps > 0);
        let snapshot = session.latest_snapshot();
        assert_eq!(snapshot.step, steps);
        assert_eq!(session.with_model(|model| model.step_count()).unwrap(), steps);
    }

    #[test]
    fn second_run_and_minimize_are_refused_while_running() {
        let mut session = dimer_session(3.8, paced());
        session.run().unwrap();

        assert!(matches!(
            session.run(),
            Err(EngineError::Busy {
                operation: "run",
                ..
            })
        ));
        assert!(matches!(
            session.minimize(10, 0.05, None),
            Err(EngineError::Busy {
                operation: "minimize",
                ..
            })
        ));
        assert!(matches!(
            session.run_steps(5, &ProgressReporter::new()),
            Err(EngineError::Busy { .. })
        ));

        session.stop().unwrap();
    }

    #[test]
    fn stop_immediately_lets_the_thread_wind_down() {
        let mut session = dimer_session(3.8, paced());
        session.run().unwrap();
        thread::sleep(Duration::from_millis(10));
        session.stop_immediately();
        let steps = session.stop().unwrap();
        assert!(steps > 0);
    }

    #[test]
    fn session_can_restart_after_stop() {
        let mut session = dimer_session(3.8, paced());
        session.run().unwrap();
        thread::sleep(Duration::from_millis(10));
        let first = session.stop().unwrap();
        session.run().unwrap();
        thread::sleep(Duration::from_millis(10));
        let second = session.stop().unwrap();
        assert_eq!(session.latest_snapshot().step, first + second);
    }

    #[test]
    fn background_minimization_relaxes_and_publishes() {
        let mut session = dimer_session(2.5, RunConfig::default());
        session.minimize(40, 0.05, None).unwrap();
        let summary = session.wait_for_minimization().unwrap().unwrap();

        assert!(summary.final_energy < summary.initial_energy);
        let snapshot = session.latest_snapshot();
        let separation = (snapshot.positions[1] - snapshot.positions[0]).norm();
        assert!(separation > 3.4);
        assert!(session.wait_for_minimization().unwrap().is_none());
    }

    #[test]
    fn run_steps_reports_every_step() {
        let mut session = dimer_session(3.8, RunConfig::default());
        let count = AtomicU64::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Step { .. } = event {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }));

        assert_eq!(session.run_steps(25, &reporter).unwrap(), 25);
        drop(reporter);
        assert_eq!(count.load(Ordering::Relaxed), 25);
        assert_eq!(session.latest_snapshot().step, 25);
    }

    #[test]
    fn bounded_run_relaxes_overlaps_first() {
        let mut session = dimer_session(1.0, RunConfig::default());
        session.run_steps(1, &ProgressReporter::new()).unwrap();
        let needs = session.with_model(|model| model.needs_minimization()).unwrap();
        assert!(!needs);
    }
}
