use super::boundary;
use super::config::{
    ConfigError, HeatBathConfig, MinimizationConfig, SimulationConfig, require_positive,
};
use super::error::EngineError;
use super::forces::{EnergyBreakdown, ForceCalculator, ForceContext};
use super::integrator;
use super::minimizer::{DescentStep, MinimizationSummary, SteepestDescent};
use super::progress::{Progress, ProgressReporter};
use super::thermostat::{self, HeatBath};
use crate::core::forcefield::elements::{ElementParams, ElementTable};
use crate::core::forcefield::fields::{ExternalFields, FieldKind};
use crate::core::models::atom::Atom;
use crate::core::models::bonds::{ABond, BondError, BondSet, RBond, TBond};
use crate::core::models::ids::ObstacleId;
use crate::core::models::obstacle::{Obstacle, ObstacleSet};
use crate::core::models::selection::AtomSelection;
use crate::core::models::simbox::{BoundaryType, SimulationBox};
use crate::core::models::store::AtomStore;
use crate::core::state::{
    ABondRecord, AtomRecord, RBondRecord, SimulationState, StateError, TBondRecord,
};
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument, trace, warn};

/// A complete particle system together with the machinery that advances it.
///
/// Every structural mutation (atoms, bonds, box, fields) invalidates the neighbor list and
/// the cached accelerations; the next [`step`](Self::step) recomputes both before moving
/// anything.
#[derive(Debug)]
pub struct MolecularModel {
    store: AtomStore,
    bonds: BondSet,
    obstacles: ObstacleSet,
    sim_box: SimulationBox,
    fields: ExternalFields,
    elements: ElementTable,
    calculator: ForceCalculator,
    time_step: f64,
    minimization: MinimizationConfig,
    heat_bath: Option<HeatBath>,
    rng: StdRng,
    step_count: u64,
    elapsed: f64,
    potential_energy: f64,
    forces_current: bool,
}

impl MolecularModel {
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store: AtomStore::new(config.capacity),
            bonds: BondSet::new(),
            obstacles: ObstacleSet::new(),
            sim_box: config.simulation_box,
            fields: ExternalFields::new(),
            elements: ElementTable::new(),
            calculator: ForceCalculator::new(config.cutoff_ratio, config.list_ratio),
            time_step: config.time_step,
            minimization: config.minimization.clone(),
            heat_bath: config.heat_bath.map(HeatBath::new),
            rng,
            step_count: 0,
            elapsed: 0.0,
            potential_energy: 0.0,
            forces_current: false,
        }
    }

    // --- Accessors ---

    pub fn atoms(&self) -> &[Atom] {
        self.store.atoms()
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.store.get(index)
    }

    pub fn atom_count(&self) -> usize {
        self.store.len()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn bonds(&self) -> &BondSet {
        &self.bonds
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn sim_box(&self) -> &SimulationBox {
        &self.sim_box
    }

    pub fn fields(&self) -> &ExternalFields {
        &self.fields
    }

    pub fn elements(&self) -> &ElementTable {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut ElementTable {
        &mut self.elements
    }

    pub fn calculator(&self) -> &ForceCalculator {
        &self.calculator
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn minimization_config(&self) -> &MinimizationConfig {
        &self.minimization
    }

    pub fn heat_bath(&self) -> Option<&HeatBath> {
        self.heat_bath.as_ref()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated time in fs.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    // --- Structure ---

    fn invalidate(&mut self) {
        self.calculator.neighbors().invalidate();
        self.forces_current = false;
    }

    /// Appends an atom. Returns `false` when the model is full.
    pub fn add_atom(
        &mut self,
        element: &ElementParams,
        position: Point3<f64>,
        velocity: Vector3<f64>,
        charge: f64,
    ) -> bool {
        let added = self.store.add_atom(element, position, velocity, charge);
        if added {
            self.invalidate();
        }
        added
    }

    /// Removes the selected atoms and every bond touching them. Surviving atoms are
    /// renumbered, so indices held from before the call are stale. Returns the number of
    /// atoms removed.
    pub fn remove_atoms(&mut self, selection: &AtomSelection) -> usize {
        let before = self.store.len();
        let remap = self.store.remove_atoms(selection);
        let removed = before - self.store.len();
        if removed > 0 {
            self.bonds.remap_atoms(&remap);
            self.invalidate();
            debug!(removed, remaining = self.store.len(), "Removed atoms.");
        }
        removed
    }

    pub fn add_rbond(
        &mut self,
        a: usize,
        b: usize,
        stiffness: f64,
        rest_length: f64,
    ) -> Result<usize, BondError> {
        let index = self
            .bonds
            .add_rbond(self.store.len(), a, b, stiffness, rest_length)?;
        self.invalidate();
        Ok(index)
    }

    pub fn add_abond(
        &mut self,
        end1: usize,
        vertex: usize,
        end2: usize,
        stiffness: f64,
        equilibrium_angle: f64,
    ) -> Result<usize, BondError> {
        let index = self.bonds.add_abond(
            self.store.len(),
            end1,
            vertex,
            end2,
            stiffness,
            equilibrium_angle,
        )?;
        self.invalidate();
        Ok(index)
    }

    pub fn add_tbond(
        &mut self,
        atoms: [usize; 4],
        periodicity: u32,
        stiffness: f64,
        equilibrium_angle: f64,
    ) -> Result<usize, BondError> {
        let index = self.bonds.add_tbond(
            self.store.len(),
            atoms,
            periodicity,
            stiffness,
            equilibrium_angle,
        )?;
        self.invalidate();
        Ok(index)
    }

    /// Removes a radial bond and the angles and torsions built on it. Invalid indices are
    /// ignored.
    pub fn remove_rbond(&mut self, index: usize) -> Option<RBond> {
        let removed = self.bonds.remove_rbond(index);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    pub fn remove_abond(&mut self, index: usize) -> Option<ABond> {
        let removed = self.bonds.remove_abond(index);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    pub fn remove_tbond(&mut self, index: usize) -> Option<TBond> {
        let removed = self.bonds.remove_tbond(index);
        if removed.is_some() {
            self.forces_current = false;
        }
        removed
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> ObstacleId {
        self.obstacles.add(obstacle)
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        self.obstacles.remove(id)
    }

    // --- Parameters ---

    pub fn set_time_step(&mut self, time_step: f64) -> Result<(), ConfigError> {
        require_positive("time_step", time_step)?;
        self.time_step = time_step;
        Ok(())
    }

    pub fn set_box_dimensions(&mut self, half_extents: Vector3<f64>) -> Result<(), ConfigError> {
        half_extents
            .iter()
            .try_for_each(|&extent| require_positive("box_half_extents", extent))?;
        self.sim_box.half_extents = half_extents;
        self.invalidate();
        Ok(())
    }

    pub fn set_boundary_type(&mut self, boundary: BoundaryType) {
        self.sim_box.boundary = boundary;
        self.invalidate();
    }

    /// Installs a uniform field; zero intensity or direction switches it off.
    pub fn set_field(&mut self, kind: FieldKind, intensity: f64, direction: Vector3<f64>) {
        self.fields.set(kind, intensity, direction);
        self.forces_current = false;
    }

    /// Pins or releases an atom. Pinning stops it. Returns `false` for an invalid index.
    pub fn set_atom_movable(&mut self, index: usize, movable: bool) -> bool {
        let Some(atom) = self.store.get_mut(index) else {
            return false;
        };
        atom.movable = movable;
        if !movable {
            atom.velocity = Vector3::zeros();
            atom.acceleration = Vector3::zeros();
        }
        self.forces_current = false;
        true
    }

    /// Sets an atom's damping coefficient in 1/fs. Returns `false` for an invalid index.
    pub fn set_atom_damping(&mut self, index: usize, damping: f64) -> bool {
        let Some(atom) = self.store.get_mut(index) else {
            return false;
        };
        atom.damping = damping;
        self.forces_current = false;
        true
    }

    // --- Temperature ---

    /// Kinetic energy of the movable atoms, in eV.
    pub fn kinetic_energy(&self) -> f64 {
        thermostat::kinetic_energy(self.store.atoms())
    }

    /// Instantaneous temperature in K.
    pub fn temperature(&self) -> f64 {
        thermostat::temperature(self.store.atoms())
    }

    /// Returns the temperature actually reached.
    pub fn set_temperature(&mut self, target: f64) -> f64 {
        let reached = thermostat::set_temperature(self.store.atoms_mut(), target, &mut self.rng);
        debug!(target, reached, "Temperature set.");
        reached
    }

    /// Impulsive heating (positive `delta`) or cooling, floored at 0 K.
    pub fn change_temperature(&mut self, delta: f64) -> f64 {
        let target = (self.temperature() + delta).max(0.0);
        self.set_temperature(target)
    }

    pub fn set_heat_bath(&mut self, config: Option<HeatBathConfig>) {
        self.heat_bath = config.map(HeatBath::new);
        match &self.heat_bath {
            Some(bath) => info!(
                target = bath.target,
                interval = bath.interval,
                "Heat bath activated."
            ),
            None => info!("Heat bath deactivated."),
        }
    }

    /// Resets the temperature when the heat bath is due at the current step.
    pub fn apply_heat_bath(&mut self) -> bool {
        match self.heat_bath {
            Some(bath) if bath.is_due(self.step_count) => {
                self.set_temperature(bath.target);
                true
            }
            _ => false,
        }
    }

    // --- Energies ---

    /// Average potential energy per movable atom from the last evaluation, in eV.
    pub fn potential_energy(&self) -> f64 {
        self.potential_energy
    }

    /// Summed potential energy from the last evaluation, in eV.
    pub fn total_potential_energy(&self) -> f64 {
        self.calculator.last_energy().total()
    }

    pub fn energy_breakdown(&self) -> &EnergyBreakdown {
        self.calculator.last_energy()
    }

    /// Kinetic plus summed potential energy, in eV.
    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy() + self.total_potential_energy()
    }

    // --- Dynamics ---

    fn evaluate_forces(&mut self, with_damping: bool) -> f64 {
        let ctx = ForceContext {
            bonds: &self.bonds,
            sim_box: &self.sim_box,
            fields: &self.fields,
        };
        let atoms = self.store.atoms_mut();
        self.potential_energy = if with_damping {
            self.calculator.compute(atoms, ctx)
        } else {
            self.calculator.evaluate(atoms, ctx)
        };
        self.potential_energy
    }

    /// Evaluates forces for the current configuration and makes them the current
    /// accelerations. Returns the average potential energy per movable atom.
    pub fn compute(&mut self) -> f64 {
        let energy = self.evaluate_forces(true);
        for atom in self.store.atoms_mut().iter_mut().filter(|atom| atom.movable) {
            atom.acceleration = atom.force;
            atom.force *= atom.mass;
        }
        self.forces_current = true;
        energy
    }

    /// Advances the system by one time step: predict, reflect at the walls, evaluate
    /// forces, correct, collide with obstacles and check the neighbor list.
    pub fn step(&mut self) -> f64 {
        if !self.forces_current {
            self.compute();
        }
        let dt = self.time_step;

        integrator::predict(self.store.atoms_mut(), dt);
        boundary::reflect_velocities(self.store.atoms_mut(), &self.sim_box);
        let energy = self.evaluate_forces(true);
        integrator::correct(self.store.atoms_mut(), dt);
        self.obstacles.collide(self.store.atoms_mut());
        self.calculator.neighbors().update_staleness(self.store.atoms());

        self.step_count += 1;
        self.elapsed += dt;
        trace!(step = self.step_count, potential_energy = energy, "Step complete.");
        energy
    }

    /// Whether any pair that is neither bonded nor the ends of an angle sits closer than
    /// the configured fraction of its combined σ.
    pub fn needs_minimization(&self) -> bool {
        let ratio = self.minimization.overlap_ratio;
        let atoms = self.store.atoms();
        (0..atoms.len()).tuple_combinations().any(|(i, j)| {
            let (a, b) = (&atoms[i], &atoms[j]);
            let limit = ratio * 0.5 * (a.sigma + b.sigma);
            !self.bonds.is_excluded(i, j)
                && self.sim_box.separation(&a.position, &b.position).norm_squared() < limit * limit
        })
    }

    /// Steepest-descent relaxation of the selected movable atoms (all of them when
    /// `selection` is `None`). Stops early once the forces vanish.
    #[instrument(skip_all, name = "minimization", fields(steps = steps, step_length = step_length))]
    pub fn minimize(
        &mut self,
        steps: usize,
        step_length: f64,
        selection: Option<&AtomSelection>,
        reporter: &ProgressReporter,
    ) -> Result<MinimizationSummary, EngineError> {
        require_positive("step_length", step_length)?;
        reporter.report(Progress::PhaseStart {
            name: "Minimization",
            total_steps: steps as u64,
        });

        let descent = SteepestDescent::new(step_length);
        let initial_energy = self.evaluate_forces(false);
        let mut final_energy = initial_energy;
        let mut steps_taken = 0;
        let mut converged = false;

        for _ in 0..steps {
            match descent.step(self.store.atoms_mut(), selection) {
                DescentStep::Moved(_) => {}
                DescentStep::Converged => {
                    converged = true;
                    break;
                }
                DescentStep::NonFinite => {
                    warn!(steps_taken, "Non-finite coordinates or forces; minimization aborted.");
                    break;
                }
            }
            boundary::confine_positions(self.store.atoms_mut(), &self.sim_box);
            self.calculator.neighbors().update_staleness(self.store.atoms());
            final_energy = self.evaluate_forces(false);
            steps_taken += 1;
            reporter.report(Progress::Step {
                step: steps_taken as u64,
                potential_energy: final_energy,
                temperature: self.temperature(),
            });
        }
        self.forces_current = false;

        reporter.report(Progress::PhaseFinish {
            name: "Minimization",
            steps_completed: steps_taken as u64,
        });
        info!(
            steps_taken,
            initial_energy, final_energy, converged, "Minimization finished."
        );

        Ok(MinimizationSummary {
            steps_taken,
            initial_energy,
            final_energy,
            converged,
        })
    }

    /// Relaxes with the configured step count and length.
    pub fn minimize_default(
        &mut self,
        reporter: &ProgressReporter,
    ) -> Result<MinimizationSummary, EngineError> {
        let MinimizationConfig {
            steps, step_length, ..
        } = self.minimization;
        self.minimize(steps, step_length, None, reporter)
    }

    // --- Persistence ---

    pub fn to_state(&self) -> SimulationState {
        SimulationState {
            atoms: self
                .store
                .atoms()
                .iter()
                .map(|atom| AtomRecord {
                    symbol: atom.symbol.clone(),
                    position: atom.position.into(),
                    velocity: atom.velocity.into(),
                    charge: atom.charge,
                    damping: atom.damping,
                    movable: atom.movable,
                })
                .collect(),
            rbonds: self
                .bonds
                .rbonds()
                .iter()
                .map(|bond| RBondRecord {
                    atoms: bond.atoms,
                    stiffness: bond.stiffness,
                    rest_length: bond.rest_length,
                })
                .collect(),
            abonds: self
                .bonds
                .abonds()
                .iter()
                .map(|bond| ABondRecord {
                    atoms: bond.atoms,
                    stiffness: bond.stiffness,
                    equilibrium_angle: bond.equilibrium_angle,
                })
                .collect(),
            tbonds: self
                .bonds
                .tbonds()
                .iter()
                .map(|bond| TBondRecord {
                    atoms: bond.atoms,
                    stiffness: bond.stiffness,
                    periodicity: bond.periodicity,
                    equilibrium_angle: bond.equilibrium_angle,
                })
                .collect(),
        }
    }

    /// Replaces every atom and bond with the contents of `state`. On error the model is
    /// left unchanged.
    #[instrument(skip_all, name = "load_state", fields(atoms = state.atoms.len()))]
    pub fn load_state(&mut self, state: &SimulationState) -> Result<(), StateError> {
        let capacity = self.store.capacity();
        if state.atoms.len() > capacity {
            return Err(StateError::Capacity {
                requested: state.atoms.len(),
                capacity,
            });
        }

        let mut store = AtomStore::new(capacity);
        for record in &state.atoms {
            let element = self
                .elements
                .get(&record.symbol)
                .ok_or_else(|| StateError::UnknownElement(record.symbol.clone()))?;
            store.add_atom(
                element,
                Point3::from(record.position),
                Vector3::from(record.velocity),
                record.charge,
            );
            if let Some(atom) = store.get_mut(store.len() - 1) {
                atom.damping = record.damping;
                atom.movable = record.movable;
            }
        }

        let count = store.len();
        let mut bonds = BondSet::new();
        for bond in &state.rbonds {
            let [a, b] = bond.atoms;
            bonds.add_rbond(count, a, b, bond.stiffness, bond.rest_length)?;
        }
        for bond in &state.abonds {
            let [a, b, c] = bond.atoms;
            bonds.add_abond(count, a, b, c, bond.stiffness, bond.equilibrium_angle)?;
        }
        for bond in &state.tbonds {
            bonds.add_tbond(
                count,
                bond.atoms,
                bond.periodicity,
                bond.stiffness,
                bond.equilibrium_angle,
            )?;
        }

        self.store = store;
        self.bonds = bonds;
        self.step_count = 0;
        self.elapsed = 0.0;
        self.invalidate();
        info!(
            atoms = count,
            rbonds = state.rbonds.len(),
            abonds = state.abonds.len(),
            tbonds = state.tbonds.len(),
            "Loaded simulation state."
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::units::GF_CONVERSION_CONSTANT;
    use crate::engine::config::SimulationConfigBuilder;

    fn f64_approx_equal(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    fn argon() -> &'static ElementParams {
        ElementTable::builtin("Ar").unwrap()
    }

    fn model() -> MolecularModel {
        let config = SimulationConfigBuilder::new().seed(17).build().unwrap();
        MolecularModel::new(&config)
    }

    fn argon_dimer(separation: f64) -> MolecularModel {
        let mut model = model();
        let half = 0.5 * separation;
        assert!(model.add_atom(argon(), Point3::new(-half, 0.0, 0.0), Vector3::zeros(), 0.0));
        assert!(model.add_atom(argon(), Point3::new(half, 0.0, 0.0), Vector3::zeros(), 0.0));
        model
    }

    fn distance(model: &MolecularModel, i: usize, j: usize) -> f64 {
        (model.atoms()[i].position - model.atoms()[j].position).norm()
    }

    #[test]
    fn add_atom_respects_capacity() {
        let config = SimulationConfigBuilder::new().capacity(2).build().unwrap();
        let mut model = MolecularModel::new(&config);
        assert!(model.add_atom(argon(), Point3::origin(), Vector3::zeros(), 0.0));
        assert!(model.add_atom(argon(), Point3::new(4.0, 0.0, 0.0), Vector3::zeros(), 0.0));
        assert!(!model.add_atom(argon(), Point3::new(8.0, 0.0, 0.0), Vector3::zeros(), 0.0));
        assert_eq!(model.atom_count(), 2);
    }

    #[test]
    fn argon_dimer_conserves_energy_over_ten_thousand_steps() {
        let mut model = argon_dimer(3.8);
        model.compute();
        let initial = model.total_energy();
        assert!(initial < 0.0);

        for _ in 0..10_000 {
            model.step();
        }

        let drift = (model.total_energy() - initial).abs() / initial.abs();
        assert!(drift < 0.01, "relative energy drift {drift}");
        assert_eq!(model.step_count(), 10_000);
        assert!(f64_approx_equal(model.elapsed(), 10_000.0, 1e-6));
    }

    #[test]
    fn dimer_momentum_stays_zero() {
        let mut model = argon_dimer(3.6);
        for _ in 0..100 {
            model.step();
        }
        let momentum: Vector3<f64> = model
            .atoms()
            .iter()
            .map(|atom| atom.velocity * atom.mass)
            .sum();
        assert!(momentum.norm() < 1e-15);
    }

    #[test]
    fn stretched_bond_pulls_atoms_together() {
        let mut model = argon_dimer(2.5);
        model.add_rbond(0, 1, 4.5, 2.0).unwrap();
        model.compute();

        let expected = 2.25 * GF_CONVERSION_CONSTANT / argon().mass;
        let atoms = model.atoms();
        assert!(f64_approx_equal(atoms[0].acceleration.x, expected, 1e-12));
        assert!(f64_approx_equal(atoms[1].acceleration.x, -expected, 1e-12));
    }

    #[test]
    fn temperature_assignment_reaches_target() {
        let mut model = model();
        for k in 0..8 {
            let position = Point3::new(4.0 * k as f64 - 14.0, 0.0, 0.0);
            model.add_atom(argon(), position, Vector3::zeros(), 0.0);
        }
        let reached = model.set_temperature(300.0);
        assert!(f64_approx_equal(reached, 300.0, 1e-9));

        let reached = model.change_temperature(-100.0);
        assert!(f64_approx_equal(reached, 200.0, 1e-9));
        assert!(f64_approx_equal(model.change_temperature(-500.0), 0.0, 0.0));
    }

    #[test]
    fn heat_bath_resets_temperature_on_schedule() {
        let mut model = argon_dimer(3.8);
        model.set_heat_bath(Some(HeatBathConfig {
            target: 50.0,
            interval: 3,
        }));
        model.set_temperature(10.0);

        let mut fired = Vec::new();
        for _ in 0..6 {
            model.step();
            if model.apply_heat_bath() {
                fired.push(model.step_count());
                assert!(f64_approx_equal(model.temperature(), 50.0, 1e-9));
            }
        }
        assert_eq!(fired, vec![3, 6]);
    }

    #[test]
    fn removing_atoms_drops_their_bonds_and_renumbers() {
        let mut model = model();
        for k in 0..3 {
            model.add_atom(argon(), Point3::new(3.0 * k as f64, 0.0, 0.0), Vector3::zeros(), 0.0);
        }
        model.add_rbond(0, 1, 1.0, 3.0).unwrap();
        model.add_rbond(1, 2, 1.0, 3.0).unwrap();
        model.step();

        let removed = model.remove_atoms(&AtomSelection::from_indices([0]));
        assert_eq!(removed, 1);
        assert_eq!(model.atom_count(), 2);
        assert_eq!(model.bonds().rbonds().len(), 1);
        assert_eq!(model.bonds().rbonds()[0].atoms, [0, 1]);
        assert!(model.calculator().neighbors().is_stale());
        model.step();
    }

    #[test]
    fn invalid_removals_are_no_ops() {
        let mut model = argon_dimer(3.8);
        assert_eq!(model.remove_atoms(&AtomSelection::from_indices([7])), 0);
        assert!(model.remove_rbond(0).is_none());
        assert!(model.remove_abond(3).is_none());
        assert!(model.remove_tbond(1).is_none());
        assert!(!model.set_atom_movable(9, false));
    }

    #[test]
    fn pinned_atom_never_moves() {
        let mut model = argon_dimer(3.5);
        assert!(model.set_atom_movable(0, false));
        let start = model.atoms()[0].position;
        for _ in 0..50 {
            model.step();
        }
        assert_eq!(model.atoms()[0].position, start);
        assert_ne!(model.atoms()[1].position.x, 1.75);
    }

    #[test]
    fn overlap_detection_ignores_bonded_pairs() {
        let mut model = argon_dimer(1.0);
        assert!(model.needs_minimization());
        model.add_rbond(0, 1, 1.0, 1.0).unwrap();
        assert!(!model.needs_minimization());
        assert!(!argon_dimer(3.8).needs_minimization());
    }

    #[test]
    fn minimization_separates_an_overlapping_pair() {
        let mut model = argon_dimer(2.5);
        let summary = model
            .minimize(60, 0.05, None, &ProgressReporter::new())
            .unwrap();

        assert!(summary.final_energy < summary.initial_energy);
        assert!(distance(&model, 0, 1) > 3.4);
        assert!(!model.needs_minimization());
    }

    #[test]
    fn minimization_respects_the_selection() {
        let mut model = argon_dimer(2.5);
        let start = model.atoms()[0].position;
        model
            .minimize(10, 0.05, Some(&AtomSelection::from_indices([1])), &ProgressReporter::new())
            .unwrap();
        assert_eq!(model.atoms()[0].position, start);
        assert!(f64_approx_equal(distance(&model, 0, 1), 3.0, 1e-9));
    }

    #[test]
    fn minimization_with_a_lost_coordinate_does_not_report_convergence() {
        let mut model = argon_dimer(3.8);
        model.store.atoms_mut()[0].position.x = f64::NAN;
        let summary = model
            .minimize(10, 0.05, None, &ProgressReporter::new())
            .unwrap();

        assert!(!summary.converged);
        assert_eq!(summary.steps_taken, 0);
    }

    #[test]
    fn minimization_rejects_bad_step_length() {
        let mut model = argon_dimer(2.5);
        let result = model.minimize(10, -1.0, None, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Config { .. })));
    }

    #[test]
    fn reflecting_wall_turns_an_escaping_atom() {
        let mut model = model();
        model.set_box_dimensions(Vector3::repeat(5.0)).unwrap();
        model.add_atom(argon(), Point3::new(3.0, 0.0, 0.0), Vector3::new(0.05, 0.0, 0.0), 0.0);
        for _ in 0..40 {
            model.step();
        }
        let atom = &model.atoms()[0];
        assert!(atom.velocity.x < 0.0);
        assert!(atom.position.x < 5.0);
    }

    #[test]
    fn periodic_box_lets_coordinates_grow() {
        let mut model = model();
        model.set_box_dimensions(Vector3::repeat(5.0)).unwrap();
        model.set_boundary_type(BoundaryType::Periodic);
        model.add_atom(argon(), Point3::new(3.0, 0.0, 0.0), Vector3::new(0.05, 0.0, 0.0), 0.0);
        for _ in 0..100 {
            model.step();
        }
        assert!(f64_approx_equal(model.atoms()[0].position.x, 8.0, 1e-9));
    }

    #[test]
    fn obstacle_bounces_an_approaching_atom() {
        let mut model = model();
        model.add_obstacle(Obstacle::cuboid(Point3::new(5.0, 0.0, 0.0), Vector3::repeat(1.0)));
        model.add_atom(argon(), Point3::origin(), Vector3::new(0.05, 0.0, 0.0), 0.0);
        for _ in 0..80 {
            model.step();
        }
        let atom = &model.atoms()[0];
        assert!(atom.velocity.x < 0.0);
        assert!(atom.position.x < 3.0);
    }

    #[test]
    fn state_round_trip_restores_the_model() {
        let mut model = model();
        for k in 0..3 {
            model.add_atom(
                argon(),
                Point3::new(3.0 * k as f64, 0.1 * k as f64, 0.0),
                Vector3::new(0.001 * k as f64, 0.0, -0.002),
                0.1 * k as f64,
            );
        }
        model.add_rbond(0, 1, 2.0, 3.0).unwrap();
        model.add_rbond(1, 2, 2.0, 3.0).unwrap();
        model.add_abond(0, 1, 2, 0.5, 2.8).unwrap();
        model.set_atom_damping(2, 0.01);
        model.set_atom_movable(0, false);
        let state = model.to_state();

        let mut restored = MolecularModel::new(&SimulationConfig::default());
        restored.load_state(&state).unwrap();
        assert_eq!(restored.to_state(), state);
        assert!(!restored.atoms()[0].movable);
        assert_eq!(restored.bonds().abonds().len(), 1);
    }

    #[test]
    fn load_state_failures_leave_the_model_untouched() {
        let mut model = argon_dimer(3.8);
        let mut state = model.to_state();
        state.atoms[1].symbol = "Xx".to_string();
        assert!(matches!(
            model.load_state(&state),
            Err(StateError::UnknownElement(symbol)) if symbol == "Xx"
        ));

        let mut state = model.to_state();
        state.abonds.push(ABondRecord {
            atoms: [0, 1, 0],
            stiffness: 1.0,
            equilibrium_angle: 1.0,
        });
        assert!(matches!(model.load_state(&state), Err(StateError::Bond(_))));

        let small = SimulationConfigBuilder::new().capacity(1).build().unwrap();
        assert!(matches!(
            MolecularModel::new(&small).load_state(&model.to_state()),
            Err(StateError::Capacity {
                requested: 2,
                capacity: 1
            })
        ));
        assert_eq!(model.atom_count(), 2);
    }
}
