pub mod minimize;
pub mod run;

use crate::config::ResolvedConfig;
use crate::error::Result;
use molsim::core::state::SimulationState;
use molsim::engine::model::MolecularModel;
use std::path::Path;
use tracing::info;

/// Builds a model from the resolved configuration and fills it from a state file.
fn load_model(config: &ResolvedConfig, input: &Path) -> Result<MolecularModel> {
    let mut model = MolecularModel::new(&config.simulation);

    if let Some(path) = &config.element_params {
        let count = model.elements_mut().load_csv(path)?;
        info!("Loaded {} element parameter row(s) from {:?}", count, path);
    }
    for field in &config.fields {
        model.set_field(field.kind, field.intensity, field.direction);
    }

    info!("Loading input state from {:?}", input);
    let state = SimulationState::read_from_path(input)?;
    model.load_state(&state)?;
    info!(
        atoms = model.atom_count(),
        rbonds = state.rbonds.len(),
        abonds = state.abonds.len(),
        tbonds = state.tbonds.len(),
        "Input state loaded."
    );
    Ok(model)
}

fn save_model(model: &MolecularModel, output: &Path) -> Result<()> {
    info!("Writing output state to {:?}", output);
    model.to_state().write_to_path(output)?;
    Ok(())
}
