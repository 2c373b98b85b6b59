use super::{load_model, save_model};
use crate::cli::MinimizeArgs;
use crate::config::{CliOverrides, PartialSimulationConfig};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use molsim::engine::progress::ProgressReporter;
use tracing::info;

pub fn run(args: MinimizeArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialSimulationConfig::from_file(path)?,
        None => {
            info!("No configuration file given; using defaults.");
            PartialSimulationConfig::default()
        }
    };
    let overrides = CliOverrides {
        step_length: args.step_length,
        set_values: &args.set_values,
        ..CliOverrides::default()
    };
    let config = partial_config.merge_with_cli(&overrides)?;
    let step_length = config.simulation.minimization.step_length;

    let mut model = load_model(&config, &args.input)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Minimizing for up to {} step(s) of {} Å...",
        args.steps, step_length
    );
    let summary = model.minimize(args.steps, step_length, None, &reporter)?;
    save_model(&model, &args.output)?;

    let status = if summary.converged {
        "converged"
    } else {
        "step limit reached"
    };
    println!(
        "✓ {} after {} step(s): E_pot {:.5} → {:.5} eV/atom. State written to: {}",
        status,
        summary.steps_taken,
        summary.initial_energy,
        summary.final_energy,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use molsim::core::state::SimulationState;
    use std::fs;
    use std::path::Path;

    const CROWDED_STATE: &str = r#"
        [[atoms]]
        symbol = "Ar"
        position = [-0.75, 0.0, 0.0]
        velocity = [0.0, 0.0, 0.0]

        [[atoms]]
        symbol = "Ar"
        position = [0.75, 0.0, 0.0]
        velocity = [0.0, 0.0, 0.0]
        movable = true
    "#;

    fn separation(state: &SimulationState) -> f64 {
        let [a, b] = [state.atoms[0].position, state.atoms[1].position];
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
    }

    fn args(dir: &Path, steps: usize) -> MinimizeArgs {
        let input = dir.join("in.toml");
        fs::write(&input, CROWDED_STATE).unwrap();
        MinimizeArgs {
            input,
            output: dir.join("out.toml"),
            config: None,
            steps,
            step_length: Some(0.05),
            set_values: Vec::new(),
        }
    }

    #[test]
    fn minimize_pushes_overlapping_atoms_apart() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), 60);
        let output = args.output.clone();
        run(args).unwrap();

        let state = SimulationState::read_from_path(&output).unwrap();
        assert!(separation(&state) > 3.0);
    }

    #[test]
    fn unknown_element_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), 5);
        fs::write(
            &args.input,
            "[[atoms]]\nsymbol = \"Xx\"\nposition = [0.0, 0.0, 0.0]\nvelocity = [0.0, 0.0, 0.0]\n",
        )
        .unwrap();
        let output = args.output.clone();

        assert!(matches!(run(args), Err(CliError::State(_))));
        assert!(!output.exists());
    }
}
