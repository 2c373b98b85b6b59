use super::{load_model, save_model};
use crate::cli::RunArgs;
use crate::config::{CliOverrides, PartialSimulationConfig};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use molsim::engine::progress::ProgressReporter;
use molsim::workflows::session::SimulationSession;
use molsim::workflows::snapshot::SessionId;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let partial_config = PartialSimulationConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let overrides = CliOverrides {
        time_step: args.time_step,
        seed: args.seed,
        temperature: args.temperature,
        step_length: None,
        no_auto_minimize: args.no_auto_minimize,
        set_values: &args.set_values,
    };
    let config = partial_config.merge_with_cli(&overrides)?;

    let mut model = load_model(&config, &args.input)?;
    if let Some(target) = config.initial_temperature {
        let reached = model.set_temperature(target);
        info!("Initial temperature set to {:.2} K", reached);
    }

    let run_config = config.simulation.run.clone();
    let mut session = SimulationSession::new(SessionId(0), model, run_config);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Running {} dynamics step(s)...", args.steps);
    session.run_steps(args.steps, &reporter)?;

    let snapshot = session.latest_snapshot();
    session.with_model(|model| save_model(model, &args.output))??;

    println!(
        "✓ Finished at t = {:.1} fs: T = {:.2} K, E_pot = {:.5} eV/atom. State written to: {}",
        snapshot.time,
        snapshot.temperature,
        snapshot.potential_energy,
        args.output.display()
    );
    Ok(())
}
