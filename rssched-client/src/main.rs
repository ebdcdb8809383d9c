use std::process::ExitCode;

use rssched_client::pipeline::{PipelineConfig, PipelineError, RequestPipeline, load_events};
use rssched_client::scenario::Scenario;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: rssched-client <config.json> <scenario.json> <events.json> [--send]";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let send = args.iter().any(|a| a == "--send");
    let paths: Vec<&String> = args.iter().filter(|a| *a != "--send").collect();
    let [config, scenario, events] = paths.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    match run(config, scenario, events, send).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &str, scenario: &str, events: &str, send: bool) -> Result<(), PipelineError> {
    let config = PipelineConfig::from_json_file(config)?;
    let scenario = Scenario::from_json_file(scenario)?;
    let events = load_events(events)?;

    let pipeline = RequestPipeline::new(config);
    let output = pipeline.run(&scenario, &events, send).await?;

    if let Some(response) = &output.response {
        info!(
            vehicles = response.objective_value.vehicle_count,
            unserved_passengers = response.objective_value.unserved_passengers,
            costs = response.objective_value.costs,
            "Solver finished"
        );
    }
    println!("Wrote run output to {}", output.directory.path().display());
    Ok(())
}
