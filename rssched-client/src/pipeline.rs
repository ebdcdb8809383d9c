//! One run from scenario and events to an exported request.
//!
//! Lines are selected, the events are replayed into passenger counts, the
//! request is composed and written to the run's output directory together
//! with the passenger CSV and the configuration. Optionally the request is
//! sent to the solver and its response written as well.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::composer::{ComposeError, ComposerConfig, ConfigError, RequestComposer, SelectionError};
use crate::export::{ExportError, OutputDirectory};
use crate::passenger::{AnalysisError, Event, PassengerAnalysis, PassengerCounts};
use crate::request::Request;
use crate::response::Response;
use crate::scenario::{Scenario, ScenarioError};
use crate::solver::{SolverClient, SolverConfig, SolverError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Identifies a run and where its files go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub run_id: String,
    pub output_directory: PathBuf,
}

impl RunConfig {
    pub fn new(run_id: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            run_id: run_id.into(),
            output_directory: output_directory.into(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_output_directory(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = output_directory.into();
        self
    }
}

/// Everything a run needs besides its input data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub run: RunConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl PipelineConfig {
    pub fn new(run: RunConfig) -> Self {
        Self {
            run,
            composer: ComposerConfig::default(),
            solver: SolverConfig::default(),
        }
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| PipelineError::Json {
            path: path.display().to_string(),
            source,
        })?;
        config.composer.validate()?;
        Ok(config)
    }
}

/// Read a chronologically ordered event list from a JSON array.
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<Event>, PipelineError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let events: Vec<Event> = serde_json::from_str(&content).map_err(|source| PipelineError::Json {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), events = events.len(), "Loaded events");
    Ok(events)
}

/// Result of a run.
#[derive(Debug)]
pub struct RunOutput {
    pub request: Request,
    /// Only set when the request was sent to the solver.
    pub response: Option<Response>,
    pub directory: OutputDirectory,
}

#[derive(Debug)]
pub struct RequestPipeline {
    config: PipelineConfig,
}

impl RequestPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compose the request and write it with the passenger counts and the
    /// configuration to the run directory.
    pub fn prepare(
        &self,
        scenario: &Scenario,
        events: &[Event],
    ) -> Result<(Request, OutputDirectory), PipelineError> {
        let composer = &self.config.composer;
        let run = &self.config.run;
        info!(run_id = %run.run_id, "Starting request pipeline");

        let selection = composer.global.line_filter.select(scenario)?;
        info!(lines = selection.len(), "Selected transit lines");

        let mut analysis = PassengerAnalysis::new(
            scenario,
            selection.line_ids(),
            composer.global.sample_size,
            composer.global.seat_duration_threshold,
        );
        analysis.run(events)?;
        let entries = analysis.into_entries();
        let counts = PassengerCounts::from_entries(&entries);
        info!(
            entries = entries.len(),
            departures = counts.len(),
            "Analyzed passenger events"
        );

        let request = RequestComposer::new(composer, scenario).compose(&selection, &counts)?;
        info!(
            locations = request.locations().len(),
            routes = request.routes().len(),
            departures = request.departures().len(),
            "Composed scheduling request"
        );

        let directory = OutputDirectory::create(&run.output_directory, &run.run_id)?;
        directory.write_line_selection(&selection)?;
        directory.write_passengers(&entries, &scenario.timetable)?;
        directory.write_config(&self.config)?;
        directory.write_request(&request)?;
        Ok((request, directory))
    }

    /// Prepare the request and, if `send` is set, solve it.
    pub async fn run(
        &self,
        scenario: &Scenario,
        events: &[Event],
        send: bool,
    ) -> Result<RunOutput, PipelineError> {
        let (request, directory) = self.prepare(scenario, events)?;

        let response = if send {
            let client = SolverClient::new(self.config.solver.clone())?;
            let response = client.solve(&request).await?;
            directory.write_response(&response)?;
            Some(response)
        } else {
            None
        };

        info!(path = %directory.path().display(), "Finished run");
        Ok(RunOutput {
            request,
            response,
            directory,
        })
    }
}
