//! Verdant simulator.
//!
//! Runs the decay scheduler and serves line-delimited JSON requests on stdin,
//! writing one JSON response per line to stdout. Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use verdant::{
    GardenConfig, GardenEngine, GardenError, GardenResult, OwnerId, OwnershipPolicy, PlantId,
    PlantKind, SystemClock,
};

#[derive(Parser)]
#[command(name = "verdant-sim")]
#[command(about = "Virtual plant simulator speaking line-delimited JSON on stdin/stdout")]
struct Cli {
    /// JSON config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Snapshot directory (plants are restored from and saved to it)
    #[arg(long, short)]
    data_dir: Option<PathBuf>,

    /// Decay sweep interval in milliseconds
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Neglect window in milliseconds
    #[arg(long)]
    neglect_window_ms: Option<u64>,

    /// Allow more than one plant per owner
    #[arg(long)]
    multiple_plants: bool,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> GardenResult<GardenConfig> {
        let mut config = match &self.config {
            Some(path) => GardenConfig::from_file(path)?,
            None => GardenConfig::default(),
        }
        .with_env_overrides()?;

        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(ms) = self.tick_interval_ms {
            config.tick_interval_ms = ms;
        }
        if let Some(ms) = self.neglect_window_ms {
            config.neglect_window_ms = ms;
        }
        if self.multiple_plants {
            config.ownership = OwnershipPolicy::MultiplePlants;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
    Create {
        owner_id: u64,
        #[serde(default)]
        kind: Option<PlantKind>,
    },
    Status {
        owner_id: u64,
        #[serde(default)]
        plant_id: Option<u64>,
    },
    Action {
        owner_id: u64,
        #[serde(default)]
        plant_id: Option<u64>,
        action: String,
    },
    Delete {
        owner_id: u64,
        plant_id: u64,
    },
}

fn plant_id(raw: Option<u64>) -> GardenResult<Option<PlantId>> {
    Ok(raw.map(PlantId::new).transpose()?)
}

fn to_json<T: Serialize>(value: &T) -> GardenResult<Value> {
    serde_json::to_value(value).map_err(|e| GardenError::internal(format!("encode response: {e}")))
}

fn handle(engine: &GardenEngine, request: Request) -> GardenResult<Value> {
    match request {
        Request::Create { owner_id, kind } => {
            let plant = engine.create_plant(OwnerId::new(owner_id)?, kind)?;
            to_json(&plant)
        }
        Request::Status { owner_id, plant_id: None } => {
            let plants = engine.get_status(OwnerId::new(owner_id)?)?;
            to_json(&plants)
        }
        Request::Status {
            owner_id,
            plant_id: Some(raw),
        } => {
            let plant = engine.get_plant(OwnerId::new(owner_id)?, PlantId::new(raw)?)?;
            to_json(&plant)
        }
        Request::Action {
            owner_id,
            plant_id: raw,
            action,
        } => {
            let plant = engine.apply_action(OwnerId::new(owner_id)?, plant_id(raw)?, &action)?;
            to_json(&plant)
        }
        Request::Delete { owner_id, plant_id } => {
            engine.delete_plant(OwnerId::new(owner_id)?, PlantId::new(plant_id)?)?;
            Ok(json!({ "deleted": true }))
        }
    }
}

fn respond(line: &str, engine: &GardenEngine) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return json!({ "error": { "kind": "invalid_request", "message": e.to_string() } });
        }
    };

    match handle(engine, request) {
        Ok(value) => json!({ "ok": value }),
        Err(e) => error_body(&e),
    }
}

fn error_body(e: &GardenError) -> Value {
    json!({ "error": { "kind": e.kind(), "message": e.to_string() } })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = cli.load_config()?;
    let engine = GardenEngine::from_config(&config, Arc::new(SystemClock))?;
    let scheduler = engine.scheduler(config.tick_interval()).start()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        tick_interval_ms = config.tick_interval_ms,
        neglect_window_ms = config.neglect_window_ms,
        ownership = ?config.ownership,
        "verdant simulator ready"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(&line, &engine);
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }

    scheduler.stop();
    info!("shut down");
    Ok(())
}
