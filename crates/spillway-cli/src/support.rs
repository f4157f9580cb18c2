use serde::Serialize;
use spillway_engine::{ChannelPlacer, MemoryTopology, SpillwayConfig};
use spillway_ledger::{JsonlRecordStore, OverflowLedger};
use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Global options resolved once per invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: SpillwayConfig,
    pub ledger_path: PathBuf,
    pub json: bool,
}

impl Context {
    pub fn new(config: SpillwayConfig, ledger_override: Option<PathBuf>, json: bool) -> Self {
        let ledger_path = ledger_override.unwrap_or_else(|| config.ledger.path.clone());
        Self {
            config,
            ledger_path,
            json,
        }
    }

    pub fn ledger(&self) -> OverflowLedger {
        OverflowLedger::new(Arc::new(JsonlRecordStore::new(&self.ledger_path)))
    }

    pub fn placer(&self, topology: Arc<MemoryTopology>) -> ChannelPlacer {
        ChannelPlacer::from_config(topology, self.ledger(), &self.config)
            .unwrap_or_else(|e| fail(e))
    }
}

pub fn fail(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn load_config_or_exit(path: &Path) -> SpillwayConfig {
    SpillwayConfig::load(path).unwrap_or_else(|e| fail(e))
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail(format!("failed to create tokio runtime: {e}")));
    runtime.block_on(future)
}

pub fn load_topology_or_exit(path: &Path) -> Arc<MemoryTopology> {
    Arc::new(MemoryTopology::load(path).unwrap_or_else(|e| fail(e)))
}

pub fn save_topology_or_exit(topology: &MemoryTopology, path: &Path) {
    topology.save(path).unwrap_or_else(|e| fail(e));
}

pub fn print_json(payload: &impl Serialize) {
    let text = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|e| fail(format!("json serialization failed: {e}")));
    println!("{text}");
}
