//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `rowkeep_core` linkage with one create + page round-trip.
//! - Keep output deterministic for quick local sanity checks.

use log::info;
use once_cell::sync::Lazy;
use rowkeep_core::{
    core_version, init_logging, Entity, FieldTable, Filter, LogConfig, LogFaultSink, Migration,
    ModelStore, PageQuery, SortDirection, SqliteStoreFactory, StoreConfig,
    TransactionCoordinator, View, ViewProjector,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

const PROBE_SCHEMA: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE probes (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL);",
)];

#[derive(Debug, Default, Clone)]
struct Probe {
    id: i64,
    label: String,
}

static PROBE_FIELDS: Lazy<FieldTable<Probe>> = Lazy::new(|| {
    FieldTable::builder("probes")
        .generated_key("id", |p: &Probe| p.id, |p: &mut Probe, v| p.id = v)
        .field("label", |p: &Probe| p.label.clone(), |p: &mut Probe, v| p.label = v)
        .build()
});

impl Entity for Probe {
    fn field_table() -> &'static FieldTable<Self> {
        &PROBE_FIELDS
    }
}

struct ProbeView(Probe);

impl View for ProbeView {
    type Record = Probe;

    fn record(&self) -> &Probe {
        &self.0
    }

    fn record_mut(&mut self) -> &mut Probe {
        &mut self.0
    }
}

fn main() -> ExitCode {
    println!("rowkeep_core version={}", core_version());

    let workdir = std::env::temp_dir().join(format!("rowkeep-probe-{}", std::process::id()));
    let result = run_probe(&workdir);
    let _ = std::fs::remove_dir_all(&workdir);

    match result {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("rowkeep probe failed: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_probe(workdir: &Path) -> Result<String, String> {
    std::fs::create_dir_all(workdir).map_err(|err| err.to_string())?;
    init_logging(&LogConfig {
        level: "info".to_string(),
        log_dir: workdir.join("logs"),
    })?;

    let factory = SqliteStoreFactory::new(StoreConfig::at(workdir.join("probe.db")), PROBE_SCHEMA)
        .map_err(|err| err.to_string())?;
    let store = ModelStore::new(
        TransactionCoordinator::new(Arc::new(factory)).with_fault_sink(Arc::new(LogFaultSink)),
        ViewProjector::plain(ProbeView),
    );

    let created = store.create_blocking(
        ProbeView(Probe {
            id: 0,
            label: "ping".to_string(),
        }),
        None,
    );
    let created = created
        .into_result()
        .map_err(|err| err.to_string())?
        .ok_or("create returned no record")?;
    info!(
        "event=cli_probe module=cli status=ok op=create id={}",
        created.0.id
    );

    let query = PageQuery::new("label", SortDirection::Ascending).with_page(10, 0);
    let page = store
        .page_blocking(&Filter::all(), &query, None)
        .into_result()
        .map_err(|err| err.to_string())?
        .ok_or("page returned no result")?;

    Ok(format!(
        "rowkeep probe id={} total_items={} total_pages={}",
        created.0.id, page.total_items, page.total_pages
    ))
}
