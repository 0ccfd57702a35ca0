//! Fault sinks: where caught repository faults are reported.

use crate::model::ErrorKind;
use crate::repo::RepoError;
use log::{info, warn};

/// Receives every fault caught at a repository operation boundary.
pub trait FaultSink: Send + Sync {
    fn record(&self, operation: &'static str, entity: &'static str, error: &RepoError);
}

/// Discards faults. Default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFaultSink;

impl FaultSink for NoopFaultSink {
    fn record(&self, _operation: &'static str, _entity: &'static str, _error: &RepoError) {}
}

/// Forwards faults to the `log` facade: `NotFound` at info, the rest at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaultSink;

impl FaultSink for LogFaultSink {
    fn record(&self, operation: &'static str, entity: &'static str, error: &RepoError) {
        if error.kind() == ErrorKind::NotFound {
            info!("event=repo_fault module=repo status=not_found op={operation} entity={entity} error={error}");
        } else {
            warn!(
                "event=repo_fault module=repo status=error op={operation} entity={entity} kind={:?} error={error}",
                error.kind()
            );
        }
    }
}
