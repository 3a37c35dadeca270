/*!
 * Partition Simulator - Main Entry Point
 *
 * Runs a short scripted workload against one partitioning discipline and
 * prints the final memory snapshot as JSON.
 *
 * Usage: partsim [static-fixed|static-variable|dynamic|segmentation|paging]
 */

use anyhow::{Context, Result};
use partsim::process::{builtin_templates, builtin_workload};
use partsim::{format_bytes, init_tracing, EngineConfig, MemoryEngine, ProcessRequest, Technique};
use tracing::{info, warn};

fn main() -> Result<()> {
    init_tracing();

    let technique = match std::env::args().nth(1) {
        Some(arg) => parse_technique(&arg)?,
        None => Technique::Dynamic,
    };
    let config = match std::env::var("PARTSIM_CONFIG") {
        Ok(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        Err(_) => EngineConfig::default(),
    };

    info!(%technique, fit = %config.fit_policy, "Starting partition simulator");
    let mut engine = MemoryEngine::new(technique, config)
        .with_context(|| format!("initializing {} backing store", technique))?;

    let requests: Vec<ProcessRequest> = if technique.queues_on_failure() {
        builtin_workload()
    } else {
        builtin_templates()
            .into_iter()
            .map(|template| ProcessRequest::template(template.name))
            .collect()
    };

    let mut first = None;
    for request in requests {
        let admission = engine.add_process(request)?;
        info!(?admission, "Process submitted");
        first = first.or(admission.instance_id());
    }

    if let Some(instance_id) = first {
        let removal = engine.remove_process(instance_id)?;
        info!(
            name = %removal.instance.name,
            freed = %format_bytes(removal.freed),
            admitted = removal.admitted.len(),
            "Removed first process"
        );
    }

    if technique == Technique::Dynamic && engine.config().compaction_enabled {
        let outcome = engine.compact()?;
        info!(
            relocated = outcome.compaction.relocated,
            free = %format_bytes(outcome.compaction.free_bytes),
            "Compacted memory"
        );
    }

    let snapshot = engine.snapshot();
    if !snapshot.waiting.is_empty() {
        warn!(waiting = snapshot.waiting.len(), "Processes still waiting for memory");
    }
    info!(
        used = %format_bytes(snapshot.stats.used_memory),
        free = %format_bytes(snapshot.stats.available_memory),
        pressure = ?snapshot.stats.memory_pressure(),
        "Final layout"
    );
    println!("{}", snapshot.to_json()?);
    Ok(())
}

fn parse_technique(arg: &str) -> Result<Technique> {
    serde_json::from_value(serde_json::Value::String(arg.to_string())).with_context(|| {
        format!(
            "unknown technique '{}', expected static-fixed, static-variable, dynamic, segmentation or paging",
            arg
        )
    })
}
