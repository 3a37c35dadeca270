/*!
 * Snapshot Tests
 * Read-only views stay consistent with the address space
 */

use partsim::core::limits::{KIB, MIB};
use partsim::process::{builtin_templates, builtin_workload};
use partsim::{EngineConfig, FitPolicy, MemoryEngine, MemoryPressure, ProcessRequest, Technique};
use pretty_assertions::assert_eq;

const TECHNIQUES: [Technique; 5] = [
    Technique::StaticFixed,
    Technique::StaticVariable,
    Technique::Dynamic,
    Technique::Segmentation,
    Technique::Paging,
];

fn loaded(technique: Technique) -> MemoryEngine {
    let mut engine = MemoryEngine::new(technique, EngineConfig::new()).unwrap();
    let requests: Vec<ProcessRequest> = if technique.queues_on_failure() {
        builtin_workload()
    } else {
        builtin_templates()
            .into_iter()
            .map(|template| ProcessRequest::template(template.name))
            .collect()
    };
    for request in requests {
        engine.add_process(request).unwrap();
    }
    engine
}

#[test]
fn test_snapshot_covers_address_space() {
    for technique in TECHNIQUES {
        let snapshot = loaded(technique).snapshot();

        assert_eq!(snapshot.technique, technique);
        assert_eq!(snapshot.covered_bytes(), 16 * MIB, "{}", technique);
        let mut cursor = 0;
        for (address, size) in snapshot.spans() {
            assert_eq!(address, cursor, "{} has a gap", technique);
            cursor += size;
        }
        assert_eq!(
            snapshot.stats.used_memory + snapshot.stats.available_memory,
            16 * MIB
        );
    }
}

#[test]
fn test_snapshot_is_detached() {
    let engine = loaded(Technique::Dynamic);
    let mut snapshot = engine.snapshot();
    snapshot.partitions.clear();
    snapshot.processes.clear();

    assert_eq!(engine.snapshot().processes.len(), 5);
    assert!(!engine.snapshot().partitions.is_empty());
}

#[test]
fn test_paging_snapshot_lists_page_tables() {
    let engine = loaded(Technique::Paging);
    let snapshot = engine.snapshot();

    assert_eq!(snapshot.page_size, Some(64 * KIB));
    assert_eq!(snapshot.page_tables.len(), 5);
    for table in &snapshot.page_tables {
        let mut sorted = table.entries.clone();
        sorted.sort();
        assert_eq!(table.entries, sorted);
    }
    let mapped: usize = snapshot.page_tables.iter().map(|t| t.entries.len()).sum();
    let busy = snapshot.frames.iter().filter(|f| !f.is_free()).count();
    assert_eq!(mapped, busy);
}

#[test]
fn test_snapshot_serializes() {
    let config = EngineConfig::new().with_fit_policy(FitPolicy::BestFit);
    let mut engine = MemoryEngine::new(Technique::StaticVariable, config).unwrap();
    engine
        .add_process(ProcessRequest::plain("terminal", 256 * KIB))
        .unwrap();

    let json = engine.snapshot().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["technique"], "static-variable");
    assert_eq!(value["fit_policy"], "best-fit");
    assert_eq!(value["processes"][0]["name"], "terminal #1");
    assert_eq!(value["page_size"], serde_json::Value::Null);
}

#[test]
fn test_stats_reflect_pressure() {
    let engine = MemoryEngine::new(Technique::Dynamic, EngineConfig::new()).unwrap();
    let stats = engine.stats();
    assert_eq!(stats.available_memory, 15 * MIB);
    assert_eq!(stats.memory_pressure(), MemoryPressure::Low);
    assert_eq!(stats.external_fragmentation, 0);
}
