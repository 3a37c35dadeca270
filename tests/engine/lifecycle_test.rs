/*!
 * Engine Lifecycle Tests
 * Initialization, removal, compaction and paging end to end
 */

use partsim::core::limits::{KIB, MIB};
use partsim::memory::{Owner, PageTableEntry};
use partsim::{
    Admission, EngineConfig, InstanceId, MemoryEngine, MemoryError, ProcessRequest,
    ProcessTemplate, Size, Technique,
};
use pretty_assertions::assert_eq;

fn dynamic_engine() -> MemoryEngine {
    MemoryEngine::new(Technique::Dynamic, EngineConfig::new()).unwrap()
}

fn sized(name: &str, size: Size) -> ProcessRequest {
    ProcessRequest::custom(ProcessTemplate::new(name).with_segment(".text", size))
}

#[test]
fn test_invalid_fixed_size_leaves_os_only_store() {
    let mut engine = dynamic_engine();
    engine.add_process(sized("a", MIB)).unwrap();

    let config = EngineConfig::new().with_fixed_partition_mib(4);
    let err = engine.initialize(Technique::StaticFixed, config).unwrap_err();
    assert!(matches!(err, MemoryError::InvalidPartitionSize { .. }));

    let snapshot = engine.snapshot();
    let owners: Vec<_> = snapshot.partitions.iter().map(|p| p.owner.clone()).collect();
    assert_eq!(owners, vec![Some(Owner::Os), Some(Owner::Unpartitioned)]);
    assert_eq!(snapshot.covered_bytes(), 16 * MIB);
    assert!(snapshot.processes.is_empty());

    // Nothing can be placed, so plain processes wait
    assert_eq!(
        engine.add_process(sized("b", KIB)).unwrap(),
        Admission::Queued { position: 0 }
    );
}

#[test]
fn test_new_fails_on_invalid_geometry() {
    let config = EngineConfig::new().with_memory_mib(1, 1);
    assert!(matches!(
        MemoryEngine::new(Technique::Dynamic, config),
        Err(MemoryError::InvalidRequest(_))
    ));
}

#[test]
fn test_overflowing_config_is_rejected() {
    let config = EngineConfig::from_json_str(r#"{ "totalMemoryMiB": 18446744073709551615 }"#)
        .unwrap();
    assert!(matches!(
        MemoryEngine::new(Technique::Dynamic, config.clone()),
        Err(MemoryError::InvalidRequest(_))
    ));

    // A rejected configuration leaves the running engine untouched
    let mut engine = dynamic_engine();
    engine.add_process(sized("a", MIB)).unwrap();
    assert!(matches!(
        engine.initialize(Technique::StaticVariable, config),
        Err(MemoryError::InvalidRequest(_))
    ));
    assert_eq!(engine.technique(), Technique::Dynamic);
    assert_eq!(engine.instances().len(), 1);

    let config = EngineConfig::new().with_page_size_kib(usize::MAX);
    assert!(matches!(
        MemoryEngine::new(Technique::Paging, config),
        Err(MemoryError::InvalidRequest(_))
    ));
}

#[test]
fn test_initialize_resets_everything() {
    let mut engine = dynamic_engine();
    engine.add_process(sized("a", 15 * MIB)).unwrap();
    engine.add_process(sized("b", MIB)).unwrap();
    assert_eq!(engine.waiting().len(), 1);

    engine
        .initialize(Technique::Paging, EngineConfig::new().with_page_size_kib(128))
        .unwrap();

    assert_eq!(engine.technique(), Technique::Paging);
    assert!(engine.instances().is_empty());
    assert!(engine.waiting().is_empty());
    assert_eq!(engine.snapshot().frames.len(), 120);

    let admission = engine.add_process(sized("c", KIB)).unwrap();
    assert_eq!(admission.instance_id(), Some(InstanceId(1)));
}

#[test]
fn test_remove_unknown_instance() {
    let mut engine = dynamic_engine();
    assert_eq!(
        engine.remove_process(InstanceId(7)).unwrap_err(),
        MemoryError::ProcessNotFound(InstanceId(7))
    );
}

#[test]
fn test_compaction_admits_waiting_process() {
    let config = EngineConfig::new().with_compaction(true);
    let mut engine = MemoryEngine::new(Technique::Dynamic, config).unwrap();
    for name in ["a", "b", "c"] {
        engine.add_process(sized(name, 5 * MIB)).unwrap();
    }
    assert_eq!(
        engine.add_process(sized("d", 10 * MIB)).unwrap(),
        Admission::Queued { position: 0 }
    );

    assert!(engine.remove_process(InstanceId(1)).unwrap().admitted.is_empty());
    assert!(engine.remove_process(InstanceId(3)).unwrap().admitted.is_empty());
    assert_eq!(engine.waiting().len(), 1);

    let outcome = engine.compact().unwrap();
    assert_eq!(outcome.compaction.relocated, 1);
    assert_eq!(outcome.compaction.free_bytes, 10 * MIB);
    assert_eq!(outcome.admitted, vec![InstanceId(4)]);

    let layout: Vec<_> = engine
        .snapshot()
        .partitions
        .iter()
        .map(|p| (p.address, p.size, p.is_free()))
        .collect();
    assert_eq!(
        layout,
        vec![(0, MIB, false), (MIB, 5 * MIB, false), (6 * MIB, 10 * MIB, false)]
    );
}

#[test]
fn test_compaction_availability() {
    let mut engine = dynamic_engine();
    assert!(matches!(engine.compact(), Err(MemoryError::InvalidRequest(_))));

    let mut engine = MemoryEngine::new(
        Technique::Paging,
        EngineConfig::new().with_compaction(true),
    )
    .unwrap();
    assert!(matches!(engine.compact(), Err(MemoryError::InvalidRequest(_))));
}

#[test]
fn test_paging_page_table_round_trip() {
    let mut engine = MemoryEngine::new(Technique::Paging, EngineConfig::new()).unwrap();
    let template = ProcessTemplate::new("viewer")
        .with_segment(".text", 100 * KIB)
        .with_segment(".data", 50 * KIB);
    let id = engine
        .add_process(ProcessRequest::custom(template))
        .unwrap()
        .instance_id()
        .unwrap();

    let table = engine.page_table(id).unwrap();
    let rows: Vec<_> = table
        .iter()
        .map(|PageTableEntry { segment, logical_page, frame_id }| {
            (segment.as_str(), *logical_page, *frame_id)
        })
        .collect();
    // Sorted by segment name, then logical page
    assert_eq!(rows, vec![(".data", 0, 2), (".text", 0, 0), (".text", 1, 1)]);

    let removal = engine.remove_process(id).unwrap();
    assert_eq!(removal.freed, 3 * 64 * KIB);
    assert!(engine.snapshot().frames.iter().all(|f| f.is_free()));
    assert!(engine.snapshot().page_tables.is_empty());
    assert!(matches!(
        engine.page_table(id),
        Err(MemoryError::ProcessNotFound(_))
    ));
}

#[test]
fn test_small_page_size_is_raised() {
    let config = EngineConfig::new().with_page_size_kib(8);
    let engine = MemoryEngine::new(Technique::Paging, config).unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.page_size, Some(32 * KIB));
    assert_eq!(snapshot.frames.len(), 480);
    assert_eq!(engine.config().page_size_kib, 32);
}
