/*!
 * Allocation Engine
 *
 * Single owner of the active backing store, the process registry and the
 * waiting queue. Every public operation runs to completion; callers observe
 * state only through snapshots.
 *
 * ## Lifecycle
 *
 * - `initialize` tears everything down and rebuilds the store for a technique
 * - `add_process` places a process, queueing it on plain backings when it does
 *   not fit and rejecting it on segmentation/paging
 * - `remove_process` frees an instance, then retries the whole waiting queue
 * - `compact` (dynamic only) packs memory, then retries the waiting queue
 */

pub mod config;
pub mod snapshot;

pub use config::EngineConfig;
pub use snapshot::{MemorySnapshot, ProcessPageTable};

use crate::core::types::{InstanceId, Size};
use crate::memory::{
    AddressSpace, BackingStore, Compaction, DynamicPartitioner, MemoryError, MemoryResult,
    MemoryStats, PageAllocator, PageTableEntry, Partition, Placement, SegmentAllocator,
    StaticPartitioner, Technique,
};
use crate::process::{
    builtin_templates, Admission, ProcessInstance, ProcessRegistry, ProcessRequest,
    ProcessTemplate, WaitingEntry, WaitingQueue,
};
use crate::monitoring::span_operation;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Outcome of `remove_process`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removal {
    pub instance: ProcessInstance,
    pub freed: Size,
    /// Waiting processes that were placed after the free
    pub admitted: Vec<InstanceId>,
}

/// Outcome of `compact`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionOutcome {
    pub compaction: Compaction,
    pub admitted: Vec<InstanceId>,
}

/// The memory manager simulation
#[derive(Debug)]
pub struct MemoryEngine {
    technique: Technique,
    config: EngineConfig,
    store: Box<dyn BackingStore>,
    registry: ProcessRegistry,
    queue: WaitingQueue,
    catalog: Vec<ProcessTemplate>,
}

impl MemoryEngine {
    /// Build an engine; fails if the configuration cannot produce the backing store
    pub fn new(technique: Technique, config: EngineConfig) -> MemoryResult<Self> {
        let config = config.validated()?;
        let space = AddressSpace::new(config.total_memory(), config.os_reserved())?;
        let store = build_store(technique, &config, space)?;

        Ok(Self {
            technique,
            config,
            store,
            registry: ProcessRegistry::new(),
            queue: WaitingQueue::new(),
            catalog: builtin_templates(),
        })
    }

    /// Reset counters, registry and queue, then rebuild the store.
    ///
    /// When the store cannot be built the engine is left with only the OS
    /// region reserved and the error is returned. An unusable address space
    /// geometry is rejected before anything is torn down.
    pub fn initialize(&mut self, technique: Technique, config: EngineConfig) -> MemoryResult<()> {
        let span = span_operation("initialize");
        let _entered = span.enter();
        span.finish(self.rebuild(technique, config))
    }

    fn rebuild(&mut self, technique: Technique, config: EngineConfig) -> MemoryResult<()> {
        let config = config.validated()?;
        let space = AddressSpace::new(config.total_memory(), config.os_reserved())?;

        self.registry = ProcessRegistry::new();
        self.queue.clear();
        self.technique = technique;

        let result = match build_store(technique, &config, space) {
            Ok(store) => {
                self.store = store;
                info!("Engine initialized for {} partitioning", technique);
                Ok(())
            }
            Err(err) => {
                warn!("Initialization of {} failed, store left OS-only: {}", technique, err);
                self.store = Box::new(StaticPartitioner::unpartitioned(space, technique));
                Err(err)
            }
        };
        self.config = config;
        result
    }

    /// Start a process from a template, a plain size or an explicit segment list
    pub fn add_process(&mut self, request: ProcessRequest) -> MemoryResult<Admission> {
        let span = span_operation("add_process");
        let _entered = span.enter();
        span.finish(self.admit(request))
    }

    fn admit(&mut self, request: ProcessRequest) -> MemoryResult<Admission> {
        let template = self.resolve(request)?;
        template.checked_size()?;

        match place(self.store.as_mut(), &mut self.registry, &template) {
            Ok(instance_id) => {
                let instance = self
                    .registry
                    .get(instance_id)
                    .ok_or(MemoryError::ProcessNotFound(instance_id))?;
                Ok(Admission::Allocated {
                    instance_id,
                    memory_id: instance.memory_id,
                    name: instance.name.clone(),
                })
            }
            Err(err @ MemoryError::InsufficientMemory { .. }) if self.technique.queues_on_failure() => {
                let position = self.queue.push(WaitingEntry::new(template));
                warn!("No room for process, queued at position {}: {}", position, err);
                Ok(Admission::Queued { position })
            }
            Err(err @ MemoryError::InsufficientMemory { .. }) => {
                warn!("Process {} rejected: {}", template.name, err);
                Ok(Admission::Rejected { reason: err })
            }
            Err(err) => Err(err),
        }
    }

    /// Free every record of an instance, then retry the waiting queue
    pub fn remove_process(&mut self, instance_id: InstanceId) -> MemoryResult<Removal> {
        let span = span_operation("remove_process");
        let _entered = span.enter();
        span.finish(self.release(instance_id))
    }

    fn release(&mut self, instance_id: InstanceId) -> MemoryResult<Removal> {
        let instance = self
            .registry
            .remove(instance_id)
            .ok_or(MemoryError::ProcessNotFound(instance_id))?;

        let freed = self.store.free_process(instance.memory_id);
        info!("Removed {} (instance {})", instance.name, instance_id);

        let admitted = self.drain_waiting();
        Ok(Removal {
            instance,
            freed,
            admitted,
        })
    }

    /// Compact the dynamic backing store, then retry the waiting queue
    pub fn compact(&mut self) -> MemoryResult<CompactionOutcome> {
        let span = span_operation("compact");
        let _entered = span.enter();
        span.finish(self.compact_and_drain())
    }

    fn compact_and_drain(&mut self) -> MemoryResult<CompactionOutcome> {
        if self.technique != Technique::Dynamic {
            return Err(MemoryError::InvalidRequest(format!(
                "compaction is only available for dynamic partitioning, not {}",
                self.technique
            )));
        }

        let compaction = self.store.compact()?;
        let admitted = self.drain_waiting();
        Ok(CompactionOutcome {
            compaction,
            admitted,
        })
    }

    /// Read-only copy of the whole engine state
    pub fn snapshot(&self) -> MemorySnapshot {
        let processes: Vec<ProcessInstance> =
            self.registry.instances().into_iter().cloned().collect();
        let page_tables = processes
            .iter()
            .filter(|instance| !instance.page_table.is_empty())
            .map(|instance| ProcessPageTable {
                instance_id: instance.instance_id,
                name: instance.name.clone(),
                entries: instance.sorted_page_table(),
            })
            .collect();

        MemorySnapshot {
            technique: self.technique,
            fit_policy: self.config.fit_policy,
            page_size: (self.technique == Technique::Paging).then(|| self.config.page_size()),
            total_memory: self.store.total_memory(),
            partitions: self.store.partitions(),
            frames: self.store.frames().to_vec(),
            page_tables,
            processes,
            waiting: self.queue.iter().cloned().collect(),
            stats: self.store.stats(),
        }
    }

    pub fn stats(&self) -> MemoryStats {
        self.store.stats()
    }

    /// Partitions currently held by an instance
    pub fn regions_of(&self, instance_id: InstanceId) -> MemoryResult<Vec<Partition>> {
        let instance = self.instance(instance_id)?;
        Ok(self.store.regions_of(instance.memory_id))
    }

    /// Page table of an instance, sorted by segment then logical page
    pub fn page_table(&self, instance_id: InstanceId) -> MemoryResult<Vec<PageTableEntry>> {
        Ok(self.instance(instance_id)?.sorted_page_table())
    }

    pub fn instance(&self, instance_id: InstanceId) -> MemoryResult<&ProcessInstance> {
        self.registry
            .get(instance_id)
            .ok_or(MemoryError::ProcessNotFound(instance_id))
    }

    pub fn instances(&self) -> Vec<&ProcessInstance> {
        self.registry.instances()
    }

    pub fn waiting(&self) -> &WaitingQueue {
        &self.queue
    }

    pub fn technique(&self) -> Technique {
        self.technique
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &[ProcessTemplate] {
        &self.catalog
    }

    /// Add a reusable template to the catalogue; zero-size segments are dropped.
    ///
    /// The catalogue survives `initialize`.
    pub fn register_template(&mut self, template: ProcessTemplate) -> MemoryResult<()> {
        let template = template.without_empty_segments();
        template.checked_size()?;
        if self.catalog.iter().any(|known| known.name == template.name) {
            return Err(MemoryError::InvalidRequest(format!(
                "template {} already exists",
                template.name
            )));
        }

        info!(
            "Registered template {} with {} segments",
            template.name,
            template.segments.len()
        );
        self.catalog.push(template);
        Ok(())
    }

    fn resolve(&self, request: ProcessRequest) -> MemoryResult<ProcessTemplate> {
        match request {
            ProcessRequest::Template { name } => self
                .catalog
                .iter()
                .find(|template| template.name == name)
                .cloned()
                .ok_or_else(|| MemoryError::InvalidRequest(format!("unknown template {}", name))),
            ProcessRequest::Plain { name, size } => {
                if size == 0 {
                    return Err(MemoryError::InvalidRequest(
                        "process size must be positive".to_string(),
                    ));
                }
                Ok(ProcessTemplate::plain(
                    name.unwrap_or_else(|| "process".to_string()),
                    size,
                    self.config.stack_heap_overhead(),
                ))
            }
            ProcessRequest::Custom { template } => Ok(template),
        }
    }

    fn drain_waiting(&mut self) -> Vec<InstanceId> {
        let mut admitted = Vec::new();
        if self.queue.is_empty() {
            return admitted;
        }

        let store = self.store.as_mut();
        let registry = &mut self.registry;
        self.queue.retry_all(|entry| match place(store, registry, &entry.template) {
            Ok(instance_id) => {
                admitted.push(instance_id);
                true
            }
            Err(_) => false,
        });

        if !admitted.is_empty() {
            info!("Admitted {} waiting processes", admitted.len());
        }
        admitted
    }
}

/// Allocate a template and register it; ids are consumed only on success
fn place(
    store: &mut dyn BackingStore,
    registry: &mut ProcessRegistry,
    template: &ProcessTemplate,
) -> MemoryResult<InstanceId> {
    let name = registry.instance_name(&template.name);
    let request = template.to_request(registry.next_memory_id(), &name);

    let page_table = match store.allocate(&request)? {
        Placement::Pages(table) => table,
        Placement::Regions(_) => Vec::new(),
    };
    Ok(registry.admit(template, name, page_table))
}

fn build_store(
    technique: Technique,
    config: &EngineConfig,
    space: AddressSpace,
) -> MemoryResult<Box<dyn BackingStore>> {
    let policy = config.fit_policy;
    Ok(match technique {
        Technique::StaticFixed => Box::new(StaticPartitioner::fixed(
            space,
            config.fixed_partition_size(),
            policy,
        )?),
        Technique::StaticVariable => Box::new(StaticPartitioner::variable(
            space,
            &config.variable_partition_sizes(),
            policy,
        )?),
        Technique::Dynamic => Box::new(
            DynamicPartitioner::new(space, policy)
                .with_split_threshold(config.split_threshold())
                .with_compaction(config.compaction_enabled),
        ),
        Technique::Segmentation => Box::new(SegmentAllocator::new(space, policy)),
        Technique::Paging => Box::new(PageAllocator::new(space, config.page_size())?),
    })
}
