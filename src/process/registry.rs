/*!
 * Process Registry
 * Active instances and the id counters that name them
 */

use super::types::{ProcessInstance, ProcessTemplate};
use crate::core::types::{InstanceId, MemoryId};
use crate::memory::PageTableEntry;
use ahash::RandomState;
use log::debug;
use std::collections::HashMap;

/// Tracks running instances; ids advance only when an instance is admitted
#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    instances: HashMap<InstanceId, ProcessInstance, RandomState>,
    next_instance: u32,
    next_memory: u32,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            instances: HashMap::with_hasher(RandomState::new()),
            next_instance: 1,
            next_memory: 1,
        }
    }

    /// Owner key the next admitted instance will receive
    pub fn next_memory_id(&self) -> MemoryId {
        MemoryId(self.next_memory)
    }

    /// `"<template> #<n>"`, numbered after the running instances of the same template
    pub fn instance_name(&self, template_name: &str) -> String {
        let running = self
            .instances
            .values()
            .filter(|instance| instance.template_name == template_name)
            .count();
        format!("{} #{}", template_name, running + 1)
    }

    /// Record a successfully placed instance, consuming both id counters
    pub fn admit(
        &mut self,
        template: &ProcessTemplate,
        name: String,
        page_table: Vec<PageTableEntry>,
    ) -> InstanceId {
        let instance_id = InstanceId(self.next_instance);
        let memory_id = MemoryId(self.next_memory);
        self.next_instance += 1;
        self.next_memory += 1;

        debug!(
            "Registered {} as instance {} (memory id {})",
            name, instance_id, memory_id
        );
        self.instances.insert(
            instance_id,
            ProcessInstance {
                instance_id,
                memory_id,
                template_name: template.name.clone(),
                name,
                segments: template.segments.clone(),
                page_table,
            },
        );
        instance_id
    }

    pub fn remove(&mut self, instance_id: InstanceId) -> Option<ProcessInstance> {
        self.instances.remove(&instance_id)
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<&ProcessInstance> {
        self.instances.get(&instance_id)
    }

    pub fn find_by_memory_id(&self, memory_id: MemoryId) -> Option<&ProcessInstance> {
        self.instances
            .values()
            .find(|instance| instance.memory_id == memory_id)
    }

    /// Running instances in admission order
    pub fn instances(&self) -> Vec<&ProcessInstance> {
        let mut instances: Vec<_> = self.instances.values().collect();
        instances.sort_by_key(|instance| instance.instance_id);
        instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}
