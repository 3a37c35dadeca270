/*!
 * Compaction
 * Slide occupied regions down and gather free space at the top
 */

use super::super::types::{Compaction, Owner, Partition};
use super::{DynamicPartitioner, PartitionList};
use crate::core::units::{format_address, format_bytes};
use log::info;

impl DynamicPartitioner {
    /// Rebuild the list with occupied regions packed behind the OS region.
    ///
    /// Relative order is preserved and only addresses change, so a second
    /// pass finds nothing to move.
    pub(super) fn compact_layout(&mut self) -> Compaction {
        let mut packed = PartitionList::new();
        packed.push_back(self.space.os_partition());

        let mut address = self.space.user_start();
        let mut free_bytes = 0;
        let mut relocated = 0;

        for (_, partition) in self.list.iter() {
            match &partition.owner {
                Some(Owner::Os) => continue,
                None => free_bytes += partition.size,
                Some(_) => {
                    let mut moved = partition.clone();
                    if moved.address != address {
                        relocated += 1;
                    }
                    moved.address = address;
                    address += moved.size;
                    packed.push_back(moved);
                }
            }
        }

        if free_bytes > 0 {
            packed.push_back(Partition::free(address, free_bytes));
        }
        self.list = packed;

        info!(
            "Compaction relocated {} regions, {} free at {}",
            relocated,
            format_bytes(free_bytes),
            format_address(address)
        );
        Compaction {
            relocated,
            free_bytes,
        }
    }
}
