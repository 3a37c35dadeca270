/*!
 * Address Space
 * The flat simulated range [0, total) and its reserved OS prefix
 */

use super::types::{MemoryError, MemoryResult, Owner, Partition};
use crate::core::types::{Address, Size};
use serde::{Deserialize, Serialize};

/// Geometry of the simulated machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpace {
    total: Size,
    os_reserved: Size,
}

impl AddressSpace {
    pub fn new(total: Size, os_reserved: Size) -> MemoryResult<Self> {
        if os_reserved >= total {
            return Err(MemoryError::InvalidRequest(format!(
                "OS reservation of {} bytes leaves no user space in {} bytes",
                os_reserved, total
            )));
        }
        Ok(Self { total, os_reserved })
    }

    pub fn total(&self) -> Size {
        self.total
    }

    pub fn os_reserved(&self) -> Size {
        self.os_reserved
    }

    /// First address available to processes
    pub fn user_start(&self) -> Address {
        self.os_reserved
    }

    pub fn user_size(&self) -> Size {
        self.total - self.os_reserved
    }

    /// The leading OS partition, present in every backing store
    pub fn os_partition(&self) -> Partition {
        Partition::reserved(0, self.os_reserved, Owner::Os)
    }

    /// Layout of a store whose user space could not be partitioned
    pub fn os_only_layout(&self) -> Vec<Partition> {
        vec![
            self.os_partition(),
            Partition::reserved(self.user_start(), self.user_size(), Owner::Unpartitioned),
        ]
    }
}
