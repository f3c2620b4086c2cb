/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::domain::{PciDeviceInfo, PciLookupError, QueryError};
use async_trait::async_trait;

/// Per-device attribute files exposed by the OS PCI device tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PciAttribute {
    Vendor,
    Device,
    SubsystemVendor,
    SubsystemDevice,
    MaxLinkSpeed,
    MaxLinkWidth,
    CurrentLinkSpeed,
    CurrentLinkWidth,
    NumaNode,
    LocalCpuList,
}

impl PciAttribute {
    /// File name of the attribute inside a device directory
    pub fn file_name(&self) -> &'static str {
        match self {
            PciAttribute::Vendor => "vendor",
            PciAttribute::Device => "device",
            PciAttribute::SubsystemVendor => "subsystem_vendor",
            PciAttribute::SubsystemDevice => "subsystem_device",
            PciAttribute::MaxLinkSpeed => "max_link_speed",
            PciAttribute::MaxLinkWidth => "max_link_width",
            PciAttribute::CurrentLinkSpeed => "current_link_speed",
            PciAttribute::CurrentLinkWidth => "current_link_width",
            PciAttribute::NumaNode => "numa_node",
            PciAttribute::LocalCpuList => "local_cpulist",
        }
    }
}

/// Secondary port - PCI side-channel enumeration
///
/// Lists the devices matching the configured vendor:device filter in OS
/// enumeration order. That order is what ties a device to a chip index.
#[async_trait]
pub trait PciDeviceEnumerator: Send + Sync {
    /// Raw enumeration output, one device per line
    async fn raw_listing(&self) -> Result<String, QueryError>;

    /// Ordered bus addresses of the matching devices
    async fn list_matching_devices(&self) -> Result<Vec<String>, QueryError>;
}

/// Secondary port - Reader for single-line per-device attribute files
#[async_trait]
pub trait PciAttributeSource: Send + Sync {
    /// Read one attribute of the device at `address`, line breaks removed
    async fn read_attribute(
        &self,
        address: &str,
        attribute: PciAttribute,
    ) -> Result<String, PciLookupError>;
}

/// Secondary port - Resolves a cumulative chip index to its PCI attributes
///
/// Extractors only see this interface, so the correlation strategy can
/// change without touching them.
#[async_trait]
pub trait ChipPciLookup: Send + Sync {
    async fn lookup(&mut self, chip_index: usize) -> Result<PciDeviceInfo, PciLookupError>;
}
