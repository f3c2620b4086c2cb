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

//! Positional correlation between chips and the PCI enumeration

use crate::domain::parsers::split_pci_address;
use crate::domain::{PciDeviceInfo, PciLookupError, QueryError};
use crate::ports::{ChipPciLookup, PciAttribute, PciAttributeSource};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Bus addresses of the enumerated devices, possibly still being produced
pub enum AddressList {
    /// Handed over by the concurrent enumeration once it completes
    Pending(oneshot::Receiver<Result<Vec<String>, QueryError>>),
    Ready(Vec<String>),
    /// The enumeration failed; every later lookup reports the same failure
    Failed(String),
}

/// Correlates a system-wide chip index with the device at the same
/// position of the PCI enumeration
pub struct PositionalPciLookup {
    addresses: AddressList,
    attributes: Arc<dyn PciAttributeSource>,
}

impl PositionalPciLookup {
    pub fn new(addresses: AddressList, attributes: Arc<dyn PciAttributeSource>) -> Self {
        Self {
            addresses,
            attributes,
        }
    }

    /// Lookup over an address list that is already known
    pub fn ready(addresses: Vec<String>, attributes: Arc<dyn PciAttributeSource>) -> Self {
        Self::new(AddressList::Ready(addresses), attributes)
    }

    /// Lookup that waits on the first use for the enumeration to hand over its result
    pub fn pending(
        receiver: oneshot::Receiver<Result<Vec<String>, QueryError>>,
        attributes: Arc<dyn PciAttributeSource>,
    ) -> Self {
        Self::new(AddressList::Pending(receiver), attributes)
    }

    async fn resolved(&mut self) -> Result<&[String], PciLookupError> {
        if let AddressList::Pending(receiver) = &mut self.addresses {
            let outcome = match receiver.await {
                Ok(Ok(addresses)) => {
                    log::debug!("PCI enumeration resolved {} devices", addresses.len());
                    AddressList::Ready(addresses)
                }
                Ok(Err(e)) => AddressList::Failed(e.to_string()),
                Err(_) => AddressList::Failed("enumeration ended without a result".to_string()),
            };
            self.addresses = outcome;
        }
        match &self.addresses {
            AddressList::Ready(addresses) => Ok(addresses.as_slice()),
            AddressList::Failed(message) => Err(PciLookupError::Enumeration(message.clone())),
            AddressList::Pending(_) => Err(PciLookupError::Enumeration(
                "enumeration result unavailable".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ChipPciLookup for PositionalPciLookup {
    async fn lookup(&mut self, chip_index: usize) -> Result<PciDeviceInfo, PciLookupError> {
        let attributes = Arc::clone(&self.attributes);
        let addresses = self.resolved().await?;
        let address = addresses
            .get(chip_index)
            .cloned()
            .ok_or(PciLookupError::MissingAddress {
                chip_index,
                enumerated: addresses.len(),
            })?;
        let (bus, device, function) = split_pci_address(&address)
            .ok_or_else(|| PciLookupError::MalformedAddress(address.clone()))?;

        let read = |attribute| attributes.read_attribute(&address, attribute);
        Ok(PciDeviceInfo {
            vendor_id: read(PciAttribute::Vendor).await?,
            device_id: read(PciAttribute::Device).await?,
            sub_vendor_id: read(PciAttribute::SubsystemVendor).await?,
            sub_device_id: read(PciAttribute::SubsystemDevice).await?,
            bus,
            device,
            function,
            max_link_speed: read(PciAttribute::MaxLinkSpeed).await?,
            max_link_width: read(PciAttribute::MaxLinkWidth).await?,
            current_link_speed: read(PciAttribute::CurrentLinkSpeed).await?,
            current_link_width: read(PciAttribute::CurrentLinkWidth).await?,
            numa_node_id: read(PciAttribute::NumaNode).await?,
            numa_cpu_list: read(PciAttribute::LocalCpuList).await?.replace(',', " "),
        })
    }
}
