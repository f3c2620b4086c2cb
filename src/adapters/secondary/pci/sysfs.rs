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

//! PCI device attributes from the sysfs device tree

use crate::domain::parsers::{qualify_pci_address, strip_line_break};
use crate::domain::PciLookupError;
use crate::ports::{PciAttribute, PciAttributeSource};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads `<root>/<prefix><address>/<attribute>` files
pub struct SysfsPciAttributes {
    root: PathBuf,
    prefix: String,
}

impl SysfsPciAttributes {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    fn attribute_path(&self, address: &str, attribute: PciAttribute) -> PathBuf {
        self.root
            .join(qualify_pci_address(address, &self.prefix))
            .join(attribute.file_name())
    }
}

#[async_trait]
impl PciAttributeSource for SysfsPciAttributes {
    async fn read_attribute(
        &self,
        address: &str,
        attribute: PciAttribute,
    ) -> Result<String, PciLookupError> {
        let path = self.attribute_path(address, attribute);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(strip_line_break(&contents)),
            Err(source) => Err(PciLookupError::AttributeRead { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::PositionalPciLookup;
    use crate::ports::ChipPciLookup;
    use std::fs;
    use std::sync::Arc;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_device(root: &Path, address: &str, numa_cpus: &str) {
        let dir = root.join(format!("0000:{}", address));
        fs::create_dir_all(&dir).unwrap();
        let files = [
            ("vendor", "0x1e9f\n"),
            ("device", "0x27c5\n"),
            ("subsystem_vendor", "0x1e9f\n"),
            ("subsystem_device", "0x0001\n"),
            ("max_link_speed", "8.0 GT/s PCIe\n"),
            ("max_link_width", "16\n"),
            ("current_link_speed", "8.0 GT/s PCIe\n"),
            ("current_link_width", "8\n"),
            ("numa_node", "0\n"),
            ("local_cpulist", numa_cpus),
        ];
        for (name, value) in files {
            fs::write(dir.join(name), value).unwrap();
        }
    }

    fn attributes(root: &TempDir) -> Arc<dyn PciAttributeSource> {
        Arc::new(SysfsPciAttributes::new(root.path(), "0000:"))
    }

    #[tokio::test]
    async fn test_read_attribute_strips_line_break() {
        let root = TempDir::new().unwrap();
        write_device(root.path(), "3b:00.0", "0-15\n");

        let source = SysfsPciAttributes::new(root.path(), "0000:");
        let vendor = source
            .read_attribute("3b:00.0", PciAttribute::Vendor)
            .await
            .unwrap();
        assert_eq!(vendor, "0x1e9f");
    }

    #[tokio::test]
    async fn test_missing_attribute_file() {
        let root = TempDir::new().unwrap();
        let source = SysfsPciAttributes::new(root.path(), "0000:");

        let err = source
            .read_attribute("3b:00.0", PciAttribute::NumaNode)
            .await
            .unwrap_err();
        assert!(matches!(err, PciLookupError::AttributeRead { .. }));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("0000:3b:00.0"));
    }

    #[tokio::test]
    async fn test_domain_qualified_address_keeps_its_domain() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("0001:3b:00.0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("numa_node"), "1\n").unwrap();

        let source = SysfsPciAttributes::new(root.path(), "0000:");
        let node = source
            .read_attribute("0001:3b:00.0", PciAttribute::NumaNode)
            .await
            .unwrap();
        assert_eq!(node, "1");
    }

    #[tokio::test]
    async fn test_positional_lookup_over_device_tree() {
        let root = TempDir::new().unwrap();
        write_device(root.path(), "3b:00.0", "0-15\n");
        write_device(root.path(), "3c:00.0", "0-7,16-23\n");

        let mut lookup = PositionalPciLookup::ready(
            vec!["3b:00.0".to_string(), "3c:00.0".to_string()],
            attributes(&root),
        );
        let info = lookup.lookup(1).await.unwrap();

        assert_eq!(info.bus, "3c");
        assert_eq!(info.device, "00");
        assert_eq!(info.function, "0");
        assert_eq!(info.device_id, "0x27c5");
        assert_eq!(info.max_link_width, "16");
        assert_eq!(info.current_link_width, "8");
        assert_eq!(info.numa_cpu_list, "0-7 16-23");
    }
}
