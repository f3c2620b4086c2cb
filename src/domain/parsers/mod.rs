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

//! Parsing of the monitoring tool's console text
//!
//! `common` and `pci` hold pure line-level functions, `sections` the marker
//! table, and `scanner` the stateful pass that assembles board records.

pub mod common;
pub mod pci;
pub mod scanner;
pub mod sections;

pub use common::*;
pub use pci::*;
pub use scanner::{BoardScanner, MAX_PCI_CHIP_OFFSET};
pub use sections::{classify, SectionKind};
