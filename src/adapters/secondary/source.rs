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

//! File and in-memory line sources

use crate::domain::SourceError;
use crate::ports::LineSource;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Line source reading a saved console dump
pub struct FileLineSource {
    path: PathBuf,
    reader: BufReader<File>,
}

impl FileLineSource {
    /// Open a file for line-by-line reading
    pub async fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).await.map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }
}

#[async_trait]
impl LineSource for FileLineSource {
    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|source| SourceError::Read {
                origin: self.path.display().to_string(),
                source,
            })?;
        Ok(if read == 0 { None } else { Some(line) })
    }
}

/// Line source over text already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLineSource {
    lines: VecDeque<String>,
}

impl MemoryLineSource {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }
}

#[async_trait]
impl LineSource for MemoryLineSource {
    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        Ok(self.lines.pop_front())
    }
}
