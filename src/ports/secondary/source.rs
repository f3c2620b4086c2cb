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

use crate::domain::SourceError;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Secondary port - Sequential newline-delimited text stream
///
/// Backed by a spawned process's standard output or by a file. Lines keep
/// their trailing newline so substitutions can preserve the original layout.
#[async_trait]
pub trait LineSource: Send {
    /// Read the next line
    ///
    /// # Returns
    /// * `Ok(Some(line))` - Next line, trailing newline included when present
    /// * `Ok(None)` - End of stream
    /// * `Err(SourceError)` - Any read failure other than end of stream
    async fn next_line(&mut self) -> Result<Option<String>, SourceError>;

    /// Release the underlying resource once the stream is drained
    ///
    /// Process-backed sources wait for the child here. A non-zero exit is
    /// logged, never returned, so records already produced stay valid.
    async fn finish(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Lookahead wrapper over a [`LineSource`]
///
/// Extractors peek at upcoming lines to decide whether a section continues
/// and only consume what belongs to them.
pub struct LineReader {
    source: Box<dyn LineSource>,
    lookahead: VecDeque<String>,
}

impl LineReader {
    pub fn new(source: Box<dyn LineSource>) -> Self {
        Self {
            source,
            lookahead: VecDeque::new(),
        }
    }

    /// Consume the next line
    pub async fn next(&mut self) -> Result<Option<String>, SourceError> {
        match self.lookahead.pop_front() {
            Some(line) => Ok(Some(line)),
            None => self.source.next_line().await,
        }
    }

    /// Look at the line `n` positions ahead (0 is the next line) without consuming it
    pub async fn peek_nth(&mut self, n: usize) -> Result<Option<&str>, SourceError> {
        while self.lookahead.len() <= n {
            match self.source.next_line().await? {
                Some(line) => self.lookahead.push_back(line),
                None => return Ok(None),
            }
        }
        Ok(self.lookahead.get(n).map(String::as_str))
    }

    /// Look at the next line without consuming it
    pub async fn peek(&mut self) -> Result<Option<&str>, SourceError> {
        self.peek_nth(0).await
    }

    /// Consume the next line only if it contains `marker`
    pub async fn next_if_contains(&mut self, marker: &str) -> Result<Option<String>, SourceError> {
        let matches = matches!(self.peek().await?, Some(line) if line.contains(marker));
        if matches {
            self.next().await
        } else {
            Ok(None)
        }
    }

    /// Drop leading lines for which `predicate` holds, returning how many were dropped
    pub async fn skip_while<F>(&mut self, predicate: F) -> Result<usize, SourceError>
    where
        F: Fn(&str) -> bool + Send + Sync,
    {
        let mut skipped = 0;
        loop {
            let skip = matches!(self.peek().await?, Some(line) if predicate(line));
            if !skip {
                return Ok(skipped);
            }
            if let Some(line) = self.next().await? {
                log::debug!("skipping preamble line: {}", line.trim_end());
            }
            skipped += 1;
        }
    }

    /// Finish the underlying source
    pub async fn finish(&mut self) -> Result<(), SourceError> {
        self.source.finish().await
    }
}
