// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Line cursor for section-oriented reports.
//!
//! Report sections are a header line followed by rows up to the next blank
//! line. Section parsers take `&mut LineCursor`, consume exactly the lines
//! they understand and leave the cursor on the following line.

use crate::error::{Error, Result};
use crate::parsing::common::is_blank;

#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    /// Look at the next line without consuming it.
    pub fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    /// Consume and return the next line.
    pub fn next_line(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }

    /// Consume the next line, failing with `UnexpectedFormat` at end of input.
    pub fn expect_line(&mut self, context: &'static str) -> Result<&'a str> {
        self.next_line()
            .ok_or_else(|| Error::format(context, "<end of input>"))
    }

    /// Consume the next line only if it is not blank.
    pub fn next_row(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(line) if !is_blank(line) => self.next_line(),
            _ => None,
        }
    }

    /// Consume every line up to (not including) the next blank line.
    pub fn take_block(&mut self) -> Vec<&'a str> {
        let mut rows = Vec::new();
        while let Some(line) = self.next_row() {
            rows.push(line);
        }
        rows
    }

    /// Consume blank lines until the next non-blank line or end of input.
    pub fn skip_blank(&mut self) {
        while self.peek().is_some_and(is_blank) {
            self.pos += 1;
        }
    }

    /// Consume the next `n` lines, failing if fewer remain.
    pub fn take_exact(&mut self, n: usize, context: &'static str) -> Result<Vec<&'a str>> {
        if self.pos + n > self.lines.len() {
            return Err(Error::format(context, "<end of input>"));
        }
        let taken = self.lines[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(taken)
    }
}
