//! Parsing macros for repeated text parsing patterns.

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

/// Check a column-header line against its accepted variants.
/// - Collapses whitespace runs before comparing, so column padding does not matter.
/// - On mismatch, returns `Err(Error::UnexpectedFormat)` from the enclosing function.
///
/// Must be used inside a function returning `crate::error::Result<_>`.
#[macro_export]
macro_rules! expect_header {
    ($line:expr, $context:expr, $($variant:expr),+ $(,)?) => {{
        let normalized = $crate::parsing::common::normalize_whitespace($line);
        if !($(normalized == $variant)||+) {
            return Err($crate::error::Error::format($context, normalized));
        }
    }};
}

/// Fetch `$fields[$idx]` or return `Err(Error::UnexpectedFormat)` carrying `$line`.
#[macro_export]
macro_rules! field_or_bail {
    ($fields:expr, $idx:expr, $context:expr, $line:expr) => {{
        match $fields.get($idx) {
            Some(value) => *value,
            None => return Err($crate::error::Error::format($context, $line)),
        }
    }};
}
