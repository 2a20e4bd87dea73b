// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Segment-wise glob matching with recursive `**`.

use glob::{MatchOptions, Pattern};

const SEGMENT_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
enum Segment {
    /// `**`, zero or more whole segments
    Recursive,
    Glob(Pattern),
    /// Segment the glob syntax rejects, compared verbatim
    Literal(String),
}

impl Segment {
    fn parse(segment: &str) -> Self {
        if segment == "**" {
            return Segment::Recursive;
        }
        match Pattern::new(segment) {
            Ok(pattern) => Segment::Glob(pattern),
            Err(_) => Segment::Literal(segment.to_string()),
        }
    }

    fn matches(&self, key_segment: &str) -> bool {
        match self {
            Segment::Recursive => true,
            Segment::Glob(pattern) => pattern.matches_with(key_segment, SEGMENT_OPTIONS),
            Segment::Literal(literal) => literal == key_segment,
        }
    }
}

/// A `/`-separated glob pattern compiled once and matched against many keys.
///
/// Each segment supports `*`, `?`, `[...]` and `[!...]`. A segment that is exactly
/// `**` matches zero or more whole key segments.
///
/// # Examples
///
/// ```
/// use azure_blob_vfs::util::glob::GlobPattern;
///
/// let pattern = GlobPattern::new("data/**/*.csv");
/// assert!(pattern.matches_key("data/a/b/x.csv"));
/// assert!(pattern.matches_key("data/x.csv"));
/// assert!(!pattern.matches_key("data/a/x.parquet"));
/// ```
#[derive(Debug, Clone)]
pub struct GlobPattern {
    segments: Vec<Segment>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        Self::from_segments(&split_segments(pattern))
    }

    pub fn from_segments(segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|s| Segment::parse(s)).collect(),
        }
    }

    /// Match a `/`-separated key.
    pub fn matches_key(&self, key: &str) -> bool {
        self.matches_segments(&split_segments(key))
    }

    /// Match an already split key. Both sequences must be fully consumed.
    pub fn matches_segments(&self, key: &[&str]) -> bool {
        match_from(key, &self.segments)
    }
}

/// Match slash-split `key` segments against slash-split `pattern` segments.
pub fn matches(key: &[&str], pattern: &[&str]) -> bool {
    GlobPattern::from_segments(pattern).matches_segments(key)
}

/// Split on `/`. The empty string has no segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

fn match_from(key: &[&str], pattern: &[Segment]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return key.is_empty();
    };

    if let Segment::Recursive = head {
        if rest.is_empty() {
            return true;
        }
        return (0..=key.len()).any(|skip| match_from(&key[skip..], rest));
    }

    match key.split_first() {
        Some((first, remaining)) => head.matches(first) && match_from(remaining, rest),
        None => false,
    }
}
