//! Match results

/// Start and end indices of every capture group, group 0 being the whole match.
///
/// Indices are UTF-16 code unit offsets. Groups that did not participate hold `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    indices: Vec<i32>,
}

impl Captures {
    /// All groups unset
    pub fn new(group_count: usize) -> Self {
        Self {
            indices: vec![-1; group_count * 2],
        }
    }

    pub(crate) fn from_indices(indices: Vec<i32>) -> Self {
        debug_assert!(indices.len() % 2 == 0);
        Self { indices }
    }

    /// Bounds of a group, `None` if it did not participate or does not exist
    pub fn get(&self, group: usize) -> Option<(usize, usize)> {
        let start = *self.indices.get(group * 2)?;
        let end = *self.indices.get(group * 2 + 1)?;
        if start < 0 || end < 0 {
            None
        } else {
            Some((start as usize, end as usize))
        }
    }

    pub fn start(&self) -> usize {
        self.get(0).map_or(0, |(start, _)| start)
    }

    pub fn end(&self) -> usize {
        self.get(0).map_or(0, |(_, end)| end)
    }

    /// Number of groups including group 0
    pub fn group_count(&self) -> usize {
        self.indices.len() / 2
    }

    /// Raw `[start0, end0, start1, end1, ...]` array
    pub fn as_slice(&self) -> &[i32] {
        &self.indices
    }
}

/// Outcome of a single `exec` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexResult {
    NoMatch,
    Match(Captures),
}

impl RegexResult {
    pub fn is_match(&self) -> bool {
        matches!(self, RegexResult::Match(_))
    }

    pub fn captures(&self) -> Option<&Captures> {
        match self {
            RegexResult::Match(captures) => Some(captures),
            RegexResult::NoMatch => None,
        }
    }

    /// Shorthand for `captures().and_then(|c| c.get(group))`
    pub fn get(&self, group: usize) -> Option<(usize, usize)> {
        self.captures().and_then(|captures| captures.get(group))
    }
}

/// Capture offsets that are fully determined by the match position.
///
/// Offsets are relative to the match start; `-1` marks groups that never participate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreCalculatedResult {
    length: usize,
    offsets: Vec<i32>,
}

impl PreCalculatedResult {
    pub(crate) fn new(length: usize, offsets: Vec<i32>) -> Self {
        Self { length, offsets }
    }

    /// Length of every match this result describes
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn group_count(&self) -> usize {
        self.offsets.len() / 2
    }

    pub fn create_from_start(&self, start: usize) -> Captures {
        let indices = self
            .offsets
            .iter()
            .map(|&offset| {
                if offset < 0 {
                    -1
                } else {
                    start as i32 + offset
                }
            })
            .collect();
        Captures::from_indices(indices)
    }

    pub fn create_from_end(&self, end: usize) -> Captures {
        self.create_from_start(end - self.length)
    }
}
