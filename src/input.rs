//! Random access to the subject string

use crate::charset::{is_lead_surrogate, is_trail_surrogate};

/// An indexable sequence of UTF-16 code units.
///
/// The engine only ever asks for the length and for single code units, so embedders can
/// back this with ropes, slices or foreign buffers.
pub trait RegexInput {
    fn len(&self) -> usize;

    /// Code unit at `index`. Callers guarantee `index < self.len()`.
    fn code_unit(&self, index: usize) -> u16;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegexInput for [u16] {
    fn len(&self) -> usize {
        <[u16]>::len(self)
    }

    fn code_unit(&self, index: usize) -> u16 {
        self[index]
    }
}

impl RegexInput for Vec<u16> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn code_unit(&self, index: usize) -> u16 {
        self[index]
    }
}

impl<T: RegexInput + ?Sized> RegexInput for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn code_unit(&self, index: usize) -> u16 {
        (**self).code_unit(index)
    }
}

/// Owned UTF-16 copy of a Rust string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utf16Input {
    units: Vec<u16>,
}

impl Utf16Input {
    pub fn new(text: &str) -> Self {
        Self {
            units: text.encode_utf16().collect(),
        }
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.units
    }
}

impl From<&str> for Utf16Input {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl RegexInput for Utf16Input {
    fn len(&self) -> usize {
        self.units.len()
    }

    fn code_unit(&self, index: usize) -> u16 {
        self.units[index]
    }
}

/// `position` falls between the lead and the trail surrogate of a pair
pub(crate) fn inside_surrogate_pair<I: RegexInput + ?Sized>(input: &I, position: usize) -> bool {
    position > 0
        && position < input.len()
        && is_lead_surrogate(u32::from(input.code_unit(position - 1)))
        && is_trail_surrogate(u32::from(input.code_unit(position)))
}

/// Copy any input into a contiguous buffer
pub(crate) fn collect_units<I: RegexInput + ?Sized>(input: &I) -> Vec<u16> {
    (0..input.len()).map(|i| input.code_unit(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_input_counts_code_units() {
        let input = Utf16Input::new("a\u{1F600}");
        assert_eq!(input.len(), 3);
        assert_eq!(input.code_unit(1), 0xD83D);
        assert_eq!(collect_units(&input), vec![0x61, 0xD83D, 0xDE00]);
        assert!(inside_surrogate_pair(&input, 2));
        assert!(!inside_surrogate_pair(&input, 1));
        assert!(!inside_surrogate_pair(&input, 3));
    }
}
