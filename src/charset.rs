//! Code point sets, predefined classes and case folding

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

pub const MAX_CODE_POINT: u32 = 0x10FFFF;
pub const MAX_CODE_UNIT: u32 = 0xFFFF;

const SURROGATE_START: u32 = 0xD800;
const LEAD_END: u32 = 0xDBFF;
const TRAIL_START: u32 = 0xDC00;
const SURROGATE_END: u32 = 0xDFFF;
const TRAIL_END: u32 = SURROGATE_END;
pub const TRAIL_SURROGATES: (u32, u32) = (TRAIL_START, TRAIL_END);

/// Characters outside ASCII that fold into `\w` under unicode case folding:
/// U+017F LATIN SMALL LETTER LONG S and U+212A KELVIN SIGN
const FOLDED_WORD_CHARS: [u32; 2] = [0x17F, 0x212A];

/// A set of code points kept as sorted, disjoint, non-adjacent inclusive ranges
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CodePointSet {
    ranges: Vec<(u32, u32)>,
}

impl CodePointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_char(c: u32) -> Self {
        Self::from_range(c, c)
    }

    pub fn from_range(lo: u32, hi: u32) -> Self {
        let mut set = Self::new();
        set.add_range(lo, hi);
        set
    }

    pub fn from_ranges(ranges: &[(u32, u32)]) -> Self {
        let mut set = Self::new();
        for &(lo, hi) in ranges {
            set.add_range(lo, hi);
        }
        set
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn add_char(&mut self, c: u32) {
        self.add_range(c, c);
    }

    pub fn add_range(&mut self, lo: u32, hi: u32) {
        if lo > hi {
            return;
        }
        // First range that could touch [lo, hi]
        let first = self.ranges.partition_point(|&(_, h)| h.saturating_add(1) < lo);
        let mut last = first;
        let mut new_lo = lo;
        let mut new_hi = hi;
        while last < self.ranges.len() && self.ranges[last].0 <= hi.saturating_add(1) {
            new_lo = new_lo.min(self.ranges[last].0);
            new_hi = new_hi.max(self.ranges[last].1);
            last += 1;
        }
        self.ranges.splice(first..last, [(new_lo, new_hi)]);
    }

    pub fn add_set(&mut self, other: &CodePointSet) {
        for &(lo, hi) in &other.ranges {
            self.add_range(lo, hi);
        }
    }

    pub fn contains(&self, c: u32) -> bool {
        let i = self.ranges.partition_point(|&(_, hi)| hi < c);
        i < self.ranges.len() && self.ranges[i].0 <= c
    }

    /// Complement within `0..=max`
    pub fn invert(&self, max: u32) -> CodePointSet {
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for &(lo, hi) in &self.ranges {
            if lo > max {
                break;
            }
            if lo > next {
                ranges.push((next, lo - 1));
            }
            next = hi.saturating_add(1);
        }
        if next <= max {
            ranges.push((next, max));
        }
        CodePointSet { ranges }
    }

    /// Restrict to `lo..=hi`
    pub fn intersect_range(&self, lo: u32, hi: u32) -> CodePointSet {
        let ranges = self
            .ranges
            .iter()
            .filter_map(|&(l, h)| {
                let l = l.max(lo);
                let h = h.min(hi);
                (l <= h).then_some((l, h))
            })
            .collect();
        CodePointSet { ranges }
    }

    pub fn subtract_range(&self, lo: u32, hi: u32) -> CodePointSet {
        let mut result = CodePointSet::new();
        for &(l, h) in &self.ranges {
            if h < lo || l > hi {
                result.ranges.push((l, h));
                continue;
            }
            if l < lo {
                result.ranges.push((l, lo - 1));
            }
            if h > hi {
                result.ranges.push((hi + 1, h));
            }
        }
        result
    }

    /// The only member, if there is exactly one
    pub fn single_char(&self) -> Option<u32> {
        match self.ranges.as_slice() {
            [(lo, hi)] if lo == hi => Some(*lo),
            _ => None,
        }
    }

    pub fn covers(&self, lo: u32, hi: u32) -> bool {
        let i = self.ranges.partition_point(|&(_, h)| h < lo);
        i < self.ranges.len() && self.ranges[i].0 <= lo && self.ranges[i].1 >= hi
    }

    pub fn is_full(&self, max: u32) -> bool {
        self.covers(0, max)
    }

    /// Close the set over case equivalence. `unicode` selects simple case folding instead
    /// of the legacy upper-case canonicalization.
    pub fn case_close(&self, unicode: bool) -> CodePointSet {
        let table = if unicode {
            UNICODE_FOLDING.get_or_init(|| FoldingTable::build(true))
        } else {
            LEGACY_FOLDING.get_or_init(|| FoldingTable::build(false))
        };
        let mut result = self.clone();
        for &(member, class) in &table.members {
            if self.contains(member) {
                for &other in &table.classes[class as usize] {
                    result.add_char(other);
                }
            }
        }
        result
    }

    /// Lower the set to UTF-16 code unit classes
    pub fn split_utf16(&self) -> Utf16Split {
        let single = self
            .intersect_range(0, MAX_CODE_UNIT)
            .subtract_range(SURROGATE_START, SURROGATE_END);
        let mut pairs: Vec<(CodePointSet, (u32, u32))> = Vec::new();
        let mut push = |lead: u32, trail_lo: u32, trail_hi: u32| {
            if let Some((leads, trail)) = pairs.last_mut() {
                if *trail == (trail_lo, trail_hi) {
                    leads.add_char(lead);
                    return;
                }
            }
            pairs.push((CodePointSet::from_char(lead), (trail_lo, trail_hi)));
        };
        for &(lo, hi) in self.intersect_range(0x10000, MAX_CODE_POINT).ranges() {
            let (lead_lo, trail_lo) = surrogates(lo);
            let (lead_hi, trail_hi) = surrogates(hi);
            if lead_lo == lead_hi {
                push(lead_lo, trail_lo, trail_hi);
                continue;
            }
            push(lead_lo, trail_lo, TRAIL_END);
            for lead in lead_lo + 1..lead_hi {
                push(lead, TRAIL_START, TRAIL_END);
            }
            push(lead_hi, TRAIL_START, trail_hi);
        }
        let pairs = pairs
            .into_iter()
            .map(|(leads, (lo, hi))| (leads, CodePointSet::from_range(lo, hi)))
            .collect();
        Utf16Split {
            single,
            pairs,
            lone_leads: self.intersect_range(SURROGATE_START, LEAD_END),
            lone_trails: self.intersect_range(TRAIL_START, SURROGATE_END),
        }
    }
}

/// A code point set as UTF-16 code unit classes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utf16Split {
    /// Code points below U+10000 other than surrogates
    pub single: CodePointSet,
    /// Supplementary code points as (lead surrogates, trail surrogates)
    pub pairs: Vec<(CodePointSet, CodePointSet)>,
    /// Surrogate code points. They only match a code unit that is not part of a pair.
    pub lone_leads: CodePointSet,
    pub lone_trails: CodePointSet,
}

impl Utf16Split {
    pub fn has_lone_surrogates(&self) -> bool {
        !self.lone_leads.is_empty() || !self.lone_trails.is_empty()
    }
}

fn surrogates(c: u32) -> (u32, u32) {
    let offset = c - 0x10000;
    (0xD800 + (offset >> 10), 0xDC00 + (offset & 0x3FF))
}

pub fn is_line_terminator(c: u32) -> bool {
    matches!(c, 0x0A | 0x0D | 0x2028 | 0x2029)
}

pub fn is_lead_surrogate(unit: u32) -> bool {
    (SURROGATE_START..=LEAD_END).contains(&unit)
}

pub fn is_trail_surrogate(unit: u32) -> bool {
    (TRAIL_START..=SURROGATE_END).contains(&unit)
}

/// `folded` selects the word characters of ignore case unicode patterns
pub fn is_word_char(c: u32, folded: bool) -> bool {
    if c < 0x80 {
        c as u8 == b'_' || (c as u8).is_ascii_alphanumeric()
    } else {
        folded && FOLDED_WORD_CHARS.contains(&c)
    }
}

pub fn digits() -> CodePointSet {
    CodePointSet::from_range('0' as u32, '9' as u32)
}

pub fn word_chars(folded: bool) -> CodePointSet {
    let mut set = CodePointSet::from_ranges(&[
        ('0' as u32, '9' as u32),
        ('A' as u32, 'Z' as u32),
        ('_' as u32, '_' as u32),
        ('a' as u32, 'z' as u32),
    ]);
    if folded {
        for c in FOLDED_WORD_CHARS {
            set.add_char(c);
        }
    }
    set
}

/// WhiteSpace and LineTerminator productions
pub fn whitespace() -> CodePointSet {
    CodePointSet::from_ranges(&[
        (0x09, 0x0D),
        (0x20, 0x20),
        (0xA0, 0xA0),
        (0x1680, 0x1680),
        (0x2000, 0x200A),
        (0x2028, 0x2029),
        (0x202F, 0x202F),
        (0x205F, 0x205F),
        (0x3000, 0x3000),
        (0xFEFF, 0xFEFF),
    ])
}

pub fn line_terminators() -> CodePointSet {
    CodePointSet::from_ranges(&[(0x0A, 0x0A), (0x0D, 0x0D), (0x2028, 0x2029)])
}

/// What `.` matches
pub fn dot(dot_all: bool, max: u32) -> CodePointSet {
    if dot_all {
        CodePointSet::from_range(0, max)
    } else {
        line_terminators().invert(max)
    }
}

struct FoldingTable {
    /// (code point, equivalence class) sorted by code point
    members: Vec<(u32, u32)>,
    classes: Vec<Vec<u32>>,
}

static LEGACY_FOLDING: OnceLock<FoldingTable> = OnceLock::new();
static UNICODE_FOLDING: OnceLock<FoldingTable> = OnceLock::new();

impl FoldingTable {
    fn build(unicode: bool) -> Self {
        let max = if unicode { MAX_CODE_POINT } else { MAX_CODE_UNIT };
        let mut by_key: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for c in (0..=max).filter_map(char::from_u32) {
            let key = if unicode {
                simple_fold(c)
            } else {
                canonicalize(c)
            };
            if key != c as u32 {
                by_key.entry(key).or_insert_with(|| vec![key]).push(c as u32);
            }
        }
        let mut classes: Vec<Vec<u32>> = by_key.into_values().collect();
        classes.sort();
        let mut members: Vec<(u32, u32)> = classes
            .iter()
            .enumerate()
            .flat_map(|(i, class)| class.iter().map(move |&c| (c, i as u32)))
            .collect();
        members.sort_unstable();
        Self { members, classes }
    }
}

fn single(mut mapped: impl Iterator<Item = char>) -> Option<char> {
    let first = mapped.next()?;
    mapped.next().is_none().then_some(first)
}

/// Legacy Canonicalize: upper-case mapping, unless it is not a single code unit or it
/// would map a non-ASCII character into ASCII
fn canonicalize(c: char) -> u32 {
    match single(c.to_uppercase()) {
        Some(upper) if (upper as u32) <= MAX_CODE_UNIT => {
            if (c as u32) >= 128 && (upper as u32) < 128 {
                c as u32
            } else {
                upper as u32
            }
        }
        _ => c as u32,
    }
}

fn simple_fold(c: char) -> u32 {
    // U+0131 LATIN SMALL LETTER DOTLESS I upper-cases to `I` but has no simple folding
    if c == '\u{131}' {
        return c as u32;
    }
    let upper = single(c.to_uppercase()).unwrap_or(c);
    single(upper.to_lowercase()).unwrap_or(upper) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_range_merges_adjacent() {
        let mut set = CodePointSet::from_range(10, 20);
        set.add_range(21, 30);
        set.add_range(40, 50);
        set.add_range(5, 12);
        assert_eq!(set.ranges(), &[(5, 30), (40, 50)]);
        set.add_range(0, 100);
        assert_eq!(set.ranges(), &[(0, 100)]);
    }

    #[test]
    fn test_invert() {
        let set = CodePointSet::from_ranges(&[(0, 9), (20, 30)]);
        assert_eq!(set.invert(100).ranges(), &[(10, 19), (31, 100)]);
        assert!(CodePointSet::new().invert(MAX_CODE_UNIT).is_full(MAX_CODE_UNIT));
    }

    #[test]
    fn test_case_close_legacy_keeps_non_ascii_apart() {
        let set = CodePointSet::from_char('s' as u32).case_close(false);
        assert!(set.contains('S' as u32));
        // U+017F LATIN SMALL LETTER LONG S upper-cases into ASCII
        assert!(!set.contains(0x17F));
        let unicode = CodePointSet::from_char('s' as u32).case_close(true);
        assert!(unicode.contains(0x17F));
        assert!(!CodePointSet::from_char('i' as u32).case_close(true).contains(0x131));
    }

    #[test]
    fn test_split_utf16() {
        let set = CodePointSet::from_ranges(&[('a' as u32, 'a' as u32), (0x1F600, 0x1F601)]);
        let split = set.split_utf16();
        assert_eq!(split.single.ranges(), &[(0x61, 0x61)]);
        assert_eq!(split.pairs.len(), 1);
        assert_eq!(split.pairs[0].0.ranges(), &[(0xD83D, 0xD83D)]);
        assert_eq!(split.pairs[0].1.ranges(), &[(0xDE00, 0xDE01)]);
        assert!(!split.has_lone_surrogates());
    }

    #[test]
    fn test_split_utf16_full_plane_keeps_lone_surrogates() {
        let split = dot(true, MAX_CODE_POINT).split_utf16();
        assert!(!split.single.contains(0xD800));
        assert_eq!(split.pairs.len(), 1);
        assert_eq!(split.pairs[0].0.ranges(), &[(0xD800, 0xDBFF)]);
        assert_eq!(split.lone_leads.ranges(), &[(0xD800, 0xDBFF)]);
        assert_eq!(split.lone_trails.ranges(), &[(0xDC00, 0xDFFF)]);
    }

    #[test]
    fn test_folded_word_chars() {
        assert!(!is_word_char(0x212A, false));
        assert!(is_word_char(0x212A, true));
        assert!(word_chars(true).contains(0x17F));
        assert_eq!(word_chars(true), word_chars(false).case_close(true));
    }
}
