//! ECMAScript regex flags and the immutable pattern source

use std::fmt;

use bitflags::bitflags;

use crate::error::{RegexError, Result};

bitflags! {
    /// Flags accepted after the closing `/` of an ECMAScript regex literal
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegexFlags: u32 {
        /// `g`: global search. Only affects how the embedder advances `lastIndex`
        const GLOBAL = 1;
        /// `i`: case insensitive matching
        const IGNORE_CASE = 2;
        /// `m`: `^` and `$` also match at line terminators
        const MULTILINE = 4;
        /// `s`: `.` also matches line terminators
        const DOT_ALL = 8;
        /// `u`: the pattern and input are treated as sequences of code points
        const UNICODE = 16;
        /// `y`: the match must start exactly at `fromIndex`
        const STICKY = 32;
        /// `d`: the embedder wants match indices. Accepted and ignored by the engine
        const HAS_INDICES = 64;
    }
}

impl RegexFlags {
    const LETTERS: [(char, RegexFlags); 7] = [
        ('d', RegexFlags::HAS_INDICES),
        ('g', RegexFlags::GLOBAL),
        ('i', RegexFlags::IGNORE_CASE),
        ('m', RegexFlags::MULTILINE),
        ('s', RegexFlags::DOT_ALL),
        ('u', RegexFlags::UNICODE),
        ('y', RegexFlags::STICKY),
    ];

    /// Parse a flag string such as `"gim"`. Unknown or repeated flags are a syntax error.
    pub fn parse(flags: &str) -> Result<Self> {
        let mut parsed = RegexFlags::empty();
        for (position, c) in flags.chars().enumerate() {
            let flag = Self::LETTERS
                .iter()
                .find(|(letter, _)| *letter == c)
                .map(|(_, flag)| *flag)
                .ok_or_else(|| RegexError::syntax(format!("Invalid flag '{c}'"), position))?;
            if parsed.contains(flag) {
                return Err(RegexError::syntax(format!("Duplicate flag '{c}'"), position));
            }
            parsed |= flag;
        }
        Ok(parsed)
    }

    pub fn ignore_case(self) -> bool {
        self.contains(Self::IGNORE_CASE)
    }

    pub fn multiline(self) -> bool {
        self.contains(Self::MULTILINE)
    }

    pub fn dot_all(self) -> bool {
        self.contains(Self::DOT_ALL)
    }

    pub fn unicode(self) -> bool {
        self.contains(Self::UNICODE)
    }

    pub fn sticky(self) -> bool {
        self.contains(Self::STICKY)
    }
}

impl fmt::Display for RegexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, flag) in Self::LETTERS {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// Pattern text as UTF-16 code units together with its flags
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegexSource {
    pattern: Vec<u16>,
    flags: RegexFlags,
}

impl RegexSource {
    pub fn new(pattern: &str, flags: RegexFlags) -> Self {
        Self {
            pattern: pattern.encode_utf16().collect(),
            flags,
        }
    }

    pub fn from_utf16(pattern: Vec<u16>, flags: RegexFlags) -> Self {
        Self { pattern, flags }
    }

    pub fn pattern(&self) -> &[u16] {
        &self.pattern
    }

    /// The pattern decoded for display, lone surrogates replaced
    pub fn pattern_lossy(&self) -> String {
        String::from_utf16_lossy(&self.pattern)
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }
}

impl fmt::Display for RegexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.pattern_lossy(), self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let flags = RegexFlags::parse("gimsuy").unwrap();
        assert!(flags.ignore_case() && flags.multiline() && flags.sticky());
        assert!(flags.unicode() && flags.dot_all());
        assert_eq!(flags.to_string(), "gimsuy");
        assert_eq!(RegexFlags::parse("").unwrap(), RegexFlags::empty());
    }

    #[test]
    fn test_parse_flags_rejects_bad_input() {
        assert!(matches!(
            RegexFlags::parse("gg"),
            Err(RegexError::Syntax { position: 1, .. })
        ));
        assert!(matches!(
            RegexFlags::parse("ix"),
            Err(RegexError::Syntax { position: 1, .. })
        ));
    }

    #[test]
    fn test_source_display() {
        let source = RegexSource::new("a|b", RegexFlags::IGNORE_CASE | RegexFlags::GLOBAL);
        assert_eq!(source.to_string(), "/a|b/gi");
        assert_eq!(source.pattern().len(), 3);
    }
}
