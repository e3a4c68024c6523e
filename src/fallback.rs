//! Backtracking engine for patterns the DFA pipeline declines
//!
//! The compiler hands every bailout to a [`FallbackCompiler`]. The default one translates
//! the ECMAScript pattern into `fancy-regex` syntax and runs it over a decoded copy of the
//! input.

use std::fmt;

use crate::error::Result;
use crate::flags::RegexSource;
use crate::input::RegexInput;
use crate::result::RegexResult;

/// Compiles patterns that the DFA pipeline cannot handle
pub trait FallbackCompiler: Send + Sync {
    fn compile(&self, source: &RegexSource) -> Result<Box<dyn FallbackRegex>>;
}

/// A pattern compiled by a [`FallbackCompiler`]
pub trait FallbackRegex: Send + Sync + fmt::Debug {
    fn exec(&self, input: &dyn RegexInput, from: usize) -> Result<RegexResult>;

    /// Number of groups, group 0 included
    fn group_count(&self) -> usize;

    fn name(&self) -> &'static str;
}

#[cfg(feature = "fancy-fallback")]
pub use fancy::FancyFallback;

#[cfg(feature = "fancy-fallback")]
mod fancy {
    use std::fmt::Write;

    use log::trace;

    use super::{FallbackCompiler, FallbackRegex};
    use crate::error::{RegexError, Result};
    use crate::flags::RegexSource;
    use crate::input::{collect_units, RegexInput};
    use crate::result::{Captures, RegexResult};

    const LINE_TERMINATORS: &str = r"\n\r\x{2028}\x{2029}";
    const META: &str = r"\.+*?()|[]{}^$#&-~";
    const WORD: &str = "0-9A-Za-z_";
    const WHITESPACE: &str = r"\t\n\x{0B}\x{0C}\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

    /// Fallback on top of `fancy-regex`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FancyFallback;

    impl FallbackCompiler for FancyFallback {
        fn compile(&self, source: &RegexSource) -> Result<Box<dyn FallbackRegex>> {
            let pattern = translate(source);
            trace!("fallback pattern for {source}: {pattern}");
            let regex =
                fancy_regex::Regex::new(&pattern).map_err(|e| RegexError::Fallback(e.to_string()))?;
            Ok(Box::new(FancyRegex {
                group_count: regex.captures_len(),
                regex,
                sticky: source.flags().sticky(),
                unicode: source.flags().unicode(),
            }))
        }
    }

    #[derive(Debug)]
    struct FancyRegex {
        regex: fancy_regex::Regex,
        group_count: usize,
        sticky: bool,
        unicode: bool,
    }

    impl FallbackRegex for FancyRegex {
        fn exec(&self, input: &dyn RegexInput, from: usize) -> Result<RegexResult> {
            if from > input.len() {
                return Ok(RegexResult::NoMatch);
            }
            let decoded = DecodedInput::new(input, self.unicode);
            let start = decoded.byte_of_unit[from];
            let captures = self
                .regex
                .captures_from_pos(&decoded.text, start)
                .map_err(|e| RegexError::Fallback(e.to_string()))?;
            let Some(captures) = captures else {
                return Ok(RegexResult::NoMatch);
            };
            if self.sticky && captures.get(0).map(|m| m.start()) != Some(start) {
                return Ok(RegexResult::NoMatch);
            }
            let mut indices = vec![-1i32; self.group_count * 2];
            for group in 0..self.group_count {
                if let Some(m) = captures.get(group) {
                    indices[group * 2] = decoded.unit_of_byte[m.start()] as i32;
                    indices[group * 2 + 1] = decoded.unit_of_byte[m.end()] as i32;
                }
            }
            Ok(RegexResult::Match(Captures::from_indices(indices)))
        }

        fn group_count(&self) -> usize {
            self.group_count
        }

        fn name(&self) -> &'static str {
            "fancy-regex"
        }
    }

    /// Surrogate code units that are not half of a decoded pair stand for themselves as
    /// plane 15 private use characters, one to one
    const SURROGATE_CHARS: u32 = 0xF0000;

    fn text_char(c: u32) -> u32 {
        if (0xD800..=0xDFFF).contains(&c) {
            SURROGATE_CHARS + (c - 0xD800)
        } else {
            c
        }
    }

    fn unit_char(unit: u16) -> char {
        char::from_u32(text_char(u32::from(unit))).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    /// UTF-16 input decoded to UTF-8. Outside unicode mode every code unit becomes its own
    /// character, so `.` and back-references see code units.
    struct DecodedInput {
        text: String,
        /// Byte offset for every code unit offset. The trail unit of a pair maps past the pair.
        byte_of_unit: Vec<usize>,
        /// Code unit offset for every byte offset that starts a character
        unit_of_byte: Vec<usize>,
    }

    impl DecodedInput {
        fn new(input: &dyn RegexInput, unicode: bool) -> Self {
            let units = collect_units(input);
            let chars: Vec<(char, usize)> = if unicode {
                char::decode_utf16(units.iter().copied())
                    .map(|decoded| match decoded {
                        Ok(c) => (c, c.len_utf16()),
                        Err(e) => (unit_char(e.unpaired_surrogate()), 1),
                    })
                    .collect()
            } else {
                units.iter().map(|&unit| (unit_char(unit), 1)).collect()
            };
            let mut text = String::with_capacity(units.len());
            let mut byte_of_unit = Vec::with_capacity(units.len() + 1);
            let mut unit_of_byte = Vec::with_capacity(units.len() + 1);
            let mut unit = 0;
            for (c, width) in chars {
                byte_of_unit.push(text.len());
                if width == 2 {
                    byte_of_unit.push(text.len() + c.len_utf8());
                }
                unit_of_byte.extend(std::iter::repeat(unit).take(c.len_utf8()));
                text.push(c);
                unit += width;
            }
            byte_of_unit.push(text.len());
            unit_of_byte.push(unit);
            Self {
                text,
                byte_of_unit,
                unit_of_byte,
            }
        }
    }

    /// Rewrite an ECMAScript pattern in `fancy-regex` syntax
    pub(super) fn translate(source: &RegexSource) -> String {
        let flags = source.flags();
        let mut translator = Translator {
            pattern: source.pattern(),
            pos: 0,
            out: String::new(),
            unicode: flags.unicode(),
            dot_all: flags.dot_all(),
            multiline: flags.multiline(),
            ignore_case: flags.ignore_case(),
            groups: scan_groups(source.pattern()),
        };
        if flags.ignore_case() {
            translator.out.push_str("(?i)");
        }
        translator.run();
        translator.out
    }

    /// Capture groups in order of their opening parenthesis
    #[derive(Debug, Default)]
    struct GroupScan {
        count: u32,
        names: Vec<(String, u32)>,
    }

    impl GroupScan {
        fn number_of(&self, name: &str) -> Option<u32> {
            self.names
                .iter()
                .find(|(group, _)| group == name)
                .map(|&(_, number)| number)
        }
    }

    fn scan_groups(pattern: &[u16]) -> GroupScan {
        let mut scan = GroupScan::default();
        let mut in_class = false;
        let mut i = 0;
        while i < pattern.len() {
            match pattern[i] {
                0x5C => i += 1,
                0x5B => in_class = true,
                0x5D => in_class = false,
                0x28 if !in_class => {
                    let question = pattern.get(i + 1) == Some(&u16::from(b'?'));
                    let named = question
                        && pattern.get(i + 2) == Some(&u16::from(b'<'))
                        && !matches!(pattern.get(i + 3), Some(&0x3D) | Some(&0x21));
                    if !question || named {
                        scan.count += 1;
                    }
                    if named {
                        let name: Vec<u16> = pattern[i + 3..]
                            .iter()
                            .copied()
                            .take_while(|&unit| unit != u16::from(b'>'))
                            .collect();
                        scan.names
                            .push((String::from_utf16_lossy(&name), scan.count));
                    }
                }
                _ => {}
            }
            i += 1;
        }
        scan
    }

    /// A translated pattern piece: one character, or ready-made `fancy-regex` syntax
    enum Atom {
        Char(u32),
        Syntax(String),
    }

    fn class_escape(body: &str, negated: bool, in_class: bool) -> String {
        match (in_class, negated) {
            (true, false) => body.to_string(),
            (_, true) => format!("[^{body}]"),
            (false, false) => format!("[{body}]"),
        }
    }

    /// ECMAScript leaves a reference to a group that did not participate empty
    fn back_reference(number: u32) -> String {
        format!(r"(?({number})\{number})")
    }

    struct Translator<'a> {
        pattern: &'a [u16],
        pos: usize,
        out: String,
        unicode: bool,
        dot_all: bool,
        multiline: bool,
        ignore_case: bool,
        groups: GroupScan,
    }

    impl Translator<'_> {
        fn peek(&self, offset: usize) -> Option<u16> {
            self.pattern.get(self.pos + offset).copied()
        }

        fn peek_ascii(&self, offset: usize) -> Option<char> {
            self.peek(offset)
                .filter(|&unit| unit < 0x80)
                .map(|unit| unit as u8 as char)
        }

        /// Next character. Surrogate pairs combine only in unicode mode.
        fn next_char(&mut self) -> u32 {
            let unit = u32::from(self.pattern[self.pos]);
            self.pos += 1;
            if self.unicode && (0xD800..0xDC00).contains(&unit) {
                if let Some(trail) = self.peek(0).map(u32::from) {
                    if (0xDC00..0xE000).contains(&trail) {
                        self.pos += 1;
                        return 0x10000 + ((unit - 0xD800) << 10) + (trail - 0xDC00);
                    }
                }
            }
            unit
        }

        /// Append a literal character, escaped when it means something to `fancy-regex`
        fn push_char(&mut self, c: u32) {
            let c = text_char(c);
            match char::from_u32(c) {
                Some(ch) if ch.is_control() || META.contains(ch) => {
                    let _ = write!(self.out, "\\x{{{c:X}}}");
                }
                Some(ch) => self.out.push(ch),
                None => self.out.push_str(r"\x{FFFD}"),
            }
        }

        /// Class range, with the surrogate part moved to its stand-ins
        fn push_range(&mut self, lo: u32, hi: u32) {
            let pieces = [
                (lo, hi.min(0xD7FF)),
                (lo.max(0xD800), hi.min(0xDFFF)),
                (lo.max(0xE000), hi),
            ];
            for (lo, hi) in pieces {
                if lo > hi {
                    continue;
                }
                self.push_char(lo);
                if hi > lo {
                    self.out.push('-');
                    self.push_char(hi);
                }
            }
        }

        fn push_atom(&mut self, atom: Atom) {
            match atom {
                Atom::Char(c) => self.push_char(c),
                Atom::Syntax(syntax) => self.out.push_str(&syntax),
            }
        }

        fn run(&mut self) {
            while self.pos < self.pattern.len() {
                match self.peek_ascii(0) {
                    Some('\\') => {
                        let atom = self.escape(false);
                        self.push_atom(atom);
                    }
                    Some('[') => self.class(),
                    Some('.') => {
                        self.pos += 1;
                        if self.dot_all {
                            self.out.push_str("(?s:.)");
                        } else {
                            let _ = write!(self.out, "[^{LINE_TERMINATORS}]");
                        }
                    }
                    Some('^') => {
                        self.pos += 1;
                        if self.multiline {
                            let _ = write!(self.out, "(?:^|(?<=[{LINE_TERMINATORS}]))");
                        } else {
                            self.out.push('^');
                        }
                    }
                    Some('$') => {
                        self.pos += 1;
                        if self.multiline {
                            let _ = write!(self.out, "(?:$|(?=[{LINE_TERMINATORS}]))");
                        } else {
                            self.out.push('$');
                        }
                    }
                    Some('(') => {
                        let named = self.peek_ascii(1) == Some('?')
                            && self.peek_ascii(2) == Some('<')
                            && !matches!(self.peek_ascii(3), Some('=') | Some('!'));
                        self.out.push('(');
                        self.pos += 1;
                        if named {
                            // groups are addressed by number, the name is dropped
                            self.pos += 2;
                            while let Some(unit) = self.peek(0) {
                                self.pos += 1;
                                if unit == u16::from(b'>') {
                                    break;
                                }
                            }
                        }
                    }
                    Some('{') => match self.quantifier_len() {
                        Some(len) => {
                            for _ in 0..len {
                                let c = self.next_char();
                                self.out.push(char::from_u32(c).unwrap_or('?'));
                            }
                        }
                        None => {
                            self.pos += 1;
                            self.out.push_str(r"\{");
                        }
                    },
                    Some(c @ ('*' | '+' | '?' | '|' | ')')) => {
                        self.pos += 1;
                        self.out.push(c);
                    }
                    _ => {
                        let c = self.next_char();
                        self.push_char(c);
                    }
                }
            }
        }

        /// Length of a `{n}`, `{n,}` or `{n,m}` quantifier at the current position
        fn quantifier_len(&self) -> Option<usize> {
            let mut offset = 1;
            let digits = |offset: &mut usize| {
                let start = *offset;
                while self.peek_ascii(*offset).is_some_and(|c| c.is_ascii_digit()) {
                    *offset += 1;
                }
                *offset > start
            };
            if !digits(&mut offset) {
                return None;
            }
            if self.peek_ascii(offset) == Some(',') {
                offset += 1;
                digits(&mut offset);
            }
            (self.peek_ascii(offset) == Some('}')).then_some(offset + 1)
        }

        /// Character class. `[`, `&` and `~` are set operators in `fancy-regex` classes and go
        /// through `push_char` like every other meta character.
        fn class(&mut self) {
            self.pos += 1;
            let negated = self.peek_ascii(0) == Some('^');
            if negated {
                self.pos += 1;
            }
            if self.peek_ascii(0) == Some(']') {
                self.pos += 1;
                self.out
                    .push_str(if negated { "(?s:.)" } else { r"[^\x{0}-\x{10FFFF}]" });
                return;
            }
            self.out.push_str(if negated { "[^" } else { "[" });
            while self.pos < self.pattern.len() {
                if self.peek_ascii(0) == Some(']') {
                    self.pos += 1;
                    break;
                }
                let first = self.class_atom();
                let range = self.peek_ascii(0) == Some('-')
                    && self.peek(1).is_some_and(|unit| unit != u16::from(b']'));
                if !range {
                    self.push_atom(first);
                    continue;
                }
                self.pos += 1;
                match (first, self.class_atom()) {
                    (Atom::Char(lo), Atom::Char(hi)) => self.push_range(lo, hi),
                    (first, last) => {
                        self.push_atom(first);
                        self.push_char('-' as u32);
                        self.push_atom(last);
                    }
                }
            }
            self.out.push(']');
        }

        fn class_atom(&mut self) -> Atom {
            if self.peek_ascii(0) == Some('\\') {
                self.escape(true)
            } else {
                Atom::Char(self.next_char())
            }
        }

        /// ECMAScript `\b` only knows ASCII word characters, plus U+017F and U+212A in
        /// ignore case unicode patterns
        fn word_boundary(&self, negated: bool) -> String {
            let mut word = format!("[{WORD}");
            if self.unicode && self.ignore_case {
                word.push_str(r"\x{17F}\x{212A}");
            }
            word.push(']');
            if self.ignore_case {
                word = format!("(?-i:{word})");
            }
            if negated {
                format!("(?:(?<={word})(?={word})|(?<!{word})(?!{word}))")
            } else {
                format!("(?:(?<={word})(?!{word})|(?<!{word})(?={word}))")
            }
        }

        fn hex(&self, offset: usize, len: usize) -> Option<u32> {
            let mut value = 0;
            for i in 0..len {
                value = value * 16 + self.peek_ascii(offset + i)?.to_digit(16)?;
            }
            Some(value)
        }

        fn escape(&mut self, in_class: bool) -> Atom {
            self.pos += 1;
            let Some(c) = self.peek_ascii(0) else {
                if self.pos < self.pattern.len() {
                    return Atom::Char(self.next_char());
                }
                return Atom::Syntax(String::new());
            };
            self.pos += 1;
            match c {
                'd' | 'D' => Atom::Syntax(class_escape("0-9", c == 'D', in_class)),
                'w' | 'W' => Atom::Syntax(class_escape(WORD, c == 'W', in_class)),
                's' | 'S' => Atom::Syntax(class_escape(WHITESPACE, c == 'S', in_class)),
                'b' if in_class => Atom::Char(0x08),
                'B' if in_class => Atom::Char('B' as u32),
                'b' | 'B' => Atom::Syntax(self.word_boundary(c == 'B')),
                't' => Atom::Char(0x09),
                'n' => Atom::Char(0x0A),
                'v' => Atom::Char(0x0B),
                'f' => Atom::Char(0x0C),
                'r' => Atom::Char(0x0D),
                'c' => match self.peek_ascii(0).filter(char::is_ascii_alphabetic) {
                    Some(letter) => {
                        self.pos += 1;
                        Atom::Char(letter as u32 % 32)
                    }
                    None => {
                        // `\c` without a letter is a literal backslash
                        self.pos -= 1;
                        Atom::Char('\\' as u32)
                    }
                },
                'x' => match self.hex(0, 2) {
                    Some(value) => {
                        self.pos += 2;
                        Atom::Char(value)
                    }
                    None => Atom::Char('x' as u32),
                },
                'u' => self.unicode_escape(),
                'k' => self.named_reference(in_class),
                'p' | 'P' if self.unicode && self.peek_ascii(0) == Some('{') => {
                    let mut syntax = format!("\\{c}");
                    while let Some(unit) = self.peek(0) {
                        self.pos += 1;
                        syntax.push(char::from_u32(u32::from(unit)).unwrap_or('?'));
                        if unit == u16::from(b'}') {
                            break;
                        }
                    }
                    Atom::Syntax(syntax)
                }
                '0'..='9' => self.decimal_escape(c, in_class),
                _ => Atom::Char(c as u32),
            }
        }

        /// `\k<name>`, positioned after the `k`. Without named groups and outside unicode mode
        /// it is an identity escape.
        fn named_reference(&mut self, in_class: bool) -> Atom {
            if in_class || !(self.unicode || !self.groups.names.is_empty()) {
                return Atom::Char('k' as u32);
            }
            let end = (self.peek_ascii(0) == Some('<'))
                .then(|| {
                    (1..)
                        .take_while(|&i| self.peek(i).is_some())
                        .find(|&i| self.peek_ascii(i) == Some('>'))
                })
                .flatten();
            let Some(end) = end else {
                return Atom::Char('k' as u32);
            };
            let name = String::from_utf16_lossy(&self.pattern[self.pos + 1..self.pos + end]);
            match self.groups.number_of(&name) {
                Some(number) => {
                    self.pos += end + 1;
                    Atom::Syntax(back_reference(number))
                }
                None => Atom::Char('k' as u32),
            }
        }

        fn unicode_escape(&mut self) -> Atom {
            if self.unicode && self.peek_ascii(0) == Some('{') {
                let end = (1..)
                    .take_while(|&i| self.peek(i).is_some())
                    .find(|&i| self.peek_ascii(i) == Some('}'));
                if let Some(end) = end.filter(|&end| end <= 7) {
                    if let Some(value) = self.hex(1, end - 1) {
                        self.pos += end + 1;
                        return Atom::Char(value);
                    }
                }
                return Atom::Char('u' as u32);
            }
            let Some(unit) = self.hex(0, 4) else {
                return Atom::Char('u' as u32);
            };
            self.pos += 4;
            if self.unicode
                && (0xD800..0xDC00).contains(&unit)
                && self.peek_ascii(0) == Some('\\')
                && self.peek_ascii(1) == Some('u')
            {
                if let Some(trail) = self.hex(2, 4).filter(|t| (0xDC00..0xE000).contains(t)) {
                    self.pos += 6;
                    return Atom::Char(0x10000 + ((unit - 0xD800) << 10) + (trail - 0xDC00));
                }
            }
            Atom::Char(unit)
        }

        fn decimal_escape(&mut self, first: char, in_class: bool) -> Atom {
            let start = self.pos - 1;
            while self.peek_ascii(0).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits = String::from_utf16_lossy(&self.pattern[start..self.pos]);
            if first != '0' && !in_class {
                if let Ok(number) = digits.parse::<u32>() {
                    if number <= self.groups.count {
                        return Atom::Syntax(back_reference(number));
                    }
                }
            }
            // Legacy octal escape: up to three octal digits, at most \377
            self.pos = start;
            if matches!(first, '8' | '9') {
                self.pos += 1;
                return Atom::Char(first as u32);
            }
            let mut value = 0;
            let mut len = 0;
            while len < 3 {
                match self.peek_ascii(0).and_then(|c| c.to_digit(8)) {
                    Some(digit) if value * 8 + digit <= 0o377 => {
                        value = value * 8 + digit;
                        self.pos += 1;
                        len += 1;
                    }
                    _ => break,
                }
            }
            Atom::Char(value)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::flags::RegexFlags;

        fn translated(pattern: &str, flags: &str) -> String {
            translate(&RegexSource::new(pattern, RegexFlags::parse(flags).unwrap()))
        }

        fn exec_units(pattern: &str, flags: &str, units: &[u16], from: usize) -> RegexResult {
            let source = RegexSource::new(pattern, RegexFlags::parse(flags).unwrap());
            let regex = FancyFallback.compile(&source).unwrap();
            regex.exec(&units, from).unwrap()
        }

        fn exec(pattern: &str, flags: &str, input: &str, from: usize) -> RegexResult {
            let units: Vec<u16> = input.encode_utf16().collect();
            exec_units(pattern, flags, &units, from)
        }

        #[test]
        fn test_translation() {
            assert_eq!(
                translated(r"(?<year>\d{4})-\k<year>", ""),
                r"([0-9]{4})\x{2D}(?(1)\1)"
            );
            assert_eq!(translated(r"\1(a)", ""), r"(?(1)\1)(a)");
            assert_eq!(translated(r"a{", ""), r"a\{");
            assert_eq!(translated(r"[^]", ""), "(?s:.)");
            assert_eq!(translated(r"[\d&]", ""), r"[0-9\x{26}]");
            assert_eq!(translated(r"A", ""), "A");
            assert_eq!(translated(r"\101", ""), "A");
            assert_eq!(translated("a", "i"), "(?i)a");
            assert_eq!(translated(".", "s"), "(?s:.)");
            assert_eq!(translated(r"[\uD800-\uDFFF]", ""), "[\u{F0000}-\u{F07FF}]");
            assert_eq!(
                translated("[\\u0000-\u{FFFF}]", ""),
                "[\\x{0}-\u{D7FF}\u{F0000}-\u{F07FF}\u{E000}-\u{FFFF}]"
            );
            assert_eq!(translated(r"\k<a>", ""), "k<a>");
        }

        #[test]
        fn test_back_reference_match() {
            let result = exec(r"(a)\1", "", "xaa", 0);
            assert_eq!(result.get(0), Some((1, 3)));
            assert_eq!(result.get(1), Some((1, 2)));
        }

        #[test]
        fn test_back_reference_to_unset_group_matches_empty() {
            assert_eq!(exec(r"(a)|\1b", "", "b", 0).get(0), Some((0, 1)));
            assert_eq!(exec(r"\1(a)", "", "a", 0).get(0), Some((0, 1)));
            assert_eq!(exec(r"\k<n>(?<n>a)", "", "a", 0).get(0), Some((0, 1)));
            assert_eq!(exec(r"(a)\k<n>", "", "ak<n>", 0).get(0), Some((0, 5)));
        }

        #[test]
        fn test_offsets_are_code_units() {
            let result = exec("b", "", "\u{1F600}b", 0);
            assert_eq!(result.get(0), Some((2, 3)));
            let result = exec(r"(?<=\u{1F600})b", "u", "\u{1F600}b", 1);
            assert_eq!(result.get(0), Some((2, 3)));
        }

        #[test]
        fn test_code_units_outside_unicode_mode() {
            assert!(!exec(r"(.)\1", "", "\u{1F600}\u{1F600}", 0).is_match());
            assert_eq!(exec(r"(.)\1", "u", "\u{1F600}\u{1F600}", 0).get(0), Some((0, 4)));
            assert_eq!(exec(r"^(.)", "", "\u{1F600}", 0).get(0), Some((0, 1)));
            // two different lone surrogates are not equal
            assert!(!exec_units(r"(.)\1", "", &[0xD800, 0xD801], 0).is_match());
            assert_eq!(
                exec_units(r"(.)\1", "", &[0xD800, 0xD800], 0).get(0),
                Some((0, 2))
            );
            assert_eq!(exec(r"[\uD800-\uDBFF](a)\1", "", "\u{1F600}aa", 0).get(0), None);
            assert_eq!(
                exec_units(r"[\uD800-\uDBFF](a)\1", "", &[0xD83D, 0x61, 0x61], 0).get(0),
                Some((0, 3))
            );
        }

        #[test]
        fn test_word_boundary_is_ascii() {
            assert_eq!(exec(r"(a)\b", "", "a\u{E9}", 0).get(0), Some((0, 1)));
            assert!(!exec(r"(a)\b", "iu", "a\u{212A}", 0).is_match());
            assert_eq!(exec(r"(a)\b", "i", "a\u{212A}", 0).get(0), Some((0, 1)));
            assert_eq!(exec(r"(a)\B", "", "ab", 0).get(0), Some((0, 1)));
        }

        #[test]
        fn test_sticky_and_multiline() {
            assert!(!exec("b", "y", "ab", 0).is_match());
            assert_eq!(exec("b", "y", "ab", 1).get(0), Some((1, 2)));
            assert_eq!(exec("^b", "m", "a\rb", 0).get(0), Some((2, 3)));
            assert!(!exec("a", "", "a", 2).is_match());
        }
    }
}
