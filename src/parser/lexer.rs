//! Tokenizer for ECMAScript pattern syntax

use crate::ast::{AssertionKind, Quantifier};
use crate::charset::{self, CodePointSet, MAX_CODE_POINT, MAX_CODE_UNIT};
use crate::error::{RegexError, Result};
use crate::flags::RegexFlags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Assertion(AssertionKind),
    BackReference(u32),
    NamedBackReference(String),
    Quantifier(Quantifier),
    Alternation,
    CaptureGroupBegin(Option<String>),
    NonCaptureGroupBegin,
    LookAheadBegin { negated: bool },
    LookBehindBegin { negated: bool },
    GroupEnd,
    /// A set of code points, to be inverted after case closure when `negated`
    CharClass { set: CodePointSet, negated: bool },
    UnicodeProperty,
}

/// One class atom: a single character or a predefined set such as `\d`
enum ClassAtom {
    Char(u32),
    Set(CodePointSet),
}

pub struct RegexLexer<'a> {
    pattern: &'a [u16],
    pos: usize,
    flags: RegexFlags,
    group_count: u32,
    has_named_groups: bool,
    saw_unicode_property: bool,
}

impl<'a> RegexLexer<'a> {
    pub fn new(pattern: &'a [u16], flags: RegexFlags) -> Self {
        let (group_count, has_named_groups) = prescan(pattern);
        Self {
            pattern,
            pos: 0,
            flags,
            group_count,
            has_named_groups,
            saw_unicode_property: false,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn pattern(&self) -> &'a [u16] {
        self.pattern
    }

    /// A `\p{...}` or `\P{...}` escape was read, inside a class or not
    pub fn saw_unicode_property(&self) -> bool {
        self.saw_unicode_property
    }

    fn unicode(&self) -> bool {
        self.flags.unicode()
    }

    fn max_char(&self) -> u32 {
        if self.unicode() {
            MAX_CODE_POINT
        } else {
            MAX_CODE_UNIT
        }
    }

    fn error<T>(&self, message: &str, position: usize) -> Result<T> {
        Err(RegexError::syntax(message, position))
    }

    fn peek(&self) -> Option<u16> {
        self.pattern.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u16> {
        self.pattern.get(self.pos + offset).copied()
    }

    fn at(&self, c: char) -> bool {
        self.peek() == Some(c as u16)
    }

    fn consume_if(&mut self, c: char) -> bool {
        if self.at(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn lookahead_is(&self, s: &str) -> bool {
        s.encode_utf16()
            .enumerate()
            .all(|(i, unit)| self.peek_at(i) == Some(unit))
    }

    /// Next code point. Surrogate pairs combine only in unicode mode.
    fn next_char(&mut self) -> Option<u32> {
        let unit = self.peek()? as u32;
        self.pos += 1;
        if self.unicode() && (0xD800..=0xDBFF).contains(&unit) {
            if let Some(trail) = self.peek().map(u32::from) {
                if (0xDC00..=0xDFFF).contains(&trail) {
                    self.pos += 1;
                    return Some(0x10000 + ((unit - 0xD800) << 10) + (trail - 0xDC00));
                }
            }
        }
        Some(unit)
    }

    fn single(c: u32) -> Token {
        Token::CharClass {
            set: CodePointSet::from_char(c),
            negated: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Option<(Token, usize)>> {
        let start = self.pos;
        let Some(c) = self.next_char() else {
            return Ok(None);
        };
        let token = match char::from_u32(c).unwrap_or('\u{FFFD}') {
            '^' => Token::Assertion(AssertionKind::Caret),
            '$' => Token::Assertion(AssertionKind::Dollar),
            '|' => Token::Alternation,
            ')' => Token::GroupEnd,
            '(' => self.group_begin(start)?,
            '[' => self.char_class(start)?,
            '.' => Token::CharClass {
                set: charset::dot(self.flags.dot_all(), self.max_char()),
                negated: false,
            },
            '\\' => self.escape(start)?,
            '*' => self.quantifier(0, None),
            '+' => self.quantifier(1, None),
            '?' => self.quantifier(0, Some(1)),
            '{' => match self.counted_quantifier(start)? {
                Some(token) => token,
                None if self.unicode() => return self.error("Incomplete quantifier", start),
                None => Self::single('{' as u32),
            },
            '}' | ']' if self.unicode() => return self.error("Lone quantifier brackets", start),
            _ => Self::single(c),
        };
        Ok(Some((token, start)))
    }

    fn quantifier(&mut self, min: u32, max: Option<u32>) -> Token {
        let greedy = !self.consume_if('?');
        Token::Quantifier(Quantifier { min, max, greedy })
    }

    /// `{n}`, `{n,}` or `{n,m}` after the opening brace. `None` leaves the lexer untouched.
    fn counted_quantifier(&mut self, start: usize) -> Result<Option<Token>> {
        let restore = self.pos;
        let Some(min) = self.decimal() else {
            return Ok(None);
        };
        let max = if self.consume_if(',') {
            if self.at('}') {
                None
            } else {
                match self.decimal() {
                    Some(max) => Some(max),
                    None => {
                        self.pos = restore;
                        return Ok(None);
                    }
                }
            }
        } else {
            Some(min)
        };
        if !self.consume_if('}') {
            self.pos = restore;
            return Ok(None);
        }
        if max.is_some_and(|max| max < min) {
            return self.error("numbers out of order in {} quantifier", start);
        }
        Ok(Some(self.quantifier(min, max)))
    }

    /// Saturating decimal number, `None` without at least one digit
    fn decimal(&mut self) -> Option<u32> {
        let mut value: Option<u32> = None;
        while let Some(digit) = self.peek().and_then(|u| char::from_u32(u as u32)?.to_digit(10)) {
            self.pos += 1;
            value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit));
        }
        value
    }

    fn group_begin(&mut self, start: usize) -> Result<Token> {
        if !self.consume_if('?') {
            return Ok(Token::CaptureGroupBegin(None));
        }
        if self.consume_if(':') {
            return Ok(Token::NonCaptureGroupBegin);
        }
        if self.consume_if('=') {
            return Ok(Token::LookAheadBegin { negated: false });
        }
        if self.consume_if('!') {
            return Ok(Token::LookAheadBegin { negated: true });
        }
        if self.lookahead_is("<=") {
            self.pos += 2;
            return Ok(Token::LookBehindBegin { negated: false });
        }
        if self.lookahead_is("<!") {
            self.pos += 2;
            return Ok(Token::LookBehindBegin { negated: true });
        }
        if self.consume_if('<') {
            let name = self.group_name()?;
            return Ok(Token::CaptureGroupBegin(Some(name)));
        }
        self.error("Invalid group", start)
    }

    /// Identifier up to and including the closing `>`
    fn group_name(&mut self) -> Result<String> {
        let start = self.pos;
        let mut name = String::new();
        loop {
            let position = self.pos;
            let Some(c) = self.next_char().and_then(char::from_u32) else {
                return self.error("Invalid capture group name", start);
            };
            if c == '>' {
                break;
            }
            let valid = if name.is_empty() {
                c == '$' || c == '_' || c.is_alphabetic()
            } else {
                c == '$' || c == '_' || c.is_alphanumeric()
            };
            if !valid {
                return self.error("Invalid capture group name", position);
            }
            name.push(c);
        }
        if name.is_empty() {
            return self.error("Invalid capture group name", start);
        }
        Ok(name)
    }

    fn escape(&mut self, start: usize) -> Result<Token> {
        let Some(c) = self.peek() else {
            return self.error("\\ at end of pattern", start);
        };
        let c = char::from_u32(c as u32).unwrap_or('\u{FFFD}');
        match c {
            'b' => {
                self.pos += 1;
                Ok(Token::Assertion(AssertionKind::WordBoundary))
            }
            'B' => {
                self.pos += 1;
                Ok(Token::Assertion(AssertionKind::NonWordBoundary))
            }
            '1'..='9' => {
                let restore = self.pos;
                let number = self.decimal().unwrap_or(0);
                if number <= self.group_count {
                    return Ok(Token::BackReference(number));
                }
                if self.unicode() {
                    return self.error("Invalid escape", start);
                }
                self.pos = restore;
                Ok(Self::single(self.legacy_octal_or_identity()))
            }
            'k' if self.unicode() || self.has_named_groups => {
                self.pos += 1;
                if !self.consume_if('<') {
                    return self.error("Invalid named reference", start);
                }
                let name = self.group_name()?;
                Ok(Token::NamedBackReference(name))
            }
            'p' | 'P' if self.unicode() => {
                self.property_escape(start)?;
                Ok(Token::UnicodeProperty)
            }
            _ => match self.atom_escape(start)? {
                ClassAtom::Char(c) => Ok(Self::single(c)),
                ClassAtom::Set(set) => Ok(Token::CharClass {
                    set,
                    negated: false,
                }),
            },
        }
    }

    /// `p{Name}` or `P{Name=Value}` after the backslash
    fn property_escape(&mut self, start: usize) -> Result<()> {
        self.pos += 1;
        if !self.consume_if('{') || self.at('}') {
            return self.error("Invalid property name", start);
        }
        while !self.consume_if('}') {
            let valid = self
                .next_char()
                .and_then(char::from_u32)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '=');
            if !valid {
                return self.error("Invalid property name", start);
            }
        }
        self.saw_unicode_property = true;
        Ok(())
    }

    fn word_chars(&self) -> CodePointSet {
        charset::word_chars(self.unicode() && self.flags.ignore_case())
    }

    /// Escapes shared by atoms and class atoms, positioned after the backslash
    fn atom_escape(&mut self, start: usize) -> Result<ClassAtom> {
        let Some(c) = self.next_char() else {
            return self.error("\\ at end of pattern", start);
        };
        let max = self.max_char();
        let atom = match char::from_u32(c).unwrap_or('\u{FFFD}') {
            'd' => ClassAtom::Set(charset::digits()),
            'D' => ClassAtom::Set(charset::digits().invert(max)),
            'w' => ClassAtom::Set(self.word_chars()),
            'W' => ClassAtom::Set(self.word_chars().invert(max)),
            's' => ClassAtom::Set(charset::whitespace()),
            'S' => ClassAtom::Set(charset::whitespace().invert(max)),
            't' => ClassAtom::Char(0x09),
            'n' => ClassAtom::Char(0x0A),
            'v' => ClassAtom::Char(0x0B),
            'f' => ClassAtom::Char(0x0C),
            'r' => ClassAtom::Char(0x0D),
            '0' if !self.peek().is_some_and(is_decimal_unit) => ClassAtom::Char(0),
            '0'..='7' if !self.unicode() => {
                self.pos -= 1;
                ClassAtom::Char(self.legacy_octal_or_identity())
            }
            'c' => match self.peek().and_then(|u| char::from_u32(u as u32)) {
                Some(letter) if letter.is_ascii_alphabetic() => {
                    self.pos += 1;
                    ClassAtom::Char(letter as u32 % 32)
                }
                _ if self.unicode() => return self.error("Invalid unicode escape", start),
                _ => {
                    // `\c` without a control letter is a literal backslash
                    self.pos -= 1;
                    ClassAtom::Char('\\' as u32)
                }
            },
            'x' => match self.hex_digits(2) {
                Some(value) => ClassAtom::Char(value),
                None if self.unicode() => return self.error("Invalid escape", start),
                None => ClassAtom::Char('x' as u32),
            },
            'u' => match self.unicode_escape()? {
                Some(value) => ClassAtom::Char(value),
                None if self.unicode() => return self.error("Invalid Unicode escape", start),
                None => ClassAtom::Char('u' as u32),
            },
            other if self.unicode() => {
                if "^$\\.*+?()[]{}|/".contains(other) {
                    ClassAtom::Char(c)
                } else {
                    return self.error("Invalid escape", start);
                }
            }
            _ => ClassAtom::Char(c),
        };
        Ok(atom)
    }

    /// Annex B: up to three octal digits (value at most 0o377), or `8`/`9` as themselves
    fn legacy_octal_or_identity(&mut self) -> u32 {
        let first = self.peek().map_or(0, u32::from);
        if !(('0' as u32)..=('7' as u32)).contains(&first) {
            self.pos += 1;
            return first;
        }
        let mut value = 0u32;
        for _ in 0..3 {
            match self.peek().map(u32::from) {
                Some(d) if (('0' as u32)..=('7' as u32)).contains(&d) => {
                    let next = value * 8 + (d - '0' as u32);
                    if next > 0o377 {
                        break;
                    }
                    value = next;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        value
    }

    fn hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut value = 0u32;
        for i in 0..count {
            let digit = self
                .peek_at(i)
                .and_then(|u| char::from_u32(u as u32))
                .and_then(|c| c.to_digit(16))?;
            value = value * 16 + digit;
        }
        self.pos += count;
        Some(value)
    }

    /// `\uXXXX`, a surrogate pair of those (unicode mode), or `\u{...}` (unicode mode)
    fn unicode_escape(&mut self) -> Result<Option<u32>> {
        if self.unicode() && self.consume_if('{') {
            let start = self.pos;
            let mut value = 0u32;
            let mut digits = 0;
            while let Some(digit) = self
                .peek()
                .and_then(|u| char::from_u32(u as u32))
                .and_then(|c| c.to_digit(16))
            {
                value = value.saturating_mul(16).saturating_add(digit);
                digits += 1;
                self.pos += 1;
            }
            if digits == 0 || value > MAX_CODE_POINT || !self.consume_if('}') {
                return self.error("Invalid Unicode escape", start);
            }
            return Ok(Some(value));
        }
        let Some(lead) = self.hex_digits(4) else {
            return Ok(None);
        };
        if self.unicode() && (0xD800..=0xDBFF).contains(&lead) && self.lookahead_is("\\u") {
            let restore = self.pos;
            self.pos += 2;
            match self.hex_digits(4) {
                Some(trail) if (0xDC00..=0xDFFF).contains(&trail) => {
                    return Ok(Some(0x10000 + ((lead - 0xD800) << 10) + (trail - 0xDC00)));
                }
                _ => self.pos = restore,
            }
        }
        Ok(Some(lead))
    }

    fn char_class(&mut self, start: usize) -> Result<Token> {
        let negated = self.consume_if('^');
        let mut set = CodePointSet::new();
        loop {
            if self.consume_if(']') {
                break;
            }
            let atom_start = self.pos;
            let Some(first) = self.class_atom(start)? else {
                return self.error("Unterminated character class", start);
            };
            if !(self.at('-') && self.peek_at(1).is_some_and(|u| u != ']' as u16)) {
                self.add_atom(&mut set, first);
                continue;
            }
            self.pos += 1;
            let Some(last) = self.class_atom(start)? else {
                return self.error("Unterminated character class", start);
            };
            match (first, last) {
                (ClassAtom::Char(lo), ClassAtom::Char(hi)) => {
                    if lo > hi {
                        return self.error("Range out of order in character class", atom_start);
                    }
                    set.add_range(lo, hi);
                }
                _ if self.unicode() => {
                    return self.error("Invalid character class", atom_start);
                }
                (first, last) => {
                    self.add_atom(&mut set, first);
                    set.add_char('-' as u32);
                    self.add_atom(&mut set, last);
                }
            }
        }
        Ok(Token::CharClass { set, negated })
    }

    fn add_atom(&self, set: &mut CodePointSet, atom: ClassAtom) {
        match atom {
            ClassAtom::Char(c) => set.add_char(c),
            ClassAtom::Set(other) => set.add_set(&other),
        }
    }

    fn class_atom(&mut self, class_start: usize) -> Result<Option<ClassAtom>> {
        let start = self.pos;
        let Some(c) = self.next_char() else {
            return Ok(None);
        };
        if c != '\\' as u32 {
            return Ok(Some(ClassAtom::Char(c)));
        }
        match self.peek().and_then(|u| char::from_u32(u as u32)) {
            None => self.error("Unterminated character class", class_start),
            Some('b') => {
                self.pos += 1;
                Ok(Some(ClassAtom::Char(0x08)))
            }
            Some('-') if self.unicode() => {
                self.pos += 1;
                Ok(Some(ClassAtom::Char('-' as u32)))
            }
            Some('1'..='9') if !self.unicode() => {
                Ok(Some(ClassAtom::Char(self.legacy_octal_or_identity())))
            }
            Some('k') if !self.unicode() => {
                self.pos += 1;
                Ok(Some(ClassAtom::Char('k' as u32)))
            }
            Some('p' | 'P') if self.unicode() => {
                // Placeholder; the pattern is handed to the fallback engine
                self.property_escape(start)?;
                Ok(Some(ClassAtom::Set(CodePointSet::new())))
            }
            _ => self.atom_escape(start).map(Some),
        }
    }
}

fn is_decimal_unit(unit: u16) -> bool {
    (b'0' as u16..=b'9' as u16).contains(&unit)
}

/// Count capture groups and detect group names ahead of parsing, so that `\N` and `\k`
/// can be classified on sight
fn prescan(pattern: &[u16]) -> (u32, bool) {
    let mut count = 0;
    let mut named = false;
    let mut in_class = false;
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            u if u == '\\' as u16 => i += 1,
            u if u == '[' as u16 => in_class = true,
            u if u == ']' as u16 => in_class = false,
            u if u == '(' as u16 && !in_class => {
                let next = pattern.get(i + 1).copied();
                if next != Some('?' as u16) {
                    count += 1;
                } else if pattern.get(i + 2).copied() == Some('<' as u16)
                    && !matches!(pattern.get(i + 3).copied(), Some(u) if u == '=' as u16 || u == '!' as u16)
                {
                    count += 1;
                    named = true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    (count, named)
}
