//! ECMAScript pattern parser
//!
//! Builds the AST without recursion: the parser keeps pointers to the current group and
//! alternative and walks parent links when a group closes.

mod lexer;
mod properties;

pub use lexer::{RegexLexer, Token};
pub use properties::RegexProperties;

use log::trace;

use crate::ast::visitors::CalcPathLengthVisitor;
use crate::ast::{AssertionKind, NodeFlags, NodeId, NodeKind, Quantifier, RegexAst};
use crate::charset::{CodePointSet, MAX_CODE_POINT, MAX_CODE_UNIT};
use crate::error::{RegexError, Result};
use crate::flags::{RegexFlags, RegexSource};
use crate::options::RegexOptions;

/// Parse a pattern into an AST and compute its [`RegexProperties`]
pub fn parse(source: &RegexSource, options: &RegexOptions) -> Result<RegexAst> {
    RegexParser::new(source, options)?.parse()
}

pub struct RegexParser<'a> {
    lexer: RegexLexer<'a>,
    flags: RegexFlags,
    ast: RegexAst,
    cur_group: NodeId,
    cur_sequence: NodeId,
    /// The last term, the one a following quantifier applies to
    cur_term: Option<NodeId>,
    pattern_len: usize,
    max_counted_repetition: u32,
}

impl<'a> RegexParser<'a> {
    pub fn new(source: &'a RegexSource, options: &RegexOptions) -> Result<Self> {
        let flags = source.flags();
        let ast = RegexAst::new(flags, options.max_parse_tree_size)?;
        let cur_group = ast.root_group();
        let cur_sequence = ast
            .group(cur_group)
            .and_then(|group| group.alternatives.first().copied())
            .unwrap_or(cur_group);
        Ok(Self {
            lexer: RegexLexer::new(source.pattern(), flags),
            flags,
            ast,
            cur_group,
            cur_sequence,
            cur_term: None,
            pattern_len: source.pattern().len(),
            max_counted_repetition: options.max_counted_repetition,
        })
    }

    pub fn parse(mut self) -> Result<RegexAst> {
        while let Some((token, position)) = self.lexer.next_token()? {
            trace!("token {token:?} at {position}");
            match token {
                Token::CharClass { set, negated } => self.add_char_class(set, negated)?,
                Token::Assertion(kind) => {
                    self.add_term(NodeKind::PositionAssertion(kind))?;
                }
                Token::BackReference(number) => self.add_back_reference(number)?,
                Token::NamedBackReference(name) => {
                    let number = self
                        .ast
                        .group_names
                        .iter()
                        .find(|(existing, _)| *existing == name)
                        .map(|(_, number)| *number);
                    // Forward references resolve once the whole pattern is known
                    let number = match number {
                        Some(number) => number,
                        None => self.forward_group_number(&name, position)?,
                    };
                    self.add_back_reference(number)?;
                }
                Token::Quantifier(quantifier) => self.add_quantifier(quantifier, position)?,
                Token::Alternation => {
                    self.ast.properties |= RegexProperties::ALTERNATIONS;
                    self.cur_sequence = self.ast.add_alternative(self.cur_group)?;
                    self.cur_term = None;
                }
                Token::CaptureGroupBegin(name) => {
                    let number = self.ast.group_count;
                    self.ast.group_count += 1;
                    if let Some(name) = name {
                        if self.ast.group_names.iter().any(|(n, _)| *n == name) {
                            return Err(RegexError::syntax("Duplicate capture group name", position));
                        }
                        self.ast.group_names.push((name, number));
                    }
                    self.ast.properties |= RegexProperties::CAPTURE_GROUPS;
                    let group = self.ast.add_group(self.cur_sequence, Some(number))?;
                    if self.ast.node(group).flags.contains(NodeFlags::IN_LOOKAROUND) {
                        self.ast.properties |= RegexProperties::CAPTURE_GROUPS_IN_LOOKAROUND;
                    }
                    self.enter_group(group)?;
                }
                Token::NonCaptureGroupBegin => {
                    let group = self.ast.add_group(self.cur_sequence, None)?;
                    self.enter_group(group)?;
                }
                Token::LookAheadBegin { negated } => {
                    self.ast.properties |= if negated {
                        RegexProperties::NEGATIVE_LOOKAHEAD
                    } else {
                        RegexProperties::LOOKAHEAD
                    };
                    self.enter_lookaround(false, negated)?;
                }
                Token::LookBehindBegin { negated } => {
                    self.ast.properties |= if negated {
                        RegexProperties::NEGATIVE_LOOKBEHIND
                    } else {
                        RegexProperties::LOOKBEHIND
                    };
                    self.enter_lookaround(true, negated)?;
                }
                Token::GroupEnd => self.close_group(position)?,
                Token::UnicodeProperty => {
                    // Stand-in so that quantifiers and positions stay valid
                    self.add_term(NodeKind::CharacterClass(CodePointSet::new()))?;
                }
            }
        }
        if self.cur_group != self.ast.root_group() {
            return Err(RegexError::syntax("Unterminated group", self.pattern_len));
        }
        // Reported only once the whole pattern is known to be well-formed
        if self.lexer.saw_unicode_property() {
            self.ast.properties |= RegexProperties::UNICODE_PROPERTIES;
            return Err(RegexError::unsupported("unicode property escapes"));
        }
        self.mark_complex_lookbehinds();
        Ok(self.ast)
    }

    fn add_term(&mut self, kind: NodeKind) -> Result<NodeId> {
        let term = self.ast.add_term(self.cur_sequence, kind)?;
        self.cur_term = Some(term);
        Ok(term)
    }

    fn add_back_reference(&mut self, number: u32) -> Result<()> {
        self.ast.properties |= RegexProperties::BACK_REFERENCES;
        self.add_term(NodeKind::BackReference(number))?;
        Ok(())
    }

    /// Group number of a named group that has not been opened yet
    fn forward_group_number(&self, name: &str, position: usize) -> Result<u32> {
        let mut lexer = RegexLexer::new(self.lexer.pattern(), self.flags);
        let mut number = 0;
        while let Ok(Some((token, _))) = lexer.next_token() {
            if let Token::CaptureGroupBegin(group_name) = token {
                number += 1;
                if group_name.as_deref() == Some(name) {
                    return Ok(number);
                }
            }
        }
        Err(RegexError::syntax("Invalid named capture referenced", position))
    }

    fn max_char(&self) -> u32 {
        if self.flags.unicode() {
            MAX_CODE_POINT
        } else {
            MAX_CODE_UNIT
        }
    }

    /// Apply case closure and negation, then lower the set to UTF-16 code unit classes
    fn add_char_class(&mut self, set: CodePointSet, negated: bool) -> Result<()> {
        let unicode = self.flags.unicode();
        let mut set = if self.flags.ignore_case() {
            set.case_close(unicode)
        } else {
            set
        };
        if negated {
            set = set.invert(self.max_char());
        }
        if set.single_char().is_none() {
            self.ast.properties |= RegexProperties::CHAR_CLASSES;
        }
        if !unicode {
            self.add_term(NodeKind::CharacterClass(
                set.intersect_range(0, MAX_CODE_UNIT),
            ))?;
            return Ok(());
        }
        let split = set.split_utf16();
        if split.pairs.is_empty() && !split.has_lone_surrogates() {
            self.add_term(NodeKind::CharacterClass(split.single))?;
            return Ok(());
        }
        // One alternative per lead surrogate range, then the single unit part, then lone
        // surrogates that must not form a pair with their neighbour
        self.ast.properties |= RegexProperties::ALTERNATIONS;
        let group = self.ast.add_group(self.cur_sequence, None)?;
        for (leads, trails) in split.pairs {
            let sequence = self.ast.add_alternative(group)?;
            self.ast
                .add_term(sequence, NodeKind::CharacterClass(leads))?;
            self.ast
                .add_term(sequence, NodeKind::CharacterClass(trails))?;
        }
        if !split.single.is_empty() {
            let sequence = self.ast.add_alternative(group)?;
            self.ast
                .add_term(sequence, NodeKind::CharacterClass(split.single))?;
        }
        let boundary = NodeKind::PositionAssertion(AssertionKind::CodePointBoundary);
        if !split.lone_leads.is_empty() {
            let sequence = self.ast.add_alternative(group)?;
            self.ast
                .add_term(sequence, NodeKind::CharacterClass(split.lone_leads))?;
            self.ast.add_term(sequence, boundary.clone())?;
        }
        if !split.lone_trails.is_empty() {
            let sequence = self.ast.add_alternative(group)?;
            self.ast.add_term(sequence, boundary)?;
            self.ast
                .add_term(sequence, NodeKind::CharacterClass(split.lone_trails))?;
        }
        self.cur_term = Some(group);
        Ok(())
    }

    fn enter_group(&mut self, group: NodeId) -> Result<()> {
        self.cur_group = group;
        self.cur_sequence = self.ast.add_alternative(group)?;
        self.cur_term = None;
        Ok(())
    }

    fn enter_lookaround(&mut self, behind: bool, negated: bool) -> Result<()> {
        let term = self.ast.add_lookaround(self.cur_sequence, behind, negated)?;
        let group = self
            .ast
            .node(term)
            .kind
            .subtree_root()
            .map_or(term, |root| root.group);
        self.enter_group(group)
    }

    fn close_group(&mut self, position: usize) -> Result<()> {
        if self.cur_group == self.ast.root_group() {
            return Err(RegexError::syntax("Unmatched ')'", position));
        }
        // The closed term is the group itself, or the lookaround owning it
        let mut term = self.cur_group;
        if let Some(parent) = self.ast.node(term).parent {
            if self.ast.node(parent).kind.is_lookaround() {
                term = parent;
            }
        }
        let sequence = self
            .ast
            .node(term)
            .parent
            .ok_or_else(|| RegexError::syntax("Unmatched ')'", position))?;
        let group = self
            .ast
            .node(sequence)
            .parent
            .ok_or_else(|| RegexError::syntax("Unmatched ')'", position))?;
        self.cur_sequence = sequence;
        self.cur_group = group;
        self.cur_term = Some(term);
        Ok(())
    }

    fn add_quantifier(&mut self, quantifier: Quantifier, position: usize) -> Result<()> {
        let Some(term) = self.cur_term else {
            return Err(RegexError::syntax("Nothing to repeat", position));
        };
        match self.ast.node(term).kind {
            NodeKind::PositionAssertion(_) | NodeKind::LookBehind(_) => {
                return Err(RegexError::syntax("Nothing to repeat", position));
            }
            NodeKind::LookAhead(_) => {
                if self.flags.unicode() {
                    return Err(RegexError::syntax("Nothing to repeat", position));
                }
                // Annex B: a quantified lookahead either vanishes or asserts once
                if quantifier.min == 0 {
                    self.ast.remove_subtree(term);
                }
                self.cur_term = None;
                return Ok(());
            }
            _ => {}
        }
        if self.ast.node(term).quantifier.is_some() {
            return Err(RegexError::syntax("Nothing to repeat", position));
        }
        self.ast.properties |= RegexProperties::QUANTIFIERS;
        if quantifier.max.is_none() {
            self.ast.properties |= RegexProperties::LOOPS;
        }
        if quantifier.is_large(self.max_counted_repetition) {
            self.ast.properties |= RegexProperties::LARGE_COUNTED_REPETITIONS;
        }
        self.ast.node_mut(term).quantifier = Some(quantifier);
        Ok(())
    }

    /// Lookbehinds whose body can consume an unbounded number of code units
    fn mark_complex_lookbehinds(&mut self) {
        let lookbehinds: Vec<NodeId> = self.ast.lookbehinds().collect();
        for lookbehind in lookbehinds {
            let Some(group) = self.ast.node(lookbehind).kind.subtree_root().map(|r| r.group)
            else {
                continue;
            };
            CalcPathLengthVisitor::run(&mut self.ast, group);
            if self.ast.node(group).max_path.is_none() {
                self.ast.properties |= RegexProperties::COMPLEX_LOOKBEHIND;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(pattern: &str, flags: RegexFlags) -> Result<RegexAst> {
        parse(&RegexSource::new(pattern, flags), &RegexOptions::default())
    }

    #[test]
    fn test_properties() {
        let ast = parse_str("(a|b)*c{300}(?!d)\\1", RegexFlags::empty()).unwrap();
        let properties = ast.properties();
        assert!(properties.contains(RegexProperties::ALTERNATIONS));
        assert!(properties.contains(RegexProperties::LOOPS));
        assert!(properties.contains(RegexProperties::LARGE_COUNTED_REPETITIONS));
        assert!(properties.contains(RegexProperties::NEGATIVE_LOOKAHEAD));
        assert!(properties.contains(RegexProperties::BACK_REFERENCES));
        assert_eq!(ast.group_count(), 2);
    }

    #[test]
    fn test_syntax_error_positions() {
        let cases = [
            ("(a", "Unterminated group", 2),
            ("a)", "Unmatched ')'", 1),
            ("*a", "Nothing to repeat", 0),
            ("a**", "Nothing to repeat", 2),
            ("a{3,2}", "numbers out of order in {} quantifier", 1),
            ("[b-a]", "Range out of order in character class", 1),
            ("(?<n>a)(?<n>b)", "Duplicate capture group name", 7),
            ("a\\", "\\ at end of pattern", 1),
            ("[ab", "Unterminated character class", 0),
        ];
        for (pattern, message, position) in cases {
            assert_eq!(
                parse_str(pattern, RegexFlags::empty()).unwrap_err(),
                RegexError::syntax(message, position),
                "pattern {pattern}"
            );
        }
    }

    #[test]
    fn test_quantified_lookahead_is_accepted_outside_unicode_mode() {
        let ast = parse_str("(?=a)*b", RegexFlags::empty()).unwrap();
        assert!(ast.lookarounds().is_empty());
        let ast = parse_str("(?=a){2}b", RegexFlags::empty()).unwrap();
        assert_eq!(ast.lookarounds().len(), 1);
        assert!(parse_str("(?=a)*b", RegexFlags::UNICODE).is_err());
    }

    #[test]
    fn test_complex_lookbehind() {
        let ast = parse_str("(?<=ab?)c", RegexFlags::empty()).unwrap();
        assert!(!ast.properties().contains(RegexProperties::COMPLEX_LOOKBEHIND));
        let ast = parse_str("(?<=a+)c", RegexFlags::empty()).unwrap();
        assert!(ast.properties().contains(RegexProperties::COMPLEX_LOOKBEHIND));
    }

    #[test]
    fn test_named_groups_and_forward_reference() {
        let ast = parse_str("\\k<x>(?<x>a)", RegexFlags::empty()).unwrap();
        assert_eq!(ast.group_names(), &[("x".to_string(), 1)]);
        assert!(matches!(
            parse_str("(?<x>a)\\k<y>", RegexFlags::empty()),
            Err(RegexError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unicode_property_is_a_bailout() {
        assert!(matches!(
            parse_str("\\p{L}", RegexFlags::UNICODE),
            Err(RegexError::Unsupported(_))
        ));
    }

    #[test]
    fn test_property_in_class_is_a_bailout() {
        for pattern in ["[\\p{L}]", "[^\\p{L}\\d]"] {
            assert!(matches!(
                parse_str(pattern, RegexFlags::UNICODE),
                Err(RegexError::Unsupported(_))
            ));
        }
        // still a syntax error when the rest of the pattern is malformed
        assert!(matches!(
            parse_str("[\\p{L}](", RegexFlags::UNICODE),
            Err(RegexError::Syntax { .. })
        ));
    }

    #[test]
    fn test_lone_surrogates_are_guarded() {
        let ast = parse_str("\\uDE00", RegexFlags::UNICODE).unwrap();
        let sequence = ast.group(ast.root_group()).unwrap().alternatives[0];
        let term = ast.node(sequence).as_sequence().unwrap()[0];
        let alternative = ast.group(term).unwrap().alternatives[0];
        let terms = ast.node(alternative).as_sequence().unwrap();
        assert_eq!(
            ast.node(terms[0]).kind,
            NodeKind::PositionAssertion(AssertionKind::CodePointBoundary)
        );
        assert_eq!(
            ast.node(terms[1]).kind,
            NodeKind::CharacterClass(CodePointSet::from_char(0xDE00))
        );
    }

    #[test]
    fn test_astral_class_becomes_surrogate_alternation() {
        let ast = parse_str("[a\u{1F600}]", RegexFlags::UNICODE).unwrap();
        let sequence = ast.group(ast.root_group()).unwrap().alternatives[0];
        let term = ast.node(sequence).as_sequence().unwrap()[0];
        assert_eq!(ast.group(term).unwrap().alternatives.len(), 2);
    }
}
