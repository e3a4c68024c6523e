//! Fast paths for patterns that reduce to a fixed string, optionally anchored

use crate::ast::visitors::PreCalcOutcome;
use crate::ast::RegexAst;
use crate::input::RegexInput;
use crate::result::{PreCalculatedResult, RegexResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralExecutor {
    /// `^`
    EmptyIndex0,
    /// `$`
    EmptyAtEnd,
    /// `^$`
    EmptyEquals,
    /// Empty pattern: matches wherever the search starts
    EmptyFromIndex,
    IndexOfChar(u16),
    IndexOfString(Vec<u16>),
    /// `^literal`
    StartsWith(Vec<u16>),
    /// `literal$`
    EndsWith(Vec<u16>),
    /// `^literal$`
    Equals(Vec<u16>),
    /// Sticky search: the literal must occur exactly at the start index
    RegionMatches {
        literal: Vec<u16>,
        end_anchored: bool,
    },
}

impl LiteralExecutor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmptyIndex0 => "EmptyIndex0",
            Self::EmptyAtEnd => "EmptyAtEnd",
            Self::EmptyEquals => "EmptyEquals",
            Self::EmptyFromIndex => "EmptyFromIndex",
            Self::IndexOfChar(_) => "IndexOfChar",
            Self::IndexOfString(_) => "IndexOfString",
            Self::StartsWith(_) => "StartsWith",
            Self::EndsWith(_) => "EndsWith",
            Self::Equals(_) => "Equals",
            Self::RegionMatches { .. } => "RegionMatches",
        }
    }

    /// Start of the match, if any
    fn find<I: RegexInput + ?Sized>(&self, input: &I, from: usize) -> Option<usize> {
        let len = input.len();
        match self {
            Self::EmptyIndex0 => (from == 0).then_some(0),
            Self::EmptyAtEnd => Some(len),
            Self::EmptyEquals => (from == 0 && len == 0).then_some(0),
            Self::EmptyFromIndex => Some(from),
            Self::IndexOfChar(unit) => (from..len).find(|&i| input.code_unit(i) == *unit),
            Self::IndexOfString(literal) => {
                let last = len.checked_sub(literal.len())?;
                (from..=last).find(|&i| region_matches(input, i, literal))
            }
            Self::StartsWith(literal) => {
                (from == 0 && region_matches(input, 0, literal)).then_some(0)
            }
            Self::EndsWith(literal) => {
                let start = len.checked_sub(literal.len())?;
                (start >= from && region_matches(input, start, literal)).then_some(start)
            }
            Self::Equals(literal) => {
                (from == 0 && len == literal.len() && region_matches(input, 0, literal))
                    .then_some(0)
            }
            Self::RegionMatches {
                literal,
                end_anchored,
            } => {
                let fits = if *end_anchored {
                    from + literal.len() == len
                } else {
                    from + literal.len() <= len
                };
                (fits && region_matches(input, from, literal)).then_some(from)
            }
        }
    }
}

fn region_matches<I: RegexInput + ?Sized>(input: &I, start: usize, literal: &[u16]) -> bool {
    start + literal.len() <= input.len()
        && literal
            .iter()
            .enumerate()
            .all(|(i, &unit)| input.code_unit(start + i) == unit)
}

/// A literal executor with the group layout of its matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralRegex {
    executor: LiteralExecutor,
    result: PreCalculatedResult,
}

impl LiteralRegex {
    pub fn executor(&self) -> &LiteralExecutor {
        &self.executor
    }

    pub fn exec<I: RegexInput + ?Sized>(&self, input: &I, from: usize) -> RegexResult {
        match self.executor.find(input, from) {
            Some(start) => RegexResult::Match(self.result.create_from_start(start)),
            None => RegexResult::NoMatch,
        }
    }
}

pub struct LiteralRegexEngine;

impl LiteralRegexEngine {
    /// Literal executor for `ast`, or `None` if the pattern is not a plain string with at
    /// most a leading `^` and a trailing `$`
    pub fn create_node(ast: &RegexAst, outcome: &PreCalcOutcome) -> Option<LiteralRegex> {
        let literal = outcome.literal.clone()?;
        let flags = ast.flags();
        let caret = outcome.starts_with_caret;
        let dollar = outcome.ends_with_dollar;
        if outcome.has_other_assertions || (flags.multiline() && (caret || dollar)) {
            return None;
        }
        let executor = match (caret, dollar, literal.len()) {
            (false, _, _) if flags.sticky() => LiteralExecutor::RegionMatches {
                literal,
                end_anchored: dollar,
            },
            (true, false, 0) => LiteralExecutor::EmptyIndex0,
            (false, true, 0) => LiteralExecutor::EmptyAtEnd,
            (true, true, 0) => LiteralExecutor::EmptyEquals,
            (false, false, 0) => LiteralExecutor::EmptyFromIndex,
            (false, false, 1) => LiteralExecutor::IndexOfChar(literal[0]),
            (false, false, _) => LiteralExecutor::IndexOfString(literal),
            (true, false, _) => LiteralExecutor::StartsWith(literal),
            (false, true, _) => LiteralExecutor::EndsWith(literal),
            (true, true, _) => LiteralExecutor::Equals(literal),
        };
        Some(LiteralRegex {
            executor,
            result: outcome.result.clone(),
        })
    }
}
