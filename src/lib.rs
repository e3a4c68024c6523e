//! ECMAScript regular expressions compiled to deterministic automata
//!
//! Patterns are parsed into an AST, turned into an NFA and compiled eagerly into DFAs:
//! a forward automaton that finds the end of a match, a backward one that finds its start and
//! a tracking one that resolves capture groups. Patterns that reduce to a plain string skip
//! the automata entirely. Patterns the DFAs cannot express (back-references, huge counted
//! repetitions, automata over the size limits) are handed to a backtracking fallback.
//!
//! Input is a sequence of UTF-16 code units and all offsets are code unit offsets.

pub mod ast;
pub mod cache;
pub mod charset;
pub mod compiler;
pub mod dfa;
pub mod error;
pub mod fallback;
pub mod flags;
pub mod input;
pub mod literal;
pub mod nfa;
pub mod options;
pub mod parser;
pub mod result;

use log::warn;

pub use cache::RegexCache;
pub use compiler::{EngineStatistics, TRegexCompiler};
pub use error::{RegexError, Result};
pub use fallback::{FallbackCompiler, FallbackRegex};
pub use flags::{RegexFlags, RegexSource};
pub use input::{RegexInput, Utf16Input};
pub use options::RegexOptions;
pub use parser::RegexProperties;
pub use result::{Captures, RegexResult};

use compiler::Engine;
use input::inside_surrogate_pair;

/// Compile a pattern with default options. `flags` uses the `dgimsuy` letters.
pub fn compile(pattern: &str, flags: &str) -> Result<CompiledRegex> {
    CompiledRegex::new(pattern, flags)
}

/// Compile a pattern given as UTF-16 code units
pub fn compile_source(source: &RegexSource) -> Result<CompiledRegex> {
    TRegexCompiler::default().compile(source)
}

/// Compile with explicit limits and fallback engine (`None` disables the fallback)
pub fn compile_with_options(
    source: &RegexSource,
    options: RegexOptions,
    fallback: Option<std::sync::Arc<dyn FallbackCompiler>>,
) -> Result<CompiledRegex> {
    let compiler = match fallback {
        Some(fallback) => TRegexCompiler::with_fallback(options, fallback),
        None => TRegexCompiler::without_fallback(options),
    };
    compiler.compile(source)
}

/// A compiled pattern. Immutable and shareable across threads; every `exec` is independent.
#[derive(Debug)]
pub struct CompiledRegex {
    source: RegexSource,
    engine: Engine,
    group_count: usize,
    group_names: Vec<(String, u32)>,
}

impl CompiledRegex {
    pub fn new(pattern: &str, flags: &str) -> Result<Self> {
        let flags = RegexFlags::parse(flags)?;
        compile_source(&RegexSource::new(pattern, flags))
    }

    pub(crate) fn from_parts(
        source: RegexSource,
        engine: Engine,
        group_count: usize,
        group_names: Vec<(String, u32)>,
    ) -> Self {
        Self {
            source,
            engine,
            group_count,
            group_names,
        }
    }

    /// Search for the first match starting at or after `from`.
    ///
    /// `from` past the end of the input yields [`RegexResult::NoMatch`]. In unicode mode a
    /// `from` between the halves of a surrogate pair moves back to the start of the pair.
    /// Errors of the fallback engine are logged and reported as no match.
    pub fn exec<I: RegexInput + ?Sized>(&self, input: &I, from: usize) -> RegexResult {
        match self.try_exec(input, from) {
            Ok(result) => result,
            Err(e) => {
                warn!("{}: {e}", self.source);
                RegexResult::NoMatch
            }
        }
    }

    /// Like [`exec`](Self::exec), but reports fallback engine failures
    pub fn try_exec<I: RegexInput + ?Sized>(&self, input: &I, from: usize) -> Result<RegexResult> {
        if from > input.len() {
            return Ok(RegexResult::NoMatch);
        }
        let from = if self.source.flags().unicode() && inside_surrogate_pair(input, from) {
            from - 1
        } else {
            from
        };
        let input: &dyn RegexInput = &input;
        self.engine.exec(input, from)
    }

    /// Test if the pattern matches anywhere in the text
    pub fn is_match(&self, text: &str) -> bool {
        self.exec(&Utf16Input::new(text), 0).is_match()
    }

    /// Bounds of the first match, in UTF-16 code units
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.exec(&Utf16Input::new(text), 0).get(0)
    }

    pub fn source(&self) -> &RegexSource {
        &self.source
    }

    /// Number of groups, group 0 included
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Named groups and their numbers
    pub fn group_names(&self) -> &[(String, u32)] {
        &self.group_names
    }

    pub fn group_number(&self, name: &str) -> Option<u32> {
        self.group_names
            .iter()
            .find(|(group, _)| group == name)
            .map(|&(_, number)| number)
    }

    /// Which engine runs this pattern: `dfa`, `literal:<kind>`, `dead` or `fallback:<name>`
    pub fn engine_label(&self) -> String {
        self.engine.label()
    }

    /// Automaton sizes, for DFA-compiled patterns
    pub fn statistics(&self) -> Option<EngineStatistics> {
        self.engine.statistics()
    }
}
