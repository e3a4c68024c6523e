//! Compilation pipeline and executor selection
//!
//! parse -> gate -> unroll quantifiers -> prune dead branches -> literal engine or
//! NFA -> trace finder / pre-calculated results -> DFAs. Any bailout on the way hands the
//! pattern to the fallback engine.

use std::sync::Arc;

use log::{debug, trace};

use crate::ast::visitors::PreCalcResultVisitor;
use crate::ast::RegexAst;
use crate::dfa::executor::{DfaProgram, LookaroundDfa};
use crate::dfa::{CharClasses, Dfa, DfaConfig, DfaGenerator, Direction, Mode};
use crate::error::{RegexError, Result};
use crate::fallback::{FallbackCompiler, FallbackRegex};
use crate::flags::RegexSource;
use crate::input::RegexInput;
use crate::literal::{LiteralRegex, LiteralRegexEngine};
use crate::nfa::generator::{prune_dead_branches, unroll_quantifiers, NfaGenerator};
use crate::nfa::trace_finder::generate_trace_finder;
use crate::nfa::{AutomatonKind, Nfa, FINAL, INITIAL, LOOP_BACK};
use crate::options::RegexOptions;
use crate::parser::{parse, RegexProperties};
use crate::result::{Captures, PreCalculatedResult, RegexResult};
use crate::CompiledRegex;

/// Compiles [`RegexSource`]s into [`CompiledRegex`]es
#[derive(Clone)]
pub struct TRegexCompiler {
    options: RegexOptions,
    fallback: Option<Arc<dyn FallbackCompiler>>,
}

impl std::fmt::Debug for TRegexCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TRegexCompiler")
            .field("options", &self.options)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Default for TRegexCompiler {
    fn default() -> Self {
        Self::new(RegexOptions::default())
    }
}

impl TRegexCompiler {
    /// Compiler with the default fallback engine, if it is built in
    pub fn new(options: RegexOptions) -> Self {
        #[cfg(feature = "fancy-fallback")]
        let fallback: Option<Arc<dyn FallbackCompiler>> =
            Some(Arc::new(crate::fallback::FancyFallback));
        #[cfg(not(feature = "fancy-fallback"))]
        let fallback: Option<Arc<dyn FallbackCompiler>> = None;
        Self { options, fallback }
    }

    pub fn with_fallback(options: RegexOptions, fallback: Arc<dyn FallbackCompiler>) -> Self {
        Self {
            options,
            fallback: Some(fallback),
        }
    }

    /// Compiler that reports bailouts as [`RegexError::Unsupported`]
    pub fn without_fallback(options: RegexOptions) -> Self {
        Self {
            options,
            fallback: None,
        }
    }

    pub fn options(&self) -> &RegexOptions {
        &self.options
    }

    pub fn compile(&self, source: &RegexSource) -> Result<CompiledRegex> {
        let mut group_names = Vec::new();
        match self.compile_dfa(source, &mut group_names) {
            Ok((engine, group_count)) => Ok(CompiledRegex::from_parts(
                source.clone(),
                engine,
                group_count,
                group_names,
            )),
            Err(RegexError::Unsupported(reason)) => {
                debug!("TRegex bailout for {source}: {reason}");
                let Some(fallback) = &self.fallback else {
                    return Err(RegexError::Unsupported(reason));
                };
                let regex = fallback.compile(source)?;
                let group_count = regex.group_count();
                Ok(CompiledRegex::from_parts(
                    source.clone(),
                    Engine::Fallback(regex),
                    group_count,
                    group_names,
                ))
            }
            Err(e) => Err(e),
        }
    }

    fn compile_dfa(
        &self,
        source: &RegexSource,
        group_names: &mut Vec<(String, u32)>,
    ) -> Result<(Engine, usize)> {
        trace!("parsing {source}");
        let mut ast = parse(source, &self.options)?;
        group_names.extend(ast.group_names().iter().cloned());
        let group_count = ast.group_count();
        self.check_supported(&ast)?;

        trace!("unrolling quantifiers");
        unroll_quantifiers(&mut ast, &self.options)?;
        if !prune_dead_branches(&mut ast) {
            debug!("{source} can never match");
            return Ok((Engine::Dead, group_count));
        }

        let pre_calculated = PreCalcResultVisitor::run(&ast);
        if self.options.literal_engine {
            if let Some(literal) = pre_calculated
                .as_ref()
                .and_then(|outcome| LiteralRegexEngine::create_node(&ast, outcome))
            {
                debug!("{source}: literal engine {}", literal.executor().name());
                return Ok((Engine::Literal(literal), group_count));
            }
        }

        trace!("generating NFA");
        let nfa = NfaGenerator::create_nfa(&mut ast, &self.options)?;
        if nfa.is_dead() {
            debug!("{source} can never match");
            return Ok((Engine::Dead, group_count));
        }
        let executor = self.create_executor(
            source,
            &nfa,
            pre_calculated.map(|outcome| outcome.result),
        )?;
        Ok((Engine::Dfa(Box::new(executor)), group_count))
    }

    fn check_supported(&self, ast: &RegexAst) -> Result<()> {
        let properties = ast.properties();
        let unsupported = [
            (RegexProperties::BACK_REFERENCES, "back-references"),
            (
                RegexProperties::LARGE_COUNTED_REPETITIONS,
                "large counted repetitions",
            ),
            (RegexProperties::COMPLEX_LOOKBEHIND, "variable-length lookbehind"),
            (
                RegexProperties::CAPTURE_GROUPS_IN_LOOKAROUND,
                "capture groups inside lookaround",
            ),
            (RegexProperties::UNICODE_PROPERTIES, "unicode property escapes"),
        ];
        for (property, name) in unsupported {
            if properties.contains(property) {
                return Err(RegexError::unsupported(name));
            }
        }
        if ast.group_count() > self.options.max_capture_groups {
            return Err(RegexError::unsupported(format!(
                "{} capture groups",
                ast.group_count()
            )));
        }
        if ast.lookarounds().len() > self.options.max_lookarounds {
            return Err(RegexError::unsupported(format!(
                "{} lookaround assertions",
                ast.lookarounds().len()
            )));
        }
        Ok(())
    }

    fn generate(&self, nfa: &Nfa, classes: &Arc<CharClasses>, config: DfaConfig) -> Result<Dfa> {
        DfaGenerator::generate(nfa, Arc::clone(classes), config, &self.options)
    }

    fn create_executor(
        &self,
        source: &RegexSource,
        nfa: &Nfa,
        pre_calculated: Option<PreCalculatedResult>,
    ) -> Result<TRegexExecutor> {
        let flags = source.flags();
        let classes = Arc::new(CharClasses::new(
            nfa.states.iter().filter_map(|state| state.char_class()),
        ));
        let mut program = DfaProgram {
            lookarounds: Vec::with_capacity(nfa.lookaround_count()),
            multiline: flags.multiline(),
            folded_word_chars: flags.unicode() && flags.ignore_case(),
        };
        for index in 0..nfa.lookaround_count() {
            let Some(&automaton) = nfa.lookaround(index) else {
                continue;
            };
            let config = match automaton.kind {
                AutomatonKind::LookBehind => DfaConfig {
                    direction: Direction::Backward,
                    mode: Mode::Set,
                    tracking: false,
                    start: automaton.final_state,
                    terminal: automaton.initial,
                },
                AutomatonKind::LookAhead | AutomatonKind::Main => DfaConfig {
                    direction: Direction::Forward,
                    mode: Mode::Set,
                    tracking: false,
                    start: automaton.initial,
                    terminal: automaton.final_state,
                },
            };
            program.lookarounds.push(LookaroundDfa {
                dfa: self.generate(nfa, &classes, config)?,
                negated: automaton.negated,
            });
        }

        let forward_searching =
            !(flags.sticky() || (nfa.is_start_anchored() && !flags.multiline()));
        let backward_anchored = forward_searching && !flags.multiline() && nfa.ends_with_dollar();
        let group_count = nfa.group_count;

        let mut pre_calculated: Vec<PreCalculatedResult> = pre_calculated.into_iter().collect();
        let mut trace_finder = None;
        if group_count > 1 && pre_calculated.is_empty() && self.options.trace_finder {
            match self.create_trace_finder(nfa) {
                Ok((dfa, results)) => {
                    trace_finder = Some(dfa);
                    pre_calculated = results;
                }
                Err(e) => debug!("trace finder bailout for {source}: {e}"),
            }
        }

        let forward = if backward_anchored {
            None
        } else {
            Some(self.generate(
                nfa,
                &classes,
                DfaConfig {
                    direction: Direction::Forward,
                    mode: Mode::Priority,
                    tracking: false,
                    start: if forward_searching { LOOP_BACK } else { INITIAL },
                    terminal: FINAL,
                },
            )?)
        };
        let needs_backward = if backward_anchored {
            trace_finder.is_none()
        } else {
            forward_searching && pre_calculated.is_empty()
        };
        let backward = if needs_backward {
            Some(self.generate(
                nfa,
                &classes,
                DfaConfig {
                    direction: Direction::Backward,
                    mode: Mode::Set,
                    tracking: false,
                    start: FINAL,
                    terminal: INITIAL,
                },
            )?)
        } else {
            None
        };
        let capture_groups = if group_count > 1 && pre_calculated.is_empty() {
            Some(self.generate(
                nfa,
                &classes,
                DfaConfig {
                    direction: Direction::Forward,
                    mode: Mode::Priority,
                    tracking: true,
                    start: INITIAL,
                    terminal: FINAL,
                },
            )?)
        } else {
            None
        };
        let executor = TRegexExecutor {
            program,
            forward,
            forward_searching,
            backward,
            capture_groups,
            trace_finder,
            pre_calculated,
            group_count,
            nfa_states: nfa.states.len(),
        };
        debug!("{source}: {:?}", executor.statistics());
        Ok(executor)
    }

    fn create_trace_finder(&self, nfa: &Nfa) -> Result<(Dfa, Vec<PreCalculatedResult>)> {
        let (finder, results) = generate_trace_finder(nfa, &self.options)?;
        let classes = Arc::new(CharClasses::new(
            finder.states.iter().filter_map(|state| state.char_class()),
        ));
        let dfa = self.generate(
            &finder,
            &classes,
            DfaConfig {
                direction: Direction::Backward,
                mode: Mode::Set,
                tracking: false,
                start: FINAL,
                terminal: INITIAL,
            },
        )?;
        Ok((dfa, results))
    }
}

/// The strategy chosen for one compiled pattern
#[derive(Debug)]
pub(crate) enum Engine {
    /// The pattern can never match
    Dead,
    Literal(LiteralRegex),
    Dfa(Box<TRegexExecutor>),
    Fallback(Box<dyn FallbackRegex>),
}

impl Engine {
    pub(crate) fn exec(&self, input: &dyn RegexInput, from: usize) -> Result<RegexResult> {
        match self {
            Engine::Dead => Ok(RegexResult::NoMatch),
            Engine::Literal(literal) => Ok(literal.exec(input, from)),
            Engine::Dfa(executor) => Ok(executor.exec(input, from)),
            Engine::Fallback(regex) => regex.exec(input, from),
        }
    }

    pub(crate) fn label(&self) -> String {
        match self {
            Engine::Dead => "dead".to_string(),
            Engine::Literal(literal) => format!("literal:{}", literal.executor().name()),
            Engine::Dfa(_) => "dfa".to_string(),
            Engine::Fallback(regex) => format!("fallback:{}", regex.name()),
        }
    }

    pub(crate) fn statistics(&self) -> Option<EngineStatistics> {
        match self {
            Engine::Dfa(executor) => Some(executor.statistics()),
            _ => None,
        }
    }
}

/// Sizes of the automata behind a DFA-compiled pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatistics {
    pub nfa_states: usize,
    pub forward_states: usize,
    pub backward_states: usize,
    pub capture_group_states: usize,
    pub trace_finder_states: usize,
    pub lookaround_states: usize,
    pub pre_calculated_results: usize,
}

/// Runs the DFAs of one pattern
#[derive(Debug)]
pub struct TRegexExecutor {
    program: DfaProgram,
    /// `None` when every match ends at the end of the input and the search runs backwards
    forward: Option<Dfa>,
    forward_searching: bool,
    backward: Option<Dfa>,
    capture_groups: Option<Dfa>,
    trace_finder: Option<Dfa>,
    /// One entry: every match has this layout. More: indexed by trace finder result.
    pre_calculated: Vec<PreCalculatedResult>,
    group_count: usize,
    nfa_states: usize,
}

impl TRegexExecutor {
    pub fn statistics(&self) -> EngineStatistics {
        let size = |dfa: &Option<Dfa>| dfa.as_ref().map_or(0, Dfa::len);
        EngineStatistics {
            nfa_states: self.nfa_states,
            forward_states: size(&self.forward),
            backward_states: size(&self.backward),
            capture_group_states: size(&self.capture_groups),
            trace_finder_states: size(&self.trace_finder),
            lookaround_states: self.program.lookarounds.iter().map(|l| l.dfa.len()).sum(),
            pre_calculated_results: self.pre_calculated.len(),
        }
    }

    pub fn exec<I: RegexInput + ?Sized>(&self, input: &I, from: usize) -> RegexResult {
        let len = input.len();
        if from > len {
            return RegexResult::NoMatch;
        }
        let Some(forward) = &self.forward else {
            return self.exec_backward_anchored(input, from);
        };
        let Some((end, _)) = self.program.run(forward, input, from, len, false) else {
            return RegexResult::NoMatch;
        };
        if let [single] = self.pre_calculated.as_slice() {
            return RegexResult::Match(single.create_from_end(end));
        }
        if let Some(trace_finder) = &self.trace_finder {
            return match self.program.run(trace_finder, input, end, from, false) {
                Some((_, trace)) => self.pre_calculated_match(trace, end),
                None => RegexResult::NoMatch,
            };
        }
        let start = match &self.backward {
            Some(backward) if self.forward_searching && end > from => {
                match self.program.run(backward, input, end, from, false) {
                    Some((start, _)) => start,
                    None => return RegexResult::NoMatch,
                }
            }
            _ => from,
        };
        self.captures(input, start, end)
    }

    /// Every match ends at the end of the input: search for the leftmost start backwards
    fn exec_backward_anchored<I: RegexInput + ?Sized>(&self, input: &I, from: usize) -> RegexResult {
        let len = input.len();
        if let Some(trace_finder) = &self.trace_finder {
            return match self.program.run(trace_finder, input, len, from, false) {
                Some((_, trace)) => self.pre_calculated_match(trace, len),
                None => RegexResult::NoMatch,
            };
        }
        let Some(backward) = &self.backward else {
            return RegexResult::NoMatch;
        };
        let Some((start, _)) = self.program.run(backward, input, len, from, false) else {
            return RegexResult::NoMatch;
        };
        if let [single] = self.pre_calculated.as_slice() {
            return RegexResult::Match(single.create_from_start(start));
        }
        self.captures(input, start, len)
    }

    fn pre_calculated_match(&self, trace: u16, end: usize) -> RegexResult {
        match self.pre_calculated.get(trace as usize) {
            Some(result) => RegexResult::Match(result.create_from_end(end)),
            None => RegexResult::NoMatch,
        }
    }

    fn captures<I: RegexInput + ?Sized>(&self, input: &I, start: usize, end: usize) -> RegexResult {
        let captures = match &self.capture_groups {
            Some(dfa) => self
                .program
                .run_captures(dfa, input, start, end, self.group_count),
            None => {
                let mut indices = vec![-1; self.group_count.max(1) * 2];
                indices[0] = start as i32;
                indices[1] = end as i32;
                Some(Captures::from_indices(indices))
            }
        };
        match captures {
            Some(captures) => RegexResult::Match(captures),
            None => RegexResult::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::RegexFlags;

    fn compile(pattern: &str, flags: &str) -> CompiledRegex {
        let source = RegexSource::new(pattern, RegexFlags::parse(flags).unwrap());
        TRegexCompiler::default().compile(&source).unwrap()
    }

    fn statistics(pattern: &str) -> EngineStatistics {
        compile(pattern, "").statistics().unwrap()
    }

    #[test]
    fn test_engine_selection() {
        assert_eq!(compile("abc", "").engine_label(), "literal:IndexOfString");
        assert_eq!(compile("a|b", "").engine_label(), "dfa");
        assert_eq!(compile("x[]", "").engine_label(), "dead");
        #[cfg(feature = "fancy-fallback")]
        assert_eq!(compile(r"(a)\1", "").engine_label(), "fallback:fancy-regex");
    }

    #[test]
    fn test_executor_strategies() {
        // fixed layout: no capture group DFA, no backward search
        let fixed = statistics("(a)b[cd]");
        assert_eq!(fixed.pre_calculated_results, 1);
        assert_eq!((fixed.backward_states, fixed.capture_group_states), (0, 0));
        // loop-free alternatives: trace finder
        let traced = statistics("(a)|(b)c");
        assert_eq!(traced.pre_calculated_results, 2);
        assert!(traced.trace_finder_states > 0);
        assert_eq!(traced.capture_group_states, 0);
        // loops: backward search and capture group DFA
        let looping = statistics("(a)+b");
        assert!(looping.backward_states > 0 && looping.capture_group_states > 0);
        // anchored at the end: backward search only
        let dollar = statistics("a+$");
        assert_eq!(dollar.forward_states, 0);
        assert!(dollar.backward_states > 0);
    }

    #[test]
    fn test_without_fallback_reports_bailout() {
        let source = RegexSource::new(r"(a)\1", RegexFlags::empty());
        let error = TRegexCompiler::without_fallback(RegexOptions::default())
            .compile(&source)
            .unwrap_err();
        assert!(error.is_bailout());
    }

    #[test]
    fn test_dfa_size_limit_bails_out() {
        let options = RegexOptions {
            max_dfa_size: 2,
            ..RegexOptions::default()
        };
        let source = RegexSource::new("(a|b)*abb", RegexFlags::empty());
        assert!(TRegexCompiler::without_fallback(options)
            .compile(&source)
            .is_err());
    }
}
