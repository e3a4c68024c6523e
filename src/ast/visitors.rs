//! Non-recursive traversals over the syntax tree
//!
//! Patterns are user input, so nesting depth is unbounded. Every traversal here keeps its
//! own explicit stack instead of using native recursion.

use rustc_hash::FxHashMap;

use super::{AssertionKind, NodeFlags, NodeId, NodeKind, RegexAst, Repeat};
use crate::error::Result;
use crate::result::PreCalculatedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Enter(NodeId),
    Leave(NodeId),
}

/// Depth-first walk yielding an `Enter` before and a `Leave` after each node's children
pub struct DepthFirstTraversal {
    stack: Vec<(NodeId, Vec<NodeId>, usize)>,
    pending: Option<NodeId>,
}

impl DepthFirstTraversal {
    pub fn new(start: NodeId) -> Self {
        Self {
            stack: Vec::new(),
            pending: Some(start),
        }
    }

    pub fn next(&mut self, ast: &RegexAst) -> Option<Visit> {
        if let Some(node) = self.pending.take() {
            self.stack.push((node, ast.children(node), 0));
            return Some(Visit::Enter(node));
        }
        let (node, children, index) = self.stack.last_mut()?;
        if let Some(&child) = children.get(*index) {
            *index += 1;
            self.stack.push((child, ast.children(child), 0));
            return Some(Visit::Enter(child));
        }
        let node = *node;
        self.stack.pop();
        Some(Visit::Leave(node))
    }

    /// Do not descend into the node that was just entered
    pub fn skip_children(&mut self) {
        if let Some((_, children, index)) = self.stack.last_mut() {
            *index = children.len();
        }
    }
}

/// Deep copy of a subtree, registering every copy in the same AST
pub struct CopyVisitor;

impl CopyVisitor {
    /// Returns the copy of `source`, detached (no parent)
    pub fn run(ast: &mut RegexAst, source: NodeId) -> Result<NodeId> {
        let mut mapping: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut traversal = DepthFirstTraversal::new(source);
        let mut copy_root = None;
        while let Some(visit) = traversal.next(ast) {
            let Visit::Enter(original) = visit else {
                continue;
            };
            let parent = if original == source {
                None
            } else {
                ast.node(original).parent.and_then(|p| mapping.get(&p).copied())
            };
            let kind = match &ast.node(original).kind {
                NodeKind::Group(group) => {
                    let mut group = group.clone();
                    group.alternatives.clear();
                    NodeKind::Group(group)
                }
                NodeKind::Sequence(_) => NodeKind::Sequence(Vec::new()),
                other => other.clone(),
            };
            let quantifier = ast.node(original).quantifier;
            let flags = ast.node(original).flags;
            let copy = ast.register(kind, parent)?;
            let node = ast.node_mut(copy);
            node.quantifier = quantifier;
            node.flags |= flags;
            mapping.insert(original, copy);
            if let Some(parent) = parent {
                link_child(ast, parent, copy);
            } else {
                copy_root = Some(copy);
            }
        }
        Ok(copy_root.unwrap_or(source))
    }
}

fn link_child(ast: &mut RegexAst, parent: NodeId, child: NodeId) {
    let child_is_group = matches!(ast.node(child).kind, NodeKind::Group(_));
    match &mut ast.node_mut(parent).kind {
        NodeKind::Group(group) => group.alternatives.push(child),
        NodeKind::Sequence(terms) => terms.push(child),
        NodeKind::LookAhead(root) | NodeKind::LookBehind(root) | NodeKind::Root(root) => {
            if child_is_group {
                root.group = child;
            } else {
                root.match_found = child;
            }
        }
        _ => {}
    }
}

/// Unregisters every node of a detached subtree.
///
/// Only reachable through [`RegexAst::remove_subtree`], so the cached assertion and
/// lookaround lists can never go stale.
pub(super) struct DeleteVisitor;

impl DeleteVisitor {
    pub(super) fn run(ast: &mut RegexAst, node: NodeId) {
        let mut traversal = DepthFirstTraversal::new(node);
        let mut doomed = Vec::new();
        while let Some(visit) = traversal.next(ast) {
            if let Visit::Leave(id) = visit {
                doomed.push(id);
            }
        }
        ast.unregister(&doomed);
    }
}

/// Number of NFA state ids reserved ahead of the AST node ids: the initial state and the
/// loop-back state used for unanchored search
pub const RESERVED_IDS: usize = 2;

/// Assigns dense ids in pre-order, starting after the reserved prefix
pub struct InitIdVisitor;

impl InitIdVisitor {
    pub fn run(ast: &mut RegexAst) {
        let mut next_id = RESERVED_IDS;
        let mut traversal = DepthFirstTraversal::new(ast.root());
        let mut order = Vec::new();
        while let Some(visit) = traversal.next(ast) {
            if let Visit::Enter(id) = visit {
                order.push(id);
            }
        }
        for id in order {
            ast.node_mut(id).id = next_id;
            next_id += 1;
        }
        ast.set_number_of_ids(next_id);
    }
}

/// Computes the minimum and maximum number of code units each node can consume.
/// `max_path == None` means unbounded.
pub struct CalcPathLengthVisitor;

impl CalcPathLengthVisitor {
    pub fn run(ast: &mut RegexAst, start: NodeId) {
        let mut traversal = DepthFirstTraversal::new(start);
        let mut order = Vec::new();
        while let Some(visit) = traversal.next(ast) {
            if let Visit::Leave(id) = visit {
                order.push(id);
            }
        }
        // Leave order is post-order: children are done before their parent
        for id in order {
            let (min, max) = match &ast.node(id).kind {
                NodeKind::CharacterClass(_) => (1, Some(1)),
                NodeKind::Sequence(terms) => terms.iter().fold((0u32, Some(0u32)), |acc, &t| {
                    let term = ast.node(t);
                    (
                        acc.0.saturating_add(term.min_path),
                        acc.1.zip(term.max_path).map(|(a, b)| a.saturating_add(b)),
                    )
                }),
                NodeKind::Group(group) => {
                    let mut min = u32::MAX;
                    let mut max = Some(0u32);
                    for &alt in &group.alternatives {
                        min = min.min(ast.node(alt).min_path);
                        max = max.zip(ast.node(alt).max_path).map(|(a, b)| a.max(b));
                    }
                    if group.alternatives.is_empty() {
                        min = 0;
                    }
                    match group.repeat {
                        Repeat::Once => (min, max),
                        Repeat::Optional { .. } => (0, max),
                        Repeat::Loop { .. } => (0, if max == Some(0) { max } else { None }),
                    }
                }
                NodeKind::BackReference(_) => (0, None),
                _ => (0, Some(0)),
            };
            let (min, max) = match ast.node(id).quantifier {
                Some(q) => (
                    min.saturating_mul(q.min),
                    match (max, q.max) {
                        (Some(0), _) => Some(0),
                        (Some(m), Some(n)) => Some(m.saturating_mul(n)),
                        _ => None,
                    },
                ),
                None => (min, max),
            };
            let node = ast.node_mut(id);
            node.min_path = min;
            node.max_path = max;
        }
    }
}

/// Outcome of [`PreCalcResultVisitor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreCalcOutcome {
    pub result: PreCalculatedResult,
    /// The matched string, when every consuming node matches exactly one code unit
    pub literal: Option<Vec<u16>>,
    /// A `^` precedes everything that consumes
    pub starts_with_caret: bool,
    /// A `$` follows everything that consumes
    pub ends_with_dollar: bool,
    /// Any other assertion was seen
    pub has_other_assertions: bool,
}

/// Walks a pattern without alternation, repetition or lookaround and records where each
/// capture group starts and ends relative to the match start
pub struct PreCalcResultVisitor;

impl PreCalcResultVisitor {
    /// `None` when the match shape is not fixed
    pub fn run(ast: &RegexAst) -> Option<PreCalcOutcome> {
        let mut offsets = vec![-1i32; ast.group_count() * 2];
        let mut index = 0i32;
        let mut literal = Some(Vec::new());
        let mut starts_with_caret = false;
        let mut ends_with_dollar = false;
        let mut has_other_assertions = false;
        let mut traversal = DepthFirstTraversal::new(ast.root_group());
        while let Some(visit) = traversal.next(ast) {
            let id = match visit {
                Visit::Enter(id) => id,
                Visit::Leave(id) => {
                    if let Some(number) = ast.group(id).and_then(|g| g.capture) {
                        offsets[number as usize * 2 + 1] = index;
                    }
                    continue;
                }
            };
            let node = ast.node(id);
            if node.quantifier.is_some() || node.flags.contains(NodeFlags::DEAD) {
                return None;
            }
            match &node.kind {
                NodeKind::Group(group) => {
                    if group.alternatives.len() != 1 || group.repeat != Repeat::Once {
                        return None;
                    }
                    if let Some(number) = group.capture {
                        offsets[number as usize * 2] = index;
                    }
                }
                NodeKind::Sequence(_) => {}
                NodeKind::CharacterClass(set) => {
                    if ends_with_dollar {
                        literal = None;
                    }
                    match (set.single_char(), literal.as_mut()) {
                        (Some(c), Some(chars)) if c <= 0xFFFF => chars.push(c as u16),
                        _ => literal = None,
                    }
                    index += 1;
                }
                NodeKind::PositionAssertion(AssertionKind::Caret) if index == 0 => {
                    starts_with_caret = true;
                }
                NodeKind::PositionAssertion(AssertionKind::Dollar) => ends_with_dollar = true,
                NodeKind::PositionAssertion(_) => has_other_assertions = true,
                NodeKind::BackReference(_)
                | NodeKind::LookAhead(_)
                | NodeKind::LookBehind(_)
                | NodeKind::Root(_)
                | NodeKind::MatchFound => return None,
            }
        }
        Some(PreCalcOutcome {
            result: PreCalculatedResult::new(index as usize, offsets),
            literal,
            starts_with_caret,
            ends_with_dollar,
            has_other_assertions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::RegexFlags;
    use crate::parser::parse;
    use crate::RegexOptions;

    fn parse_ast(pattern: &str) -> RegexAst {
        let source = crate::RegexSource::new(pattern, RegexFlags::empty());
        parse(&source, &RegexOptions::default()).unwrap()
    }

    #[test]
    fn test_copy_visitor_duplicates_subtree() {
        let mut ast = parse_ast("(a|b)c");
        let group = ast.group(ast.root_group()).unwrap().alternatives[0];
        let first_term = ast.node(group).as_sequence().unwrap()[0];
        let before = ast.live_nodes();
        let copy = CopyVisitor::run(&mut ast, first_term).unwrap();
        assert_eq!(ast.live_nodes(), before + 5);
        assert_eq!(ast.node(copy).parent, None);
        assert_eq!(ast.group(copy).unwrap().capture, Some(1));
        assert_eq!(ast.group(copy).unwrap().alternatives.len(), 2);
    }

    #[test]
    fn test_init_ids_are_dense_after_reserved_prefix() {
        let mut ast = parse_ast("a(?=b)");
        InitIdVisitor::run(&mut ast);
        assert_eq!(ast.node(ast.root()).id, RESERVED_IDS);
        assert_eq!(ast.number_of_ids(), RESERVED_IDS + ast.live_nodes());
    }

    #[test]
    fn test_path_lengths() {
        let mut ast = parse_ast("ab?c{2,3}(?:d|ef)");
        let root_group = ast.root_group();
        CalcPathLengthVisitor::run(&mut ast, root_group);
        assert_eq!(ast.node(root_group).min_path, 4);
        assert_eq!(ast.node(root_group).max_path, Some(7));
        let mut ast = parse_ast("a+");
        let root_group = ast.root_group();
        CalcPathLengthVisitor::run(&mut ast, root_group);
        assert_eq!(ast.node(root_group).max_path, None);
    }

    #[test]
    fn test_pre_calc_literal() {
        let outcome = PreCalcResultVisitor::run(&parse_ast("^a(bc)$")).unwrap();
        assert_eq!(outcome.literal, Some("abc".encode_utf16().collect()));
        assert!(outcome.starts_with_caret && outcome.ends_with_dollar);
        assert_eq!(outcome.result.create_from_start(0).as_slice(), &[0, 3, 1, 3]);
        assert!(PreCalcResultVisitor::run(&parse_ast("a|b")).is_none());
        assert!(PreCalcResultVisitor::run(&parse_ast("a*")).is_none());
    }
}
