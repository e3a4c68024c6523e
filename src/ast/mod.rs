//! Arena-allocated regex syntax tree
//!
//! Nodes live in a single vector and refer to each other by index. Parent links are plain
//! indices, so the tree can be mutated in place by the optimization passes without any
//! ownership cycles.

pub mod visitors;

use bitflags::bitflags;

use crate::charset::CodePointSet;
use crate::error::{RegexError, Result};
use crate::flags::RegexFlags;
use crate::parser::RegexProperties;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    /// `None` for an open upper bound
    pub max: Option<u32>,
    pub greedy: bool,
}

impl Quantifier {
    /// True if unrolling this quantifier would need more than `limit` copies
    pub fn is_large(&self, limit: u32) -> bool {
        self.min > limit || self.max.is_some_and(|max| max > limit)
    }
}

/// How often a group's alternatives are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    /// Zero or one iteration
    Optional { greedy: bool },
    /// Any number of iterations
    Loop { greedy: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub alternatives: Vec<NodeId>,
    /// Capture group number, 0 for the whole match
    pub capture: Option<u32>,
    pub repeat: Repeat,
    /// An iteration (one pass through an alternative) that consumes nothing is rejected
    pub empty_check: bool,
    /// Capture groups reset when an alternative is entered
    pub clears: Option<(u32, u32)>,
}

impl Group {
    pub(crate) fn new(capture: Option<u32>) -> Self {
        Self {
            alternatives: Vec::new(),
            capture,
            repeat: Repeat::Once,
            empty_check: false,
            clears: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssertionKind {
    Caret,
    Dollar,
    WordBoundary,
    NonWordBoundary,
    /// Not between the halves of a surrogate pair. Guards lone surrogates in unicode mode.
    CodePointBoundary,
}

/// A node owning a group and the `MatchFound` marker that ends it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtreeRoot {
    pub group: NodeId,
    pub match_found: NodeId,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Group(Group),
    Sequence(Vec<NodeId>),
    CharacterClass(CodePointSet),
    BackReference(u32),
    PositionAssertion(AssertionKind),
    LookAhead(SubtreeRoot),
    LookBehind(SubtreeRoot),
    Root(SubtreeRoot),
    MatchFound,
}

impl NodeKind {
    pub fn subtree_root(&self) -> Option<&SubtreeRoot> {
        match self {
            NodeKind::LookAhead(root) | NodeKind::LookBehind(root) | NodeKind::Root(root) => {
                Some(root)
            }
            _ => None,
        }
    }

    pub fn is_lookaround(&self) -> bool {
        matches!(self, NodeKind::LookAhead(_) | NodeKind::LookBehind(_))
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Can never match
        const DEAD = 1;
        /// Inside the body of a lookahead or lookbehind
        const IN_LOOKAROUND = 1 << 1;
        /// Result of unrolling a quantifier; never unrolled again
        const EXPANDED_QUANTIFIER = 1 << 2;
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub quantifier: Option<Quantifier>,
    pub flags: NodeFlags,
    /// Dense id assigned by [`visitors::InitIdVisitor`]
    pub id: usize,
    /// Consumed length bounds assigned by [`visitors::CalcPathLengthVisitor`]
    pub min_path: u32,
    pub max_path: Option<u32>,
    live: bool,
}

impl Node {
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[NodeId]> {
        match &self.kind {
            NodeKind::Sequence(terms) => Some(terms),
            _ => None,
        }
    }
}

/// The syntax tree of one pattern together with the bookkeeping the compiler relies on
#[derive(Debug, Clone)]
pub struct RegexAst {
    nodes: Vec<Node>,
    root: NodeId,
    live_nodes: usize,
    node_limit: usize,
    flags: RegexFlags,
    pub(crate) properties: RegexProperties,
    /// Number of capture groups, group 0 included
    pub(crate) group_count: u32,
    pub(crate) group_names: Vec<(String, u32)>,
    carets: Vec<NodeId>,
    dollars: Vec<NodeId>,
    lookarounds: Vec<NodeId>,
    number_of_ids: usize,
}

impl RegexAst {
    /// An AST holding only the root, its top-level group (capture 0) and one empty
    /// alternative
    pub fn new(flags: RegexFlags, node_limit: usize) -> Result<Self> {
        let mut ast = Self {
            nodes: Vec::new(),
            root: 0,
            live_nodes: 0,
            node_limit,
            flags,
            properties: RegexProperties::empty(),
            group_count: 1,
            group_names: Vec::new(),
            carets: Vec::new(),
            dollars: Vec::new(),
            lookarounds: Vec::new(),
            number_of_ids: 0,
        };
        let root = ast.register(
            NodeKind::Root(SubtreeRoot {
                group: 0,
                match_found: 0,
                negated: false,
            }),
            None,
        )?;
        let group = ast.register(NodeKind::Group(Group::new(Some(0))), Some(root))?;
        let match_found = ast.register(NodeKind::MatchFound, Some(root))?;
        if let NodeKind::Root(subtree) = &mut ast.nodes[root].kind {
            subtree.group = group;
            subtree.match_found = match_found;
        }
        ast.root = root;
        ast.add_alternative(group)?;
        Ok(ast)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The top-level group, capture group 0
    pub fn root_group(&self) -> NodeId {
        self.nodes[self.root]
            .kind
            .subtree_root()
            .map_or(self.root, |root| root.group)
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    pub fn properties(&self) -> RegexProperties {
        self.properties
    }

    pub fn group_count(&self) -> usize {
        self.group_count as usize
    }

    pub fn group_names(&self) -> &[(String, u32)] {
        &self.group_names
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn group(&self, id: NodeId) -> Option<&Group> {
        self.nodes[id].as_group()
    }

    pub fn group_mut(&mut self, id: NodeId) -> Option<&mut Group> {
        match &mut self.nodes[id].kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn live_nodes(&self) -> usize {
        self.live_nodes
    }

    pub fn carets(&self) -> &[NodeId] {
        &self.carets
    }

    pub fn dollars(&self) -> &[NodeId] {
        &self.dollars
    }

    /// Live lookahead and lookbehind nodes in creation order
    pub fn lookarounds(&self) -> &[NodeId] {
        &self.lookarounds
    }

    pub fn lookbehinds(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.lookarounds
            .iter()
            .copied()
            .filter(|&id| matches!(self.nodes[id].kind, NodeKind::LookBehind(_)))
    }

    /// Count of ids handed out by the last [`visitors::InitIdVisitor`] run
    pub fn number_of_ids(&self) -> usize {
        self.number_of_ids
    }

    pub(crate) fn set_number_of_ids(&mut self, count: usize) {
        self.number_of_ids = count;
    }

    /// Children in traversal order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id].kind {
            NodeKind::Group(group) => group.alternatives.clone(),
            NodeKind::Sequence(terms) => terms.clone(),
            NodeKind::LookAhead(root) | NodeKind::LookBehind(root) | NodeKind::Root(root) => {
                vec![root.group, root.match_found]
            }
            _ => Vec::new(),
        }
    }

    /// Allocate a node. Fails with a bailout once the live node count passes the limit.
    pub fn register(&mut self, kind: NodeKind, parent: Option<NodeId>) -> Result<NodeId> {
        if self.live_nodes >= self.node_limit {
            return Err(RegexError::unsupported(format!(
                "parse tree exceeds {} nodes",
                self.node_limit
            )));
        }
        let id = self.nodes.len();
        match &kind {
            NodeKind::PositionAssertion(AssertionKind::Caret) => self.carets.push(id),
            NodeKind::PositionAssertion(AssertionKind::Dollar) => self.dollars.push(id),
            NodeKind::LookAhead(_) | NodeKind::LookBehind(_) => self.lookarounds.push(id),
            _ => {}
        }
        let flags = match parent {
            Some(parent) if self.in_lookaround(parent) => NodeFlags::IN_LOOKAROUND,
            _ => NodeFlags::empty(),
        };
        self.nodes.push(Node {
            kind,
            parent,
            quantifier: None,
            flags,
            id: 0,
            min_path: 0,
            max_path: Some(0),
            live: true,
        });
        self.live_nodes += 1;
        Ok(id)
    }

    fn in_lookaround(&self, node: NodeId) -> bool {
        self.nodes[node].flags.contains(NodeFlags::IN_LOOKAROUND)
            || self.nodes[node].kind.is_lookaround()
    }

    /// Append an empty alternative to a group
    pub fn add_alternative(&mut self, group: NodeId) -> Result<NodeId> {
        let sequence = self.register(NodeKind::Sequence(Vec::new()), Some(group))?;
        if let Some(group) = self.group_mut(group) {
            group.alternatives.push(sequence);
        }
        Ok(sequence)
    }

    /// Append a new term to a sequence
    pub fn add_term(&mut self, sequence: NodeId, kind: NodeKind) -> Result<NodeId> {
        let term = self.register(kind, Some(sequence))?;
        self.attach_term(sequence, term);
        Ok(term)
    }

    /// Create a non-capturing or capturing group as the last term of `sequence`
    pub fn add_group(&mut self, sequence: NodeId, capture: Option<u32>) -> Result<NodeId> {
        self.add_term(sequence, NodeKind::Group(Group::new(capture)))
    }

    /// Create a lookaround term with its group and `MatchFound` marker
    pub fn add_lookaround(
        &mut self,
        sequence: NodeId,
        behind: bool,
        negated: bool,
    ) -> Result<NodeId> {
        let placeholder = SubtreeRoot {
            group: 0,
            match_found: 0,
            negated,
        };
        let kind = if behind {
            NodeKind::LookBehind(placeholder)
        } else {
            NodeKind::LookAhead(placeholder)
        };
        let term = self.add_term(sequence, kind)?;
        let group = self.register(NodeKind::Group(Group::new(None)), Some(term))?;
        let match_found = self.register(NodeKind::MatchFound, Some(term))?;
        if let NodeKind::LookAhead(root) | NodeKind::LookBehind(root) = &mut self.nodes[term].kind
        {
            root.group = group;
            root.match_found = match_found;
        }
        Ok(term)
    }

    pub(crate) fn attach_term(&mut self, sequence: NodeId, term: NodeId) {
        self.nodes[term].parent = Some(sequence);
        if let NodeKind::Sequence(terms) = &mut self.nodes[sequence].kind {
            terms.push(term);
        }
    }

    /// Swap `old` for `new` in the parent's child list. `old` becomes parentless.
    pub(crate) fn replace_in_parent(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.nodes[old].parent else {
            return;
        };
        match &mut self.nodes[parent].kind {
            NodeKind::Sequence(children) => {
                if let Some(slot) = children.iter_mut().find(|child| **child == old) {
                    *slot = new;
                }
            }
            NodeKind::Group(group) => {
                if let Some(slot) = group.alternatives.iter_mut().find(|child| **child == old) {
                    *slot = new;
                }
            }
            _ => {}
        }
        self.nodes[new].parent = Some(parent);
        self.nodes[old].parent = None;
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node].parent else {
            return;
        };
        match &mut self.nodes[parent].kind {
            NodeKind::Sequence(children) => children.retain(|&child| child != node),
            NodeKind::Group(group) => group.alternatives.retain(|&child| child != node),
            _ => {}
        }
    }

    /// Cut a subtree out of the tree and unregister all of its nodes
    pub fn remove_subtree(&mut self, node: NodeId) {
        self.detach(node);
        visitors::DeleteVisitor::run(self, node);
    }

    pub(crate) fn unregister(&mut self, doomed: &[NodeId]) {
        for &node in doomed {
            if std::mem::replace(&mut self.nodes[node].live, false) {
                self.live_nodes -= 1;
            }
        }
        self.carets.retain(|&id| self.nodes[id].live);
        self.dollars.retain(|&id| self.nodes[id].live);
        self.lookarounds.retain(|&id| self.nodes[id].live);
    }

    /// Ensure the node budget allows `additional` more nodes
    pub fn check_budget(&self, additional: usize) -> Result<()> {
        if self.live_nodes.saturating_add(additional) > self.node_limit {
            return Err(RegexError::unsupported(format!(
                "parse tree would exceed {} nodes",
                self.node_limit
            )));
        }
        Ok(())
    }

    /// Nearest enclosing lookaround of a node, if any
    pub fn enclosing_lookaround(&self, mut node: NodeId) -> Option<NodeId> {
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].kind.is_lookaround() {
                return Some(parent);
            }
            node = parent;
        }
        None
    }

    /// Number of lookarounds enclosing a node, the node itself included
    pub fn lookaround_depth(&self, node: NodeId) -> usize {
        let mut depth = usize::from(self.nodes[node].kind.is_lookaround());
        let mut current = node;
        while let Some(lookaround) = self.enclosing_lookaround(current) {
            depth += 1;
            current = lookaround;
        }
        depth
    }
}
