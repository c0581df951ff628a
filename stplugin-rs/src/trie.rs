//! Prefix trie over variable names.
//!
//! The alphabet is the 63 symbols legal in a variable name, ordered
//! `_`, `0-9`, `a-z`, `A-Z`.  Nodes live in a single arena (`Vec<Node>`) and
//! refer to their children by position, so dropping the trie frees every node
//! at once.
//!
//! Each node counts how many inserted names continue *past* it.  A query that
//! lands on a node without an exact match resolves as an abbreviation only if
//! that count is exactly one.

use std::num::NonZeroU32;

use crate::error::{BridgeError, BridgeResult};

pub const ALPHABET_SIZE: usize = 63;

/// Position of `c` in the name alphabet, or `None` if `c` cannot appear in a
/// variable name.
pub fn symbol_index(c: char) -> Option<usize> {
    match c {
        '_' => Some(0),
        '0'..='9' => Some(c as usize - '0' as usize + 1),
        'a'..='z' => Some(c as usize - 'a' as usize + 11),
        'A'..='Z' => Some(c as usize - 'A' as usize + 37),
        _ => None,
    }
}

/// Child references are arena positions; the root (position 0) is never a
/// child, so zero doubles as "no edge".
type NodeId = NonZeroU32;

#[derive(Debug, Clone)]
struct Node {
    index: Option<usize>,
    prefix_count: u32,
    children: [Option<NodeId>; ALPHABET_SIZE],
}

impl Node {
    fn new() -> Self {
        Self { index: None, prefix_count: 0, children: [None; ALPHABET_SIZE] }
    }
}

/// Name → catalog index resolver with unique-prefix abbreviation.
#[derive(Debug, Clone)]
pub struct NameTrie {
    nodes: Vec<Node>,
}

impl Default for NameTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl NameTrie {
    pub fn new() -> Self {
        Self { nodes: vec![Node::new()] }
    }

    /// Number of allocated nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert `name` with catalog position `index`.
    ///
    /// Every node passed on the way down has its prefix count bumped; the
    /// terminal node records `index`.  A character outside the alphabet ends
    /// the insertion on the spot: the node reached so far still counts the
    /// name as passing through, but no exact match is recorded.
    pub fn insert(&mut self, name: &str, index: usize) {
        let mut node = 0usize;
        for c in name.chars() {
            self.nodes[node].prefix_count += 1;
            let Some(k) = symbol_index(c) else {
                log::debug!("name {name:?} truncated at illegal character {c:?}");
                return;
            };
            node = match self.nodes[node].children[k] {
                Some(child) => child.get() as usize,
                None => self.push_child(node, k),
            };
        }
        self.nodes[node].index = Some(index);
    }

    fn push_child(&mut self, parent: usize, k: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::new());
        // id >= 1 because the root occupies slot 0.
        self.nodes[parent].children[k] = NonZeroU32::new(id as u32);
        id
    }

    /// Resolve `query` to a catalog index.
    ///
    /// An exact match always wins.  Otherwise, with `allow_abbreviation`, a
    /// prefix shared by exactly one name resolves to that name; a prefix
    /// shared by two or more is ambiguous.
    pub fn resolve(&self, query: &str, allow_abbreviation: bool) -> BridgeResult<usize> {
        if query.is_empty() {
            return Err(BridgeError::InvalidName("empty string not allowed".into()));
        }

        let mut node = 0usize;
        for c in query.chars() {
            let k = symbol_index(c).ok_or_else(|| {
                BridgeError::InvalidName(format!("{query:?} cannot be a variable name"))
            })?;
            node = match self.nodes[node].children[k] {
                Some(child) => child.get() as usize,
                None => return Err(BridgeError::NotFound(format!("variable {query} not found"))),
            };
        }

        if let Some(index) = self.nodes[node].index {
            return Ok(index);
        }
        if !allow_abbreviation {
            return Err(BridgeError::NotFound(format!(
                "variable {query} not found (abbreviations not allowed)"
            )));
        }
        if self.nodes[node].prefix_count > 1 {
            return Err(BridgeError::AmbiguousAbbreviation(query.to_owned()));
        }

        // Exactly one name continues below: follow its chain.
        while self.nodes[node].index.is_none() {
            node = self.nodes[node]
                .children
                .iter()
                .flatten()
                .next()
                .map(|child| child.get() as usize)
                .ok_or_else(|| {
                    BridgeError::InternalInconsistency(format!(
                        "abbreviation {query} leads to a dead end"
                    ))
                })?;
        }
        self.nodes[node]
            .index
            .ok_or_else(|| BridgeError::InternalInconsistency(format!("lost match for {query}")))
    }
}

impl<'a> FromIterator<&'a str> for NameTrie {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut trie = NameTrie::new();
        for (i, name) in iter.into_iter().enumerate() {
            trie.insert(name, i);
        }
        trie
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
