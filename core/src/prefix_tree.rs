//! Radix tree keyed by literal prefixes.
//!
//! O(k) insert and lookup where k is the key length. The prefix-trie projector
//! stores one candidate list per distinct fixed prefix here and looks up the
//! longest stored prefix of an item's field value.

use std::collections::HashMap;

/// A radix tree (compressed trie) for longest-prefix lookups.
///
/// Common prefixes share one edge; each node indexes its children by the first
/// character of their edge. Edges are only ever split on character boundaries.
#[derive(Debug, Clone)]
pub struct PrefixTree<V> {
    root: Node<V>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    /// The edge leading to this node.
    edge: String,
    value: Option<V>,
    children: HashMap<char, Node<V>>,
}

impl<V> Default for PrefixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PrefixTree<V> {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::new(String::new()),
            len: 0,
        }
    }

    /// Insert a key-value pair, returning the replaced value if the key existed.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let replaced = self.root.insert(key, value);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// Value stored under exactly `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.root.get(key)
    }

    /// Value with the longest key that is a prefix of `key`.
    ///
    /// # Example
    ///
    /// ```
    /// use depmatch::PrefixTree;
    ///
    /// let mut tree = PrefixTree::new();
    /// tree.insert("Acme", "acme");
    /// tree.insert("Acme.Billing", "billing");
    ///
    /// assert_eq!(tree.find_longest_prefix("Acme.Billing.Invoice"), Some(&"billing"));
    /// assert_eq!(tree.find_longest_prefix("Acme.Core"), Some(&"acme"));
    /// assert_eq!(tree.find_longest_prefix("Other"), None);
    /// ```
    #[must_use]
    pub fn find_longest_prefix(&self, key: &str) -> Option<&V> {
        let mut current = &self.root;
        let mut remaining = key;
        let mut last_match = current.value.as_ref();

        while let Some(first) = remaining.chars().next() {
            let Some(child) = current.children.get(&first) else {
                break;
            };
            let Some(rest) = remaining.strip_prefix(child.edge.as_str()) else {
                break;
            };
            remaining = rest;
            current = child;
            if current.value.is_some() {
                last_match = current.value.as_ref();
            }
        }

        last_match
    }

    /// All stored values, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                stack.extend(node.children.values());
                if let Some(value) = &node.value {
                    return Some(value);
                }
            }
            None
        })
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<V> Node<V> {
    fn new(edge: String) -> Self {
        Self {
            edge,
            value: None,
            children: HashMap::new(),
        }
    }

    fn leaf(edge: &str, value: V) -> Self {
        let mut node = Self::new(edge.to_string());
        node.value = Some(value);
        node
    }

    fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let Some(first) = key.chars().next() else {
            return self.value.replace(value);
        };

        let Some(child) = self.children.get_mut(&first) else {
            self.children.insert(first, Node::leaf(key, value));
            return None;
        };

        let common = common_prefix_len(key, &child.edge);
        if common == child.edge.len() {
            return child.insert(&key[common..], value);
        }

        // Split the child's edge at `common`; `first` is shared, so `common > 0`.
        let mut old_child = std::mem::replace(child, Node::new(key[..common].to_string()));
        old_child.edge = old_child.edge[common..].to_string();
        if let Some(old_first) = old_child.edge.chars().next() {
            child.children.insert(old_first, old_child);
        }

        let remaining = &key[common..];
        match remaining.chars().next() {
            None => child.value = Some(value),
            Some(next) => {
                child.children.insert(next, Node::leaf(remaining, value));
            }
        }
        None
    }

    fn get(&self, key: &str) -> Option<&V> {
        let Some(first) = key.chars().next() else {
            return self.value.as_ref();
        };
        let child = self.children.get(&first)?;
        child.get(key.strip_prefix(child.edge.as_str())?)
    }
}

/// Byte length of the common prefix of two strings, on a character boundary.
#[inline]
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}
