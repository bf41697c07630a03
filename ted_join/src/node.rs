//! Labeled ordered trees, the unit the join compares.
//!
//! A node owns its children in sibling order. Labels are opaque to everything except the
//! histogram converter (which hashes them) and the cost model (which compares them).

use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Node<L> {
    label: L,
    children: Vec<Node<L>>,
}

impl<L> Node<L> {

    pub fn new(label: L) -> Self {

        return Self {
            label,
            children: Vec::new(),
        }
    }

    /// Appends `child` as the new rightmost child.
    pub fn add_child(&mut self, child: Node<L>) {
        self.children.push(child);
    }

    pub fn label(&self) -> &L {
        return &self.label;
    }

    pub fn children(&self) -> &[Node<L>] {
        return &self.children;
    }

    pub fn get_children_number(&self) -> usize {
        return self.children.len();
    }

    pub fn is_leaf(&self) -> bool {
        return self.children.is_empty();
    }

    /// Number of nodes in the subtree rooted here.
    pub fn get_tree_size(&self) -> usize {

        let mut size = 1;
        for child in self.children.iter() {
            size += child.get_tree_size();
        }

        return size;
    }
}

impl Node<String> {

    /// Builds a random tree with `size` nodes whose labels are drawn from `alphabet`.
    ///
    /// Every node after the first picks a uniformly random earlier node as its parent, so shapes
    /// range from paths to stars.
    pub fn random<R: Rng>(rng: &mut R, size: usize, alphabet: &[&str]) -> Self {

        assert!(size > 0, "a tree has at least one node");
        assert!(!alphabet.is_empty(), "alphabet must not be empty");

        let labels: Vec<String> = (0..size)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())].to_string())
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); size];
        for i in 1..size {
            let parent = rng.gen_range(0..i);
            children[parent].push(i);
        }

        fn build(index: usize, labels: &[String], children: &[Vec<usize>]) -> Node<String> {

            let mut node = Node::new(labels[index].clone());
            for child in children[index].iter() {
                node.add_child(build(*child, labels, children));
            }
            return node;
        }

        return build(0, &labels, &children);
    }
}

/// Writes the tree back in bracket notation, escaping braces and backslashes in labels.
impl<L: fmt::Display> fmt::Display for Node<L> {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {

        write!(f, "{{")?;
        for c in self.label.to_string().chars() {
            match c {
                '{' | '}' | '\\' => write!(f, "\\{}", c)?,
                _ => write!(f, "{}", c)?,
            }
        }
        for child in self.children.iter() {
            write!(f, "{}", child)?;
        }
        write!(f, "}}")
    }
}
