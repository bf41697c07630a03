//! Turns a tree collection into its label, degree and leaf-distance histograms.

use crate::histogram::{Dimension, Histogram, HistogramCollection};
use crate::node::Node;
use std::collections::HashMap;
use std::hash::Hash;

/// The three histogram collections of one tree collection, index-aligned with it.
#[derive(Debug, Clone)]
pub struct Histograms {
    pub label: HistogramCollection,
    pub degree: HistogramCollection,
    pub leaf_distance: HistogramCollection,
}

impl Histograms {

    pub fn get(&self, dimension: Dimension) -> &HistogramCollection {
        match dimension {
            Dimension::Label => &self.label,
            Dimension::Degree => &self.degree,
            Dimension::LeafDistance => &self.leaf_distance,
        }
    }

    pub fn len(&self) -> usize {
        return self.label.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.label.is_empty();
    }
}

/// Assigns label ids in order of first appearance, so ids are stable for one collection.
#[derive(Debug)]
pub struct HistogramConverter<L> {
    label_ids: HashMap<L, u32>,
}

impl<L: Eq + Hash + Clone> HistogramConverter<L> {

    pub fn new() -> Self {

        return Self {
            label_ids: HashMap::new(),
        }
    }

    pub fn create_histograms(&mut self, trees: &[Node<L>]) -> Histograms {

        let mut histograms = Histograms {
            label: HistogramCollection::new(Dimension::Label),
            degree: HistogramCollection::new(Dimension::Degree),
            leaf_distance: HistogramCollection::new(Dimension::LeafDistance),
        };

        for tree in trees.iter() {

            let mut label = Histogram::new(Dimension::Label);
            let mut degree = Histogram::new(Dimension::Degree);
            let mut leaf_distance = Histogram::new(Dimension::LeafDistance);

            self.visit(tree, &mut label, &mut degree, &mut leaf_distance);

            histograms.label.push(label);
            histograms.degree.push(degree);
            histograms.leaf_distance.push(leaf_distance);
        }

        return histograms;
    }

    /// Number of distinct labels seen so far.
    pub fn get_number_of_labels(&self) -> usize {
        return self.label_ids.len();
    }

    /// Fills all three histograms for the subtree and returns its height.
    fn visit(&mut self, node: &Node<L>, label: &mut Histogram, degree: &mut Histogram, leaf_distance: &mut Histogram) -> u32 {

        let next_id = self.label_ids.len() as u32;
        let label_id = *self.label_ids.entry(node.label().clone()).or_insert(next_id);

        label.increment(label_id);
        degree.increment(node.get_children_number() as u32);

        let mut height = 0;
        for child in node.children() {
            let child_height = self.visit(child, label, degree, leaf_distance);
            height = height.max(child_height + 1);
        }

        leaf_distance.increment(height);

        return height;
    }
}

impl<L: Eq + Hash + Clone> Default for HistogramConverter<L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::parser::BracketNotationParser;

    #[test]
    fn histograms_of_small_collection() {

        let trees = BracketNotationParser::parse_collection_str("{a{b}{c{a}}}\n{b}\n").unwrap();

        let mut converter = HistogramConverter::new();
        let histograms = converter.create_histograms(&trees);

        assert_eq!(histograms.len(), 2);
        assert_eq!(converter.get_number_of_labels(), 3);

        //a=0, b=1, c=2
        let label = histograms.label.get(0);
        assert_eq!(label.get(0), 2);
        assert_eq!(label.get(1), 1);
        assert_eq!(label.get(2), 1);
        assert_eq!(histograms.label.get(1).get(1), 1);

        let degree = histograms.degree.get(0);
        assert_eq!(degree.get(0), 2);
        assert_eq!(degree.get(1), 1);
        assert_eq!(degree.get(2), 1);

        let leaf_distance = histograms.leaf_distance.get(0);
        assert_eq!(leaf_distance.get(0), 2);
        assert_eq!(leaf_distance.get(1), 1);
        assert_eq!(leaf_distance.get(2), 1);
    }

    #[test]
    fn counts_sum_to_tree_size() {

        let trees = BracketNotationParser::parse_collection("test_data/join_reference.bracket").unwrap();

        let mut converter = HistogramConverter::new();
        let histograms = converter.create_histograms(&trees);

        for (i, tree) in trees.iter().enumerate() {
            let size = tree.get_tree_size() as u64;
            for dimension in Dimension::all() {
                assert_eq!(histograms.get(dimension).get(i as u32).total(), size);
            }
        }
    }
}
