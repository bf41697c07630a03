//! Histograms over one structural dimension of a tree and the lower bound derived from them.
//!
//! Every edit operation changes a histogram by a bounded amount, so the L1 distance between two
//! histograms divided by that bound can never exceed the unit-cost tree edit distance.

use crate::error::Error;
use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Dense, zero-based position of a tree in the collection being joined.
pub type TreeId = u32;

/// Structural histograms of Kailing et al. ("Efficient similarity search for hierarchical data
/// in large databases"), whose lower-bound divisors 2, 3 and 1 are used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Bucket key is a label id.
    Label,
    /// Bucket key is the number of children.
    Degree,
    /// Bucket key is the height of the node, i.e. its longest downward path to a leaf.
    LeafDistance,
}

impl Dimension {

    /// Label, degree, leaf distance: the default filter order, cheapest and most selective first.
    pub fn all() -> [Dimension; 3] {
        return [Dimension::Label, Dimension::Degree, Dimension::LeafDistance];
    }

    /// Largest change of the histogram L1 distance a single unit-cost edit operation can cause.
    ///
    /// - label: a rename moves one count between two buckets, insert and delete touch one bucket
    /// - degree: deleting a node drops its own bucket and moves its parent between two buckets
    /// - leaf distance: the heights that change along the ancestor chain are consecutive, so the
    ///   shifts cancel except at one bucket
    pub fn lower_bound_divisor(&self) -> u64 {
        match self {
            Dimension::Label => 2,
            Dimension::Degree => 3,
            Dimension::LeafDistance => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Label => "label",
            Dimension::Degree => "degree",
            Dimension::LeafDistance => "leaf_distance",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "label" => Ok(Dimension::Label),
            "degree" => Ok(Dimension::Degree),
            "leaf_distance" | "leaf-distance" => Ok(Dimension::LeafDistance),
            other => Err(Error::Config(format!("unknown histogram dimension: {}", other))),
        }
    }
}

/// Frequency of bucket keys over the nodes of one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    dimension: Dimension,
    buckets: HashMap<u32, u32>,
    total: u64,
}

impl Histogram {

    pub fn new(dimension: Dimension) -> Self {

        return Self {
            dimension,
            buckets: HashMap::new(),
            total: 0,
        }
    }

    pub fn from_counts(dimension: Dimension, counts: &[(u32, u32)]) -> Self {

        let mut histogram = Self::new(dimension);
        for (key, count) in counts.iter() {
            if *count == 0 {
                continue;
            }
            *histogram.buckets.entry(*key).or_insert(0) += count;
            histogram.total += *count as u64;
        }

        return histogram;
    }

    pub fn increment(&mut self, key: u32) {

        *self.buckets.entry(key).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn dimension(&self) -> Dimension {
        return self.dimension;
    }

    /// Count at `key`, zero when absent.
    pub fn get(&self, key: u32) -> u32 {
        return *self.buckets.get(&key).unwrap_or(&0);
    }

    /// Non-zero buckets as `(key, count)`, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.buckets.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        return self.buckets.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.buckets.is_empty();
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        return self.total;
    }

    /// Largest key plus one, zero for an empty histogram.
    pub fn domain_size(&self) -> usize {
        return self.buckets.keys().max().map(|k| *k as usize + 1).unwrap_or(0);
    }

    /// Sum of absolute count differences over the union of both key sets.
    ///
    /// Panics if the histograms describe different dimensions.
    pub fn l1_distance(&self, other: &Histogram) -> u64 {

        assert_eq!(self.dimension, other.dimension, "histograms from different bucket spaces");

        let mut overlap: u64 = 0;
        for (key, count) in self.iter() {
            overlap += u64::from(count.min(other.get(key)));
        }

        return self.total + other.total - 2 * overlap;
    }

    /// Lower bound on the unit-cost tree edit distance between the two trees.
    pub fn lower_bound(&self, other: &Histogram) -> f64 {
        return self.l1_distance(other) as f64 / self.dimension.lower_bound_divisor() as f64;
    }
}

/// One histogram per tree for a single dimension, position `i` belonging to tree `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramCollection {
    dimension: Dimension,
    entries: Vec<(TreeId, Histogram)>,
}

impl HistogramCollection {

    pub fn new(dimension: Dimension) -> Self {

        return Self {
            dimension,
            entries: Vec::new(),
        }
    }

    /// Appends the histogram of the next tree and returns its id.
    pub fn push(&mut self, histogram: Histogram) -> TreeId {

        assert_eq!(histogram.dimension(), self.dimension, "histogram does not belong to this collection");

        let id = self.entries.len() as TreeId;
        self.entries.push((id, histogram));
        return id;
    }

    pub fn dimension(&self) -> Dimension {
        return self.dimension;
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn get(&self, id: TreeId) -> &Histogram {
        return &self.entries[id as usize].1;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (TreeId, Histogram)> {
        return self.entries.iter();
    }

    /// Number of keys an inverted list over this collection needs.
    pub fn domain_size(&self) -> usize {
        return self.entries.iter().map(|(_, h)| h.domain_size()).max().unwrap_or(0);
    }
}
