//! Candidate index returning the tree pairs whose histogram lower bound (after Kailing et al.)
//! is within the threshold.
//!
//! Instead of comparing every histogram with every other one, the index walks inverted lists
//! keyed by bucket: for a tree T only the trees sharing at least one bucket with T ever get a
//! partial sum. The partial sum is the overlap `sum_b min(T[b], U[b])`, from which the L1
//! distance follows as `|T| + |U| - 2 * overlap`, closing the buckets present in only one of
//! the two trees.
//!
//! Counters accumulate over every lookup made on one instance.

use crate::histogram::{HistogramCollection, TreeId};
use log::debug;

/// Bucket key to `(tree, count)` postings, trees in insertion order.
struct InvertedList {
    lists: Vec<Vec<(TreeId, u32)>>,
}

impl InvertedList {

    fn with_capacity(il_size: usize) -> Self {

        return Self {
            lists: vec![Vec::new(); il_size],
        }
    }

    fn get(&self, key: u32) -> &[(TreeId, u32)] {

        match self.lists.get(key as usize) {
            Some(list) => list,
            None => &[],
        }
    }

    fn push(&mut self, key: u32, posting: (TreeId, u32)) {

        let key = key as usize;
        if key >= self.lists.len() {
            self.lists.resize(key + 1, Vec::new());
        }
        self.lists[key].push(posting);
    }

    fn build(collection: &HistogramCollection, il_size: usize) -> Self {

        let mut inverted = Self::with_capacity(il_size);
        for (tree_id, histogram) in collection.iter() {
            for (key, count) in histogram.iter() {
                inverted.push(key, (*tree_id, count));
            }
        }

        return inverted;
    }
}

/// Per-tree overlap sums, dense over tree ids. Only the touched slots are reset between trees.
struct OverlapArena {
    overlap: Vec<u64>,
    touched: Vec<TreeId>,
}

impl OverlapArena {

    fn new(num_trees: usize) -> Self {

        return Self {
            overlap: vec![0; num_trees],
            touched: Vec::new(),
        }
    }

    //amount is a min of two non-zero counts, so a zero slot means untouched
    fn add(&mut self, tree_id: TreeId, amount: u64) {

        let slot = &mut self.overlap[tree_id as usize];
        if *slot == 0 {
            self.touched.push(tree_id);
        }
        *slot += amount;
    }

    /// Returns the accumulated `(tree, overlap)` pairs sorted by tree id and clears the arena.
    fn drain(&mut self) -> Vec<(TreeId, u64)> {

        self.touched.sort_unstable();

        let mut result = Vec::with_capacity(self.touched.len());
        for tree_id in self.touched.drain(..) {
            result.push((tree_id, self.overlap[tree_id as usize]));
            self.overlap[tree_id as usize] = 0;
        }

        return result;
    }
}

fn within_threshold(l1: u64, divisor: u64, distance_threshold: f64) -> bool {
    return (l1 as f64) / (divisor as f64) <= distance_threshold;
}

fn check_tree_ids(collection: &HistogramCollection) {

    for (position, (tree_id, _)) in collection.iter().enumerate() {
        assert_eq!(*tree_id as usize, position, "tree ids must be dense and in collection order");
    }
}

#[derive(Debug, Default)]
pub struct CandidateIndex {
    /// Number of pairs whose lower bound was fully evaluated.
    pre_candidates: u64,
    /// Number of inverted list accesses.
    il_lookups: u64,
}

impl CandidateIndex {

    pub fn new() -> Self {

        return Self {
            pre_candidates: 0,
            il_lookups: 0,
        }
    }

    /// First filter stage: appends to `join_candidates` every pair `(i, j)`, `i < j`, of the
    /// collection whose lower bound is at most `distance_threshold`.
    ///
    /// Pairs come out grouped by their larger id in increasing order, and by the smaller id within
    /// a group. `il_size` is the expected number of distinct bucket keys.
    pub fn lookup(
        &mut self,
        histogram_collection: &HistogramCollection,
        join_candidates: &mut Vec<(TreeId, TreeId)>,
        il_size: usize,
        distance_threshold: f64) {

        check_tree_ids(histogram_collection);

        if distance_threshold < 0.0 || histogram_collection.len() < 2 {
            return;
        }

        let divisor = histogram_collection.dimension().lower_bound_divisor();

        //pairs without a shared bucket have l1 = |T| + |U| and qualify only below this size
        let disjoint_size_limit = divisor as f64 * distance_threshold;

        let totals: Vec<u64> = histogram_collection.iter().map(|(_, h)| h.total()).collect();

        let mut inverted = InvertedList::with_capacity(il_size);
        let mut arena = OverlapArena::new(histogram_collection.len());
        let mut small_trees: Vec<TreeId> = Vec::new();

        let candidates_before = join_candidates.len();
        let pre_candidates_before = self.pre_candidates;

        for (tree_id, histogram) in histogram_collection.iter() {

            let tree_id = *tree_id;
            let total = totals[tree_id as usize];

            //only trees indexed so far are in the lists, so every pair is met once
            for (key, count) in histogram.iter() {
                self.il_lookups += 1;
                for (other_id, other_count) in inverted.get(key) {
                    arena.add(*other_id, u64::from(count.min(*other_count)));
                }
            }

            let partners = arena.drain();
            let mut qualifying: Vec<TreeId> = Vec::new();

            for (other_id, overlap) in partners.iter() {
                self.pre_candidates += 1;
                let l1 = total + totals[*other_id as usize] - 2 * overlap;
                if within_threshold(l1, divisor, distance_threshold) {
                    qualifying.push(*other_id);
                }
            }

            let is_small = total as f64 <= disjoint_size_limit;

            if is_small {
                for other_id in small_trees.iter() {
                    if partners.binary_search_by_key(other_id, |(id, _)| *id).is_ok() {
                        continue;
                    }
                    self.pre_candidates += 1;
                    let l1 = total + totals[*other_id as usize];
                    if within_threshold(l1, divisor, distance_threshold) {
                        qualifying.push(*other_id);
                    }
                }
            }

            qualifying.sort_unstable();
            for other_id in qualifying.into_iter() {
                join_candidates.push((other_id, tree_id));
            }

            for (key, count) in histogram.iter() {
                inverted.push(key, (tree_id, count));
            }

            if is_small {
                small_trees.push(tree_id);
            }
        }

        debug!("{} lookup: {} precandidates, {} candidates",
               histogram_collection.dimension(),
               self.pre_candidates - pre_candidates_before,
               join_candidates.len() - candidates_before);
    }

    /// Refinement stage: keeps only the pairs of `join_candidates` whose lower bound over this
    /// collection is at most `distance_threshold`, preserving their order.
    ///
    /// Pairs must reference trees of the collection with the smaller id first.
    pub fn lookup_within(
        &mut self,
        histogram_collection: &HistogramCollection,
        join_candidates: &mut Vec<(TreeId, TreeId)>,
        il_size: usize,
        distance_threshold: f64) {

        check_tree_ids(histogram_collection);

        if join_candidates.is_empty() {
            return;
        }

        if distance_threshold < 0.0 {
            join_candidates.clear();
            return;
        }

        let num_trees = histogram_collection.len();
        let divisor = histogram_collection.dimension().lower_bound_divisor();

        //candidate partners grouped by the larger id, with their position in join_candidates
        let mut partners: Vec<Vec<(TreeId, usize)>> = vec![Vec::new(); num_trees];
        for (position, (first, second)) in join_candidates.iter().enumerate() {
            assert!(first < second, "candidate pair ({}, {}) is not ordered", first, second);
            assert!((*second as usize) < num_trees, "candidate pair ({}, {}) is out of range", first, second);
            partners[*second as usize].push((*first, position));
        }

        let inverted = InvertedList::build(histogram_collection, il_size);
        let mut arena = OverlapArena::new(num_trees);
        let mut is_partner = vec![false; num_trees];
        let mut keep = vec![false; join_candidates.len()];

        let pre_candidates_before = self.pre_candidates;

        for (tree_id, histogram) in histogram_collection.iter() {

            let tree_partners = &partners[*tree_id as usize];
            if tree_partners.is_empty() {
                continue;
            }

            for (other_id, _) in tree_partners.iter() {
                is_partner[*other_id as usize] = true;
            }

            for (key, count) in histogram.iter() {
                self.il_lookups += 1;
                for (other_id, other_count) in inverted.get(key) {
                    if is_partner[*other_id as usize] {
                        arena.add(*other_id, u64::from(count.min(*other_count)));
                    }
                }
            }

            let overlaps = arena.drain();
            let total = histogram.total();

            for (other_id, position) in tree_partners.iter() {
                self.pre_candidates += 1;
                let overlap = match overlaps.binary_search_by_key(other_id, |(id, _)| *id) {
                    Ok(i) => overlaps[i].1,
                    Err(_) => 0,
                };
                let l1 = total + histogram_collection.get(*other_id).total() - 2 * overlap;
                keep[*position] = within_threshold(l1, divisor, distance_threshold);
                is_partner[*other_id as usize] = false;
            }
        }

        let candidates_before = join_candidates.len();

        let survivors: Vec<(TreeId, TreeId)> = join_candidates
            .iter()
            .zip(keep.iter())
            .filter(|(_, kept)| **kept)
            .map(|(pair, _)| *pair)
            .collect();
        *join_candidates = survivors;

        debug!("{} refinement: {} precandidates, {} of {} candidates kept",
               histogram_collection.dimension(),
               self.pre_candidates - pre_candidates_before,
               join_candidates.len(),
               candidates_before);
    }

    pub fn get_number_of_pre_candidates(&self) -> u64 {
        return self.pre_candidates;
    }

    /// Seeds or resets the precandidate counter between chained stages.
    pub fn set_number_of_pre_candidates(&mut self, pc: u64) {
        self.pre_candidates = pc;
    }

    pub fn get_number_of_il_lookups(&self) -> u64 {
        return self.il_lookups;
    }
}
