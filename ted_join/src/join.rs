//! Histogram-filtered tree similarity join.
//!
//! A join converts the trees to their three histograms, narrows the pair space with one
//! candidate index pass per histogram dimension (each pass only re-checks the survivors of the
//! previous one), and verifies what is left with an exact edit distance algorithm.

use crate::candidate_index::CandidateIndex;
use crate::converter::{HistogramConverter, Histograms};
use crate::error::Error;
use crate::histogram::{Dimension, TreeId};
use crate::node::Node;
use crate::verification::Verification;
use kdam::tqdm;
use log::{debug, info};
use serde::{Serialize, Deserialize};
use std::fs::File;
use std::hash::Hash;
use std::io::prelude::*;
use std::marker::PhantomData;
use std::path::Path;

/// A verified pair: both trees and their exact distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinResultElement {
    pub tree_id_1: TreeId,
    pub tree_id_2: TreeId,
    pub ted_value: f64,
}

impl JoinResultElement {

    pub fn new(tree_id_1: TreeId, tree_id_2: TreeId, ted_value: f64) -> Self {

        return Self {
            tree_id_1,
            tree_id_2,
            ted_value,
        }
    }
}

/// Settings of one join run, read from and written to YAML.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JoinConfig {
    pub input: String,
    pub output: Option<String>,
    pub threshold: f64,
    pub filter_order: Vec<Dimension>,
    pub progress: bool,
}

impl JoinConfig {

    pub fn default() -> Self {

        return Self {
            input: "join_input.bracket".to_string(),
            output: None,
            threshold: 1.0,
            filter_order: Dimension::all().to_vec(),
            progress: false,
        }
    }

    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self, Error> {

        let serialized = std::fs::read_to_string(filename)?;

        let deserialized: Self = serde_yaml::from_str(&serialized)?;

        deserialized.validate()?;

        return Ok(deserialized);
    }

    pub fn to_file<P: AsRef<Path>>(&self, filename: P) -> Result<(), Error> {

        let serialized = serde_yaml::to_string(&self)?;
        let mut file = File::create(filename)?;

        file.write_all(serialized.as_bytes())?;

        return Ok(());
    }

    pub fn validate(&self) -> Result<(), Error> {

        if self.threshold.is_nan() {
            return Err(Error::Config("threshold is not a number".to_string()));
        }

        if self.filter_order.is_empty() {
            return Err(Error::Config("filter_order names no histogram dimension".to_string()));
        }

        for (i, dimension) in self.filter_order.iter().enumerate() {
            if self.filter_order[..i].contains(dimension) {
                return Err(Error::Config(format!("filter_order names {} twice", dimension)));
            }
        }

        return Ok(());
    }
}

/// Writes join results as JSON when `filename` ends in `.json`, as YAML otherwise.
pub fn write_join_result<P: AsRef<Path>>(join_result: &[JoinResultElement], filename: P) -> Result<(), Error> {

    let path = filename.as_ref();

    let serialized = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(join_result)?,
        _ => serde_yaml::to_string(join_result)?,
    };

    let mut file = File::create(path)?;
    file.write_all(serialized.as_bytes())?;

    return Ok(());
}

/// The join orchestrator, generic over the tree label and the verification algorithm.
///
/// Statistics describe the last `execute_join`, except the subproblem count which sums over
/// every verification this instance made.
pub struct HistoJoin<L, V> {
    verifier: V,
    filter_order: Vec<Dimension>,
    show_progress: bool,
    /// Number of distinct labels of the last conversion.
    il_size: usize,
    pre_candidates: u64,
    il_lookups: u64,
    sum_subproblem_counter: u64,
    stage_candidates: Vec<(Dimension, usize)>,
    _label: PhantomData<L>,
}

impl<L: Eq + Hash + Clone, V: Verification<L>> HistoJoin<L, V> {

    /// Filters by label, then degree, then leaf distance.
    pub fn new(verifier: V) -> Self {

        return Self {
            verifier,
            filter_order: Dimension::all().to_vec(),
            show_progress: false,
            il_size: 0,
            pre_candidates: 0,
            il_lookups: 0,
            sum_subproblem_counter: 0,
            stage_candidates: Vec::new(),
            _label: PhantomData,
        }
    }

    pub fn from_config(verifier: V, config: &JoinConfig) -> Self {

        return Self::new(verifier)
            .with_filter_order(config.filter_order.clone())
            .with_progress(config.progress);
    }

    /// Panics if `filter_order` is empty or names a dimension twice.
    pub fn with_filter_order(mut self, filter_order: Vec<Dimension>) -> Self {

        assert!(!filter_order.is_empty(), "at least one histogram filter is required");
        for (i, dimension) in filter_order.iter().enumerate() {
            assert!(!filter_order[..i].contains(dimension), "{} filter given twice", dimension);
        }

        self.filter_order = filter_order;
        return self;
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {

        self.show_progress = show_progress;
        return self;
    }

    /// Returns every pair of `trees` whose edit distance is at most `distance_threshold`, smaller
    /// tree id first.
    pub fn execute_join(&mut self, trees: &[Node<L>], distance_threshold: f64) -> Vec<JoinResultElement> {

        info!("joining {} trees at threshold {}", trees.len(), distance_threshold);

        // Convert trees to label, degree, and leaf distance histograms.
        let histograms = self.convert_trees_to_histograms(trees);

        // Retrieve candidates, one filter per histogram dimension.
        let candidates = self.retrieve_candidates(&histograms, distance_threshold);

        // Verify all computed join candidates and return the join result.
        let join_result = self.verify_candidates(trees, &candidates, distance_threshold);

        info!("{} candidates, {} results, {} precandidates, {} il lookups, {} subproblems",
              candidates.len(),
              join_result.len(),
              self.pre_candidates,
              self.il_lookups,
              self.sum_subproblem_counter);

        return join_result;
    }

    pub fn convert_trees_to_histograms(&mut self, trees: &[Node<L>]) -> Histograms {

        let mut converter = HistogramConverter::new();
        let histograms = converter.create_histograms(trees);
        self.il_size = converter.get_number_of_labels();

        debug!("{} distinct labels", self.il_size);

        return histograms;
    }

    /// Runs the candidate index once per dimension of the filter order, the first pass over all
    /// pairs and every later pass over the survivors of the previous one.
    pub fn retrieve_candidates(&mut self, histograms: &Histograms, distance_threshold: f64) -> Vec<(TreeId, TreeId)> {

        for dimension in Dimension::all() {
            assert_eq!(histograms.get(dimension).len(), histograms.len(), "{} histograms are not index-aligned", dimension);
        }

        let mut c_index = CandidateIndex::new();
        let mut candidates: Vec<(TreeId, TreeId)> = Vec::new();

        self.stage_candidates.clear();

        for (stage, dimension) in self.filter_order.iter().enumerate() {

            let collection = histograms.get(*dimension);
            assert_eq!(collection.dimension(), *dimension);

            let il_size = match dimension {
                Dimension::Label => self.il_size,
                _ => collection.domain_size(),
            };

            match stage {
                0 => c_index.lookup(collection, &mut candidates, il_size, distance_threshold),
                _ => c_index.lookup_within(collection, &mut candidates, il_size, distance_threshold),
            }

            debug!("after {} filter: {} candidates", dimension, candidates.len());
            self.stage_candidates.push((*dimension, candidates.len()));
        }

        // Copy the counters of all stages.
        self.pre_candidates = c_index.get_number_of_pre_candidates();
        self.il_lookups = c_index.get_number_of_il_lookups();

        return candidates;
    }

    pub fn verify_candidates(&mut self, trees: &[Node<L>], candidates: &[(TreeId, TreeId)], distance_threshold: f64) -> Vec<JoinResultElement> {

        let mut join_result: Vec<JoinResultElement> = Vec::new();

        let pairs: Box<dyn Iterator<Item = &(TreeId, TreeId)> + '_> = match self.show_progress {
            true => Box::new(tqdm!(candidates.iter())),
            false => Box::new(candidates.iter()),
        };

        // Verify each pair in the candidate set
        for (first, second) in pairs {
            let ted_value = self.verifier.verify(&trees[*first as usize], &trees[*second as usize], distance_threshold);

            if ted_value <= distance_threshold {
                join_result.push(JoinResultElement::new(*first, *second, ted_value));
            }

            self.sum_subproblem_counter += self.verifier.get_subproblem_count();
        }

        return join_result;
    }

    pub fn get_number_of_pre_candidates(&self) -> u64 {
        return self.pre_candidates;
    }

    pub fn get_number_of_il_lookups(&self) -> u64 {
        return self.il_lookups;
    }

    pub fn get_subproblem_count(&self) -> u64 {
        return self.sum_subproblem_counter;
    }

    /// Candidate count after each filter stage, in filter order.
    pub fn get_stage_candidates(&self) -> &[(Dimension, usize)] {
        return &self.stage_candidates;
    }

    /// Size of the final candidate set.
    pub fn get_number_of_candidates(&self) -> usize {
        return self.stage_candidates.last().map(|(_, n)| *n).unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::parser::BracketNotationParser;
    use crate::verification::ZhangShasha;
    use crate::cost_model::UnitCostModel;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn new_join() -> HistoJoin<String, ZhangShasha<UnitCostModel>> {
        return HistoJoin::new(ZhangShasha::unit_cost());
    }

    fn random_trees(seed: u64, n: usize, max_size: usize) -> Vec<Node<String>> {

        let mut rng = StdRng::seed_from_u64(seed);
        return (0..n)
            .map(|_| {
                let size = rng.gen_range(1..max_size);
                Node::random(&mut rng, size, &["a", "b", "c", "d"])
            })
            .collect();
    }

    /// Exact distance of every pair, `distances[j][i]` for `i < j`.
    fn all_distances(trees: &[Node<String>]) -> Vec<Vec<f64>> {

        let mut zs = ZhangShasha::unit_cost();
        return (0..trees.len())
            .map(|j| (0..j).map(|i| zs.verify(&trees[i], &trees[j], f64::MAX)).collect())
            .collect();
    }

    fn brute_force_join(distances: &[Vec<f64>], distance_threshold: f64) -> Vec<(TreeId, TreeId)> {

        let mut pairs = Vec::new();
        for (j, row) in distances.iter().enumerate() {
            for (i, distance) in row.iter().enumerate() {
                if *distance <= distance_threshold {
                    pairs.push((i as TreeId, j as TreeId));
                }
            }
        }
        pairs.sort_unstable();
        return pairs;
    }

    fn pairs_of(join_result: &[JoinResultElement]) -> Vec<(TreeId, TreeId)> {

        let mut pairs: Vec<_> = join_result.iter().map(|e| (e.tree_id_1, e.tree_id_2)).collect();
        pairs.sort_unstable();
        return pairs;
    }

    #[test]
    fn identical_single_node_trees() {

        init_logger();

        let trees: Vec<Node<String>> = (0..6).map(|_| Node::new("a".to_string())).collect();

        let mut join = new_join();
        let join_result = join.execute_join(&trees, 0.0);

        assert_eq!(join_result.len(), 15);
        assert_eq!(join.get_number_of_candidates(), join_result.len());
        for element in join_result.iter() {
            assert_approx_eq!(element.ted_value, 0.0);
        }
    }

    #[test]
    fn negative_threshold_gives_empty_result() {

        let trees = random_trees(1, 10, 6);

        let mut join = new_join();
        assert!(join.execute_join(&trees, -1.0).is_empty());
        assert_eq!(join.get_number_of_candidates(), 0);
        assert_eq!(join.get_subproblem_count(), 0);
    }

    #[test]
    fn fewer_than_two_trees() {

        let mut join = new_join();
        assert!(join.execute_join(&[], 3.0).is_empty());

        let trees = vec![Node::new("a".to_string())];
        assert!(join.execute_join(&trees, 3.0).is_empty());
    }

    #[test]
    fn lower_bounds_never_exceed_distance() {

        let trees = random_trees(17, 40, 10);
        let distances = all_distances(&trees);
        let histograms = HistogramConverter::new().create_histograms(&trees);

        for dimension in Dimension::all() {
            let collection = histograms.get(dimension);
            for (j, row) in distances.iter().enumerate() {
                for (i, distance) in row.iter().enumerate() {
                    let lower_bound = collection.get(i as TreeId).lower_bound(collection.get(j as TreeId));
                    assert!(lower_bound <= *distance,
                            "{} bound {} above distance {} for {} and {}",
                            dimension, lower_bound, distance, trees[i], trees[j]);
                }
            }
        }
    }

    #[test]
    fn join_matches_brute_force() {

        init_logger();

        let trees = random_trees(29, 45, 9);
        let distances = all_distances(&trees);

        for threshold in [0.0, 1.0, 2.0, 3.0, 5.0] {

            let mut join = new_join();
            let join_result = join.execute_join(&trees, threshold);

            assert_eq!(pairs_of(&join_result), brute_force_join(&distances, threshold));

            for element in join_result.iter() {
                let exact = distances[element.tree_id_2 as usize][element.tree_id_1 as usize];
                assert_approx_eq!(element.ted_value, exact);
            }
        }
    }

    #[test]
    fn stages_only_shrink_the_candidates() {

        let trees = random_trees(31, 60, 10);

        let mut join = new_join();
        let histograms = join.convert_trees_to_histograms(&trees);
        let candidates = join.retrieve_candidates(&histograms, 3.0);

        let stages = join.get_stage_candidates();
        assert_eq!(stages.len(), 3);
        for window in stages.windows(2) {
            assert!(window[1].1 <= window[0].1);
        }
        assert_eq!(stages[2].1, candidates.len());

        for dimension in Dimension::all() {
            let collection = histograms.get(dimension);
            let mut single = Vec::new();
            CandidateIndex::new().lookup(collection, &mut single, collection.domain_size(), 3.0);
            assert!(candidates.len() <= single.len());
        }

        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
        assert!(candidates.iter().all(|(i, j)| i < j));
    }

    #[test]
    fn repeated_runs_are_identical() {

        let trees = random_trees(37, 40, 10);

        let mut first = new_join();
        let first_result = first.execute_join(&trees, 2.0);

        let mut second = new_join();
        let second_result = second.execute_join(&trees, 2.0);

        assert_eq!(first_result, second_result);
        assert_eq!(first.get_number_of_pre_candidates(), second.get_number_of_pre_candidates());
        assert_eq!(first.get_number_of_il_lookups(), second.get_number_of_il_lookups());
        assert_eq!(first.get_subproblem_count(), second.get_subproblem_count());
    }

    #[test]
    fn counters_sum_over_all_stages() {

        let trees = random_trees(47, 50, 10);
        let threshold = 3.0;

        let mut join = new_join();
        join.execute_join(&trees, threshold);

        let mut converter = HistogramConverter::new();
        let histograms = converter.create_histograms(&trees);

        let mut candidates: Vec<(TreeId, TreeId)> = Vec::new();
        let mut pre_candidates: u64 = 0;
        let mut il_lookups: u64 = 0;

        for (stage, dimension) in Dimension::all().iter().enumerate() {

            let collection = histograms.get(*dimension);
            let il_size = match dimension {
                Dimension::Label => converter.get_number_of_labels(),
                _ => collection.domain_size(),
            };

            let mut c_index = CandidateIndex::new();
            match stage {
                0 => c_index.lookup(collection, &mut candidates, il_size, threshold),
                _ => c_index.lookup_within(collection, &mut candidates, il_size, threshold),
            }

            assert!(c_index.get_number_of_pre_candidates() > 0);
            assert!(c_index.get_number_of_il_lookups() > 0);
            pre_candidates += c_index.get_number_of_pre_candidates();
            il_lookups += c_index.get_number_of_il_lookups();
        }

        assert_eq!(join.get_number_of_pre_candidates(), pre_candidates);
        assert_eq!(join.get_number_of_il_lookups(), il_lookups);
        assert_eq!(join.get_number_of_candidates(), candidates.len());
    }

    #[test]
    fn larger_thresholds_keep_smaller_results() {

        let trees = random_trees(41, 40, 10);

        let mut previous: HashSet<(TreeId, TreeId)> = HashSet::new();
        for threshold in 0..6 {
            let join_result = new_join().execute_join(&trees, threshold as f64);
            let current: HashSet<(TreeId, TreeId)> = pairs_of(&join_result).into_iter().collect();
            assert!(previous.is_subset(&current));
            previous = current;
        }
    }

    #[test]
    fn filter_order_does_not_change_the_result() {

        let trees = random_trees(43, 40, 10);
        let expected = pairs_of(&new_join().execute_join(&trees, 2.0));

        let orders = vec![
            vec![Dimension::LeafDistance, Dimension::Degree, Dimension::Label],
            vec![Dimension::Degree],
            vec![Dimension::Label, Dimension::LeafDistance],
        ];

        for order in orders {
            let mut join = new_join().with_filter_order(order);
            assert_eq!(pairs_of(&join.execute_join(&trees, 2.0)), expected);
        }
    }

    #[test]
    #[should_panic]
    fn duplicated_filter_is_rejected() {
        new_join().with_filter_order(vec![Dimension::Label, Dimension::Label]);
    }

    #[test]
    fn reference_collection_sweep() {

        init_logger();

        let trees = BracketNotationParser::parse_collection("test_data/join_reference.bracket").unwrap();
        assert_eq!(trees.len(), 48);
        let distances = all_distances(&trees);

        // thresholds 1..=15, computed independently of this crate
        let results: [usize; 15] = [11, 20, 36, 48, 56, 68, 90, 124, 151, 199, 272, 351, 434, 486, 510];
        let candidates: [usize; 15] = [11, 41, 83, 126, 224, 360, 448, 501, 527, 536, 542, 547, 551, 552, 552];

        let mut result_sizes: Vec<usize> = Vec::new();

        for threshold in 1..16 {
            let mut join = new_join();
            let join_result = join.execute_join(&trees, threshold as f64);

            let expected = brute_force_join(&distances, threshold as f64);
            assert_eq!(pairs_of(&join_result), expected, "threshold {}", threshold);
            assert_eq!(join_result.len(), results[threshold - 1], "threshold {}", threshold);
            assert_eq!(join.get_number_of_candidates(), candidates[threshold - 1], "threshold {}", threshold);

            result_sizes.push(join_result.len());
        }

        for window in result_sizes.windows(2) {
            assert!(window[0] < window[1]);
        }

        // the two large families share no labels with the rest
        assert!(candidates[14] < trees.len() * (trees.len() - 1) / 2);
    }

    #[test]
    fn config_round_trip() {

        let mut config = JoinConfig::default();
        config.threshold = 4.0;
        config.output = Some("result.json".to_string());
        config.filter_order = vec![Dimension::Degree, Dimension::LeafDistance];

        let filename = std::env::temp_dir().join("ted_join_config_round_trip.yaml");
        config.to_file(&filename).unwrap();

        let read = JoinConfig::from_file(&filename).unwrap();
        assert_eq!(read, config);
    }

    #[test]
    fn config_rejects_duplicate_filters() {

        let yaml = "input: trees.bracket\noutput: null\nthreshold: 2.0\nfilter_order: [label, label]\nprogress: false\n";

        let filename = std::env::temp_dir().join("ted_join_config_duplicate.yaml");
        std::fs::write(&filename, yaml).unwrap();

        match JoinConfig::from_file(&filename) {
            Err(Error::Config(_)) => {},
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn write_result_as_json_and_yaml() {

        let join_result = vec![JoinResultElement::new(0, 3, 1.0), JoinResultElement::new(2, 5, 0.0)];

        let json = std::env::temp_dir().join("ted_join_result.json");
        write_join_result(&join_result, &json).unwrap();
        let read: Vec<JoinResultElement> = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(read, join_result);

        let yaml = std::env::temp_dir().join("ted_join_result.yaml");
        write_join_result(&join_result, &yaml).unwrap();
        let read: Vec<JoinResultElement> = serde_yaml::from_str(&std::fs::read_to_string(&yaml).unwrap()).unwrap();
        assert_eq!(read, join_result);
    }
}
