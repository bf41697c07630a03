//! Tree similarity join with histogram filters.
//!
//! Finds every pair of trees in a collection whose tree edit distance is at most a threshold.
//! Computing the edit distance of all pairs is far too expensive for large collections, so the
//! join first prunes the pair space with cheap lower bounds derived from label, degree and
//! leaf-distance histograms (after Kailing et al.), using inverted lists so that trees sharing
//! nothing are never compared. Only the surviving candidates are verified with an exact edit
//! distance algorithm.
//!
//! ```no_run
//! use ted_join::join::HistoJoin;
//! use ted_join::parser::BracketNotationParser;
//! use ted_join::verification::ZhangShasha;
//!
//! let trees = BracketNotationParser::parse_collection("trees.bracket").unwrap();
//! let mut join = HistoJoin::new(ZhangShasha::unit_cost());
//! let result = join.execute_join(&trees, 2.0);
//! println!("{} pairs, {} candidates", result.len(), join.get_number_of_candidates());
//! ```
//!
//! TODO
//! - [x] label, degree and leaf distance filters over inverted lists
//! - [x] Zhang-Shasha verification
//! - [ ] verify candidates in parallel
//!
pub mod error;
pub mod node;
pub mod parser;
pub mod cost_model;
pub mod histogram;
pub mod converter;
pub mod candidate_index;
pub mod verification;
pub mod join;
