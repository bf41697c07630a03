//! Exact tree edit distance used to verify join candidates.
//!
//! The join only relies on the `Verification` contract: `verify` returns the exact distance and
//! `get_subproblem_count` reports the work of the last call.

use crate::cost_model::{CostModel, UnitCostModel};
use crate::node::Node;

pub trait Verification<L> {

    /// Exact edit distance between `t1` and `t2`. Implementations may use `distance_threshold`
    /// to prune work, but must return the exact value whenever it is within the threshold.
    fn verify(&mut self, t1: &Node<L>, t2: &Node<L>, distance_threshold: f64) -> f64;

    /// Number of subproblems computed by the last `verify` call.
    fn get_subproblem_count(&self) -> u64;
}

/// Nodes in postorder with their leftmost leaf descendants and the keyroots of the tree.
struct PostorderIndex<'a, L> {
    labels: Vec<&'a L>,
    lld: Vec<usize>,
    keyroots: Vec<usize>,
}

impl<'a, L> PostorderIndex<'a, L> {

    fn new(root: &'a Node<L>) -> Self {

        let size = root.get_tree_size();
        let mut labels: Vec<&'a L> = Vec::with_capacity(size);
        let mut lld: Vec<usize> = Vec::with_capacity(size);

        fn walk<'a, L>(node: &'a Node<L>, labels: &mut Vec<&'a L>, lld: &mut Vec<usize>) -> usize {

            let mut leftmost: Option<usize> = None;
            for child in node.children() {
                let child_index = walk(child, labels, lld);
                if leftmost.is_none() {
                    leftmost = Some(lld[child_index]);
                }
            }

            let index = labels.len();
            labels.push(node.label());
            lld.push(leftmost.unwrap_or(index));
            return index;
        }

        walk(root, &mut labels, &mut lld);

        //a keyroot is the highest node for its leftmost leaf
        let mut highest: Vec<Option<usize>> = vec![None; size];
        for (i, leaf) in lld.iter().enumerate() {
            highest[*leaf] = Some(i);
        }
        let mut keyroots: Vec<usize> = highest.into_iter().flatten().collect();
        keyroots.sort_unstable();

        return Self {
            labels,
            lld,
            keyroots,
        }
    }

    fn len(&self) -> usize {
        return self.labels.len();
    }
}

/// Zhang and Shasha's keyroot decomposition, `O(n^2)` memory and at most `O(n^4)` time.
#[derive(Debug, Clone, Default)]
pub struct ZhangShasha<C> {
    cost_model: C,
    subproblems: u64,
}

impl<C> ZhangShasha<C> {

    pub fn new(cost_model: C) -> Self {

        return Self {
            cost_model,
            subproblems: 0,
        }
    }

    /// Number of subproblems computed by the last distance computation.
    pub fn get_subproblem_count(&self) -> u64 {
        return self.subproblems;
    }

    fn forest_distance<L>(&mut self, t1: &PostorderIndex<L>, t2: &PostorderIndex<L>, i: usize, j: usize, td: &mut [f64])
    where C: CostModel<L> {

        let n2 = t2.len();
        let l1 = t1.lld[i];
        let l2 = t2.lld[j];

        //row x stands for the forest of nodes l1..=x+l1-1, row 0 for the empty forest
        let rows = i - l1 + 2;
        let cols = j - l2 + 2;
        let mut fd = vec![0.0f64; rows * cols];
        let at = |x: usize, y: usize| -> usize { x * cols + y };

        for x in 1..rows {
            fd[at(x, 0)] = fd[at(x - 1, 0)] + self.cost_model.del(t1.labels[x + l1 - 1]);
        }
        for y in 1..cols {
            fd[at(0, y)] = fd[at(0, y - 1)] + self.cost_model.ins(t2.labels[y + l2 - 1]);
        }

        for x in 1..rows {
            let node1 = x + l1 - 1;
            for y in 1..cols {
                let node2 = y + l2 - 1;
                self.subproblems += 1;

                let delete = fd[at(x - 1, y)] + self.cost_model.del(t1.labels[node1]);
                let insert = fd[at(x, y - 1)] + self.cost_model.ins(t2.labels[node2]);

                match t1.lld[node1] == l1 && t2.lld[node2] == l2 {
                    true => {
                        let rename = fd[at(x - 1, y - 1)] + self.cost_model.ren(t1.labels[node1], t2.labels[node2]);
                        let value = delete.min(insert).min(rename);
                        fd[at(x, y)] = value;
                        td[node1 * n2 + node2] = value;
                    },
                    false => {
                        let p = t1.lld[node1] - l1;
                        let q = t2.lld[node2] - l2;
                        let subtree = fd[at(p, q)] + td[node1 * n2 + node2];
                        fd[at(x, y)] = delete.min(insert).min(subtree);
                    },
                }
            }
        }
    }
}

impl ZhangShasha<UnitCostModel> {

    pub fn unit_cost() -> Self {
        return Self::new(UnitCostModel);
    }
}

impl<L, C: CostModel<L>> Verification<L> for ZhangShasha<C> {

    fn verify(&mut self, t1: &Node<L>, t2: &Node<L>, _distance_threshold: f64) -> f64 {

        self.subproblems = 0;

        let index1 = PostorderIndex::new(t1);
        let index2 = PostorderIndex::new(t2);

        let n1 = index1.len();
        let n2 = index2.len();
        let mut td = vec![0.0f64; n1 * n2];

        for i in index1.keyroots.iter() {
            for j in index2.keyroots.iter() {
                self.forest_distance(&index1, &index2, *i, *j, &mut td);
            }
        }

        return td[(n1 - 1) * n2 + (n2 - 1)];
    }

    fn get_subproblem_count(&self) -> u64 {
        return ZhangShasha::<C>::get_subproblem_count(self);
    }
}
