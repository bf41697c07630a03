//! Costs of the three edit operations, consumed by verification only.

pub trait CostModel<L> {

    fn ren(&self, from: &L, to: &L) -> f64;

    fn del(&self, label: &L) -> f64;

    fn ins(&self, label: &L) -> f64;
}

/// Every insertion and deletion costs 1, relabeling costs 1 unless the labels are equal.
///
/// The histogram lower bounds assume costs of at least this much per operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCostModel;

impl<L: PartialEq> CostModel<L> for UnitCostModel {

    fn ren(&self, from: &L, to: &L) -> f64 {
        match from == to {
            true => 0.0,
            false => 1.0,
        }
    }

    fn del(&self, _label: &L) -> f64 {
        1.0
    }

    fn ins(&self, _label: &L) -> f64 {
        1.0
    }
}
