//! Dense ranking shared by the metric engine and the composite aggregator.

use std::cmp::Ordering;

/// Which end of the value range ranks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Highest value gets rank 1
    Descending,
    /// Lowest value gets rank 1
    Ascending,
}

/// Whether two values are equal up to machine precision.
pub fn same_value(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= f64::EPSILON * scale
}

/// Assign dense ranks to `entries`.
///
/// Equal values share a rank and the next distinct value gets the following
/// integer, so ranks have no gaps. `None` ranks below every present value and
/// all `None`s share one rank. Output is ordered by rank, then key.
pub fn dense_rank<K: Ord>(mut entries: Vec<(K, Option<f64>)>, order: RankOrder) -> Vec<(K, u32)> {
    entries.sort_by(|(ka, a), (kb, b)| compare(*a, *b, order).then_with(|| ka.cmp(kb)));

    let mut ranked = Vec::with_capacity(entries.len());
    let mut rank = 0u32;
    let mut last: Option<Option<f64>> = None;

    for (key, value) in entries {
        let starts_group = match (last, value) {
            (None, _) => true,
            (Some(Some(prev)), Some(v)) => !same_value(prev, v),
            (Some(None), None) => false,
            (Some(_), _) => true,
        };
        if starts_group {
            rank += 1;
        }
        last = Some(value);
        ranked.push((key, rank));
    }

    ranked
}

fn compare(a: Option<f64>, b: Option<f64>, order: RankOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.total_cmp(&b);
            match order {
                RankOrder::Ascending => ord,
                RankOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
