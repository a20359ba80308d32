//! Stratified resampling policy for building each round's population.

use std::collections::BTreeMap;

use rand::prelude::*;

use crate::types::Label;

/// Boundary pairs to request for a round.
///
/// Follows a geometric decay of the sample budget: half of
/// `budget * decay^round`, rounded down, but never below one pair.
pub fn pair_count_for_round(budget: usize, round: usize, decay: f64) -> usize {
    let scaled = (budget as f64) * decay.powi(round as i32) / 2.0;
    (scaled.floor() as usize).max(1)
}

/// Per-group draw size that spreads a budget over `groups` strata.
pub fn per_group_budget(budget: usize, groups: usize) -> usize {
    if groups == 0 {
        return 0;
    }
    (budget / groups).max(1)
}

/// Row indices grouped by label, keys ascending.
pub fn group_rows_by_label(labels: &[Label]) -> BTreeMap<Label, Vec<usize>> {
    let mut groups: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(row);
    }
    groups
}

/// Draw `per_group` rows with replacement from every non-empty group.
///
/// Groups are visited in key order and draws within a group are sequential,
/// so a seeded generator reproduces the sample exactly.
pub fn stratified_resample<K: Ord, R: Rng>(
    groups: &BTreeMap<K, Vec<usize>>,
    per_group: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut sample = Vec::new();
    for rows in groups.values() {
        if rows.is_empty() {
            continue;
        }
        for _ in 0..per_group {
            sample.push(rows[rng.random_range(0..rows.len())]);
        }
    }
    sample
}

/// The `count` identities with the most rows, larger groups first and ties
/// broken by name.
pub fn top_identity_groups(identities: &[String], count: usize) -> Vec<String> {
    let mut sizes: BTreeMap<&str, usize> = BTreeMap::new();
    for identity in identities {
        *sizes.entry(identity.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = sizes.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked.into_iter().take(count).map(|(name, _)| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pair_counts_decay_geometrically_to_a_floor() {
        let budget = 3000;
        let decay = 0.481;
        let mut previous = usize::MAX;
        for round in 2..12 {
            let count = pair_count_for_round(budget, round, decay);
            assert!(count <= previous, "pair counts must not grow across rounds");
            assert!(count >= 1, "pair count never drops below one");
            previous = count;
        }
        assert_eq!(pair_count_for_round(budget, 2, decay), 347);
    }

    #[test]
    fn per_group_budget_splits_and_floors() {
        assert_eq!(per_group_budget(3000, 2), 1500);
        assert_eq!(per_group_budget(10, 3), 3);
        assert_eq!(per_group_budget(1, 5), 1);
        assert_eq!(per_group_budget(100, 0), 0);
    }

    #[test]
    fn grouping_preserves_row_order_within_labels() {
        let groups = group_rows_by_label(&[1, 0, 1, -1, 0]);
        assert_eq!(groups[&-1], vec![3]);
        assert_eq!(groups[&0], vec![1, 4]);
        assert_eq!(groups[&1], vec![0, 2]);
    }

    #[test]
    fn resample_draws_per_group_with_replacement() {
        let mut groups = BTreeMap::new();
        groups.insert(0, vec![10, 11]);
        groups.insert(1, vec![20]);
        let mut rng = StdRng::seed_from_u64(42);

        let sample = stratified_resample(&groups, 4, &mut rng);
        assert_eq!(sample.len(), 8);
        assert!(sample[..4].iter().all(|&r| r == 10 || r == 11));
        assert!(sample[4..].iter().all(|&r| r == 20), "single-row group repeats its row");
    }

    #[test]
    fn resample_is_reproducible_for_a_seed() {
        let mut groups = BTreeMap::new();
        groups.insert('a', (0..10).collect::<Vec<_>>());
        groups.insert('b', (10..30).collect::<Vec<_>>());

        let mut first = StdRng::seed_from_u64(9);
        let mut second = StdRng::seed_from_u64(9);
        assert_eq!(
            stratified_resample(&groups, 6, &mut first),
            stratified_resample(&groups, 6, &mut second)
        );
    }

    #[test]
    fn empty_groups_are_skipped() {
        let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        groups.insert(0, vec![]);
        groups.insert(1, vec![5]);
        let mut rng = StdRng::seed_from_u64(1);
        let sample = stratified_resample(&groups, 3, &mut rng);
        assert_eq!(sample, vec![5, 5, 5]);
    }

    #[test]
    fn top_groups_rank_by_size_then_name() {
        let identities: Vec<String> =
            ["b", "a", "b", "c", "a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(top_identity_groups(&identities, 2), vec!["b", "a"]);

        let tied: Vec<String> = ["d", "c", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(top_identity_groups(&tied, 2), vec!["c", "d"]);
    }
}
