//! 匹配器性质测试 (固定种子随机输入)

use line_recon::models::{MatchMapping, SourceLine, TargetLine};
use line_recon::service::{auto_match, compute_initial_matches, repair_after_swap, MatchPolicy};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

const AMOUNTS: [&str; 7] = ["10", "10.00", "25.5", "50", "100", "0.1", "oops"];

fn generate_lines(rng: &mut ChaCha8Rng) -> (Vec<SourceLine>, Vec<TargetLine>) {
    let source_count = rng.gen_range(0..12);
    let target_count = rng.gen_range(0..12);

    let sources = (0..source_count)
        .map(|n| SourceLine::new(n as i64 + 1, *AMOUNTS.choose(rng).unwrap()))
        .collect();
    let targets = (0..target_count)
        .map(|n| TargetLine::new(format!("T{n}"), *AMOUNTS.choose(rng).unwrap()))
        .collect();
    (sources, targets)
}

fn assert_injective(mapping: &MatchMapping) {
    let mut seen = HashSet::new();
    for (_, id) in mapping.iter() {
        assert!(seen.insert(id.to_string()), "target {id} mapped twice");
    }
}

fn assert_amounts_equal(mapping: &MatchMapping, sources: &[SourceLine], targets: &[TargetLine]) {
    for (line_num, id) in mapping.iter() {
        let source = sources.iter().find(|s| s.line_num == line_num).unwrap();
        let target = targets.iter().find(|t| t.id == id).unwrap();
        assert_eq!(source.line_total.value(), target.line_extension_amount.value());
        assert!(source.line_total.is_parsed());
    }
}

#[test]
fn initial_matches_are_injective_exact_and_idempotent() {
    let policy = MatchPolicy::default();
    for seed in 0..500 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (sources, targets) = generate_lines(&mut rng);

        let first = compute_initial_matches(&sources, &targets, &policy);
        let second = compute_initial_matches(&sources, &targets, &policy);

        assert_injective(&first);
        assert_amounts_equal(&first, &sources, &targets);
        assert_eq!(first, second, "seed {seed}");
        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>(),
            "seed {seed}"
        );
    }
}

#[test]
fn auto_match_is_a_permutation_with_aligned_pairs() {
    let policy = MatchPolicy::default();
    for seed in 0..500 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (sources, targets) = generate_lines(&mut rng);

        let result = auto_match(&sources, &targets, &policy);
        assert_injective(&result.mapping);
        assert_amounts_equal(&result.mapping, &sources, &result.targets);

        let mut before: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
        let mut after: Vec<&str> = result.targets.iter().map(|t| t.id.as_str()).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after, "seed {seed}");

        // 有足够的行填补空位时，配对位于相同位置
        if targets.len() >= sources.len() {
            for (idx, source) in sources.iter().enumerate() {
                if let Some(id) = result.mapping.target_for(source.line_num) {
                    assert_eq!(result.targets[idx].id, id, "seed {seed}");
                }
            }
        }
    }
}

#[test]
fn repair_only_touches_swapped_positions() {
    let policy = MatchPolicy::default();
    for seed in 0..500 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (sources, mut targets) = generate_lines(&mut rng);
        if targets.len() < 2 {
            continue;
        }

        let before = compute_initial_matches(&sources, &targets, &policy);
        let i = rng.gen_range(0..targets.len());
        let j = rng.gen_range(0..targets.len());
        targets.swap(i, j);

        let after = repair_after_swap(&sources, &targets, &before, [i, j], &policy);
        assert_injective(&after);

        let touched: Vec<i64> = [i, j]
            .iter()
            .filter_map(|&pos| sources.get(pos))
            .map(|s| s.line_num)
            .collect();
        for source in &sources {
            if !touched.contains(&source.line_num) {
                assert_eq!(
                    before.target_for(source.line_num),
                    after.target_for(source.line_num),
                    "seed {seed}"
                );
            }
        }
        for line_num in &touched {
            if let Some(id) = after.target_for(*line_num) {
                let pos = sources.iter().position(|s| s.line_num == *line_num).unwrap();
                assert_eq!(targets[pos].id, id, "seed {seed}");
            }
        }
    }
}
