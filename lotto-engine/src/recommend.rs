use std::cmp::Ordering;

use chrono::Datelike;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use lotto_db::models::{
    bucket_of, CombinationKind, NumberTrend, RecommendedCombination, Trend, BUCKETS, PICK_COUNT,
    POOL_SIZE,
};

use crate::config::AnalysisConfig;

/// Génère un seed déterministe basé sur la date du jour (YYYYMMDD).
pub fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    let y = today.year() as u64;
    let m = today.month() as u64;
    let d = today.day() as u64;
    y * 10_000 + m * 100 + d
}

fn trend_bonus(trend: Trend) -> f64 {
    match trend {
        Trend::Rising => 5.0,
        Trend::Stable => 3.0,
        Trend::Falling => 2.0,
    }
}

/// Score heuristique d'une combinaison, borné à [0, 100]. Sert à classer les
/// combinaisons entre elles, sans valeur prédictive.
pub fn score(numbers: &[u8], trends: &[NumberTrend]) -> f64 {
    let mut total = 0.0;
    for &n in numbers {
        if let Some(t) = trends.iter().find(|t| t.number == n) {
            total += t.frequency * 10.0;
            total += trend_bonus(t.trend);
            total += t.recent_appearances() as f64 * 2.0;
        }
    }

    let mut buckets = [false; BUCKETS.len()];
    for &n in numbers {
        if let Some(b) = bucket_of(n) {
            buckets[b] = true;
        }
    }
    total += buckets.iter().filter(|&&hit| hit).count() as f64 * 5.0;

    total.clamp(0.0, 100.0)
}

/// Tri par écart, à égalité le plus petit numéro d'abord.
fn by_deviation(trends: &[NumberTrend], descending: bool) -> Vec<&NumberTrend> {
    let mut sorted: Vec<&NumberTrend> = trends.iter().collect();
    sorted.sort_by(|a, b| {
        let ord = a
            .deviation_pct
            .partial_cmp(&b.deviation_pct)
            .unwrap_or(Ordering::Equal);
        let ord = if descending { ord.reverse() } else { ord };
        ord.then(a.number.cmp(&b.number))
    });
    sorted
}

fn top_numbers(trends: &[NumberTrend], descending: bool, count: usize) -> Vec<u8> {
    by_deviation(trends, descending)
        .into_iter()
        .take(count)
        .map(|t| t.number)
        .collect()
}

/// Tirage uniforme sans remise de `count` numéros du vivier.
fn sample(pool: &[u8], count: usize, rng: &mut StdRng) -> Option<Vec<u8>> {
    if pool.len() < count {
        return None;
    }
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    Some(shuffled)
}

fn pick_hot(trends: &[NumberTrend], config: &AnalysisConfig, rng: &mut StdRng) -> Option<Vec<u8>> {
    sample(&top_numbers(trends, true, config.hot_pool), PICK_COUNT, rng)
}

fn pick_cold(trends: &[NumberTrend], config: &AnalysisConfig, rng: &mut StdRng) -> Option<Vec<u8>> {
    sample(&top_numbers(trends, false, config.cold_pool), PICK_COUNT, rng)
}

fn pick_balanced(
    trends: &[NumberTrend],
    config: &AnalysisConfig,
    rng: &mut StdRng,
) -> Option<Vec<u8>> {
    let half = PICK_COUNT / 2;
    let mut picked = sample(&top_numbers(trends, true, config.balanced_pool), half, rng)?;
    let cold: Vec<u8> = top_numbers(trends, false, config.balanced_pool)
        .into_iter()
        .filter(|n| !picked.contains(n))
        .collect();
    picked.extend(sample(&cold, PICK_COUNT - half, rng)?);
    Some(picked)
}

fn pick_rising(
    trends: &[NumberTrend],
    config: &AnalysisConfig,
    rng: &mut StdRng,
) -> Option<Vec<u8>> {
    let rising: Vec<u8> = by_deviation(trends, true)
        .into_iter()
        .filter(|t| t.trend == Trend::Rising)
        .take(config.rising_pool)
        .map(|t| t.number)
        .collect();
    sample(&rising, PICK_COUNT, rng)
}

/// Un numéro par tranche, le plus proche de la fréquence attendue, complété au hasard.
fn pick_statistical(trends: &[NumberTrend], rng: &mut StdRng) -> Vec<u8> {
    let mut picked: Vec<u8> = BUCKETS
        .iter()
        .filter_map(|&(lo, hi)| {
            trends
                .iter()
                .filter(|t| t.number >= lo && t.number <= hi)
                .min_by(|a, b| {
                    a.deviation_pct
                        .abs()
                        .partial_cmp(&b.deviation_pct.abs())
                        .unwrap_or(Ordering::Equal)
                        .then(a.number.cmp(&b.number))
                })
                .map(|t| t.number)
        })
        .collect();

    while picked.len() < PICK_COUNT {
        let candidate = rng.random_range(1..=POOL_SIZE as u8);
        if !picked.contains(&candidate) {
            picked.push(candidate);
        }
    }
    picked
}

fn rationale(kind: CombinationKind) -> &'static str {
    match kind {
        CombinationKind::Hot => "Numéros sortis le plus souvent sur la période analysée",
        CombinationKind::Cold => "Numéros sortis le moins souvent sur la période (pari inverse)",
        CombinationKind::Balanced => "Mélange de trois numéros chauds et trois numéros froids",
        CombinationKind::TrendRising => "Numéros en hausse sur les tirages récents",
        CombinationKind::Statistical => "Un numéro par tranche, au plus près de la fréquence attendue",
    }
}

fn strategy_seed(seed: u64, kind: CombinationKind) -> u64 {
    seed.wrapping_mul(31).wrapping_add(kind as u64 + 1)
}

fn build(
    kind: CombinationKind,
    trends: &[NumberTrend],
    config: &AnalysisConfig,
    seed: u64,
) -> Option<RecommendedCombination> {
    let mut rng = StdRng::seed_from_u64(strategy_seed(seed, kind));
    let picked = match kind {
        CombinationKind::Hot => pick_hot(trends, config, &mut rng),
        CombinationKind::Cold => pick_cold(trends, config, &mut rng),
        CombinationKind::Balanced => pick_balanced(trends, config, &mut rng),
        CombinationKind::TrendRising => pick_rising(trends, config, &mut rng),
        CombinationKind::Statistical => Some(pick_statistical(trends, &mut rng)),
    };
    let Some(picked) = picked else {
        tracing::debug!(%kind, "stratégie ignorée : pas assez de numéros éligibles");
        return None;
    };

    let mut numbers: [u8; 6] = picked.try_into().ok()?;
    numbers.sort();

    Some(RecommendedCombination {
        numbers,
        kind,
        score: score(&numbers, trends),
        rationale: rationale(kind).to_string(),
    })
}

/// Combinaisons recommandées avec la configuration par défaut.
pub fn recommend(trends: &[NumberTrend], seed: u64) -> Vec<RecommendedCombination> {
    recommend_with(trends, &AnalysisConfig::default(), seed)
}

/// Une combinaison par stratégie, calculées en parallèle, renvoyées dans l'ordre
/// des stratégies. Chaque stratégie dérive son propre générateur de `seed`.
pub fn recommend_with(
    trends: &[NumberTrend],
    config: &AnalysisConfig,
    seed: u64,
) -> Vec<RecommendedCombination> {
    let kinds: &[CombinationKind] = &CombinationKind::ALL;
    let mut combinations: Vec<RecommendedCombination> = kinds
        .par_iter()
        .filter_map(|&kind| build(kind, trends, config, seed))
        .collect();
    combinations.sort_by_key(|c| c.kind);
    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::analyze;
    use lotto_db::models::make_test_draws;

    fn trend(number: u8, deviation_pct: f64, trend: Trend) -> NumberTrend {
        NumberTrend {
            number,
            appearances: 0,
            frequency: 0.0,
            expected_frequency: 0.0,
            deviation_pct,
            trend,
            recent_window: vec![false; 10],
        }
    }

    /// Écart croissant avec le numéro ; les numéros pairs sont en hausse.
    fn graded_trends() -> Vec<NumberTrend> {
        (1..=45u8)
            .map(|n| {
                let direction = if n % 2 == 0 { Trend::Rising } else { Trend::Falling };
                trend(n, n as f64 - 23.0, direction)
            })
            .collect()
    }

    fn assert_valid(combo: &RecommendedCombination) {
        assert!(combo.numbers.windows(2).all(|w| w[0] < w[1]), "{:?}", combo.numbers);
        assert!(combo.numbers.iter().all(|&n| (1..=45).contains(&n)));
        assert!(combo.score >= 0.0 && combo.score <= 100.0);
    }

    #[test]
    fn test_date_seed_format() {
        let seed = date_seed();
        assert_eq!(seed.to_string().len(), 8, "seed devrait avoir 8 chiffres: {seed}");
    }

    #[test]
    fn test_all_strategies_produced() {
        let combos = recommend(&graded_trends(), 42);
        let kinds: Vec<CombinationKind> = combos.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, CombinationKind::ALL.to_vec());
        for combo in &combos {
            assert_valid(combo);
        }
    }

    #[test]
    fn test_hot_and_cold_pools() {
        let combos = recommend(&graded_trends(), 7);
        let hot = &combos[0];
        assert!(hot.numbers.iter().all(|&n| n >= 31), "{:?}", hot.numbers);
        let cold = &combos[1];
        assert!(cold.numbers.iter().all(|&n| n <= 15), "{:?}", cold.numbers);
    }

    #[test]
    fn test_cold_pool_independent_of_hot_pool() {
        let config = AnalysisConfig {
            hot_pool: 6,
            cold_pool: 8,
            ..AnalysisConfig::default()
        };
        let combos = recommend_with(&graded_trends(), &config, 13);
        assert!(combos[0].numbers.iter().all(|&n| n >= 40), "{:?}", combos[0].numbers);
        assert!(combos[1].numbers.iter().all(|&n| n <= 8), "{:?}", combos[1].numbers);

        let narrow_cold = AnalysisConfig {
            cold_pool: 5,
            ..AnalysisConfig::default()
        };
        let combos = recommend_with(&graded_trends(), &narrow_cold, 13);
        assert!(combos.iter().any(|c| c.kind == CombinationKind::Hot));
        assert!(combos.iter().all(|c| c.kind != CombinationKind::Cold));
    }

    #[test]
    fn test_balanced_halves() {
        let combos = recommend(&graded_trends(), 11);
        let balanced = combos.iter().find(|c| c.kind == CombinationKind::Balanced).unwrap();
        let high = balanced.numbers.iter().filter(|&&n| n >= 36).count();
        let low = balanced.numbers.iter().filter(|&&n| n <= 10).count();
        assert_eq!((high, low), (3, 3));
    }

    #[test]
    fn test_rising_prefers_top_deviation() {
        let combos = recommend(&graded_trends(), 3);
        let rising = combos.iter().find(|c| c.kind == CombinationKind::TrendRising).unwrap();
        // 10 numéros pairs les plus hauts : 26..=44
        assert!(rising.numbers.iter().all(|&n| n % 2 == 0 && n >= 26), "{:?}", rising.numbers);
    }

    #[test]
    fn test_rising_skipped_without_enough_numbers() {
        let trends: Vec<NumberTrend> = (1..=45u8)
            .map(|n| {
                let direction = if n <= 5 { Trend::Rising } else { Trend::Stable };
                trend(n, 0.0, direction)
            })
            .collect();
        let combos = recommend(&trends, 1);
        assert!(combos.iter().all(|c| c.kind != CombinationKind::TrendRising));
        assert_eq!(combos.len(), 4);
    }

    #[test]
    fn test_statistical_one_per_bucket() {
        let trends: Vec<NumberTrend> = (1..=45u8)
            .map(|n| {
                let deviation = if matches!(n, 4 | 15 | 27 | 38 | 42) { 0.5 } else { 30.0 };
                trend(n, deviation, Trend::Stable)
            })
            .collect();
        let combos = recommend(&trends, 5);
        let stat = combos.iter().find(|c| c.kind == CombinationKind::Statistical).unwrap();
        for n in [4, 15, 27, 38, 42] {
            assert!(stat.numbers.contains(&n), "{:?}", stat.numbers);
        }
        assert_valid(stat);
    }

    #[test]
    fn test_statistical_tie_takes_lowest_number() {
        let trends: Vec<NumberTrend> = (1..=45u8).map(|n| trend(n, 0.0, Trend::Stable)).collect();
        let combos = recommend(&trends, 9);
        let stat = combos.iter().find(|c| c.kind == CombinationKind::Statistical).unwrap();
        for n in [1, 11, 21, 31, 41] {
            assert!(stat.numbers.contains(&n), "{:?}", stat.numbers);
        }
    }

    #[test]
    fn test_empty_trends_only_statistical() {
        let combos = recommend(&[], 1);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].kind, CombinationKind::Statistical);
        assert_valid(&combos[0]);
    }

    #[test]
    fn test_seed_determinism() {
        let (trends, _) = analyze(&make_test_draws(80), 10);
        let a = recommend(&trends, 123);
        let b = recommend(&trends, 123);
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_real_analysis_always_valid() {
        let (trends, _) = analyze(&make_test_draws(120), 10);
        for seed in 0..20 {
            for combo in recommend(&trends, seed) {
                assert_valid(&combo);
            }
        }
    }

    #[test]
    fn test_score_components() {
        let mut trends = graded_trends();
        for t in trends.iter_mut() {
            t.frequency = 0.2;
            t.recent_window = vec![true, false, false, false, false, false, false, false, false, true];
        }
        // 2 pairs (hausse) + 4 impairs (baisse), une tranche chacun sauf 41-45
        let numbers = [2, 4, 11, 21, 31, 33];
        let expected = 6.0 * (0.2 * 10.0) + 2.0 * 5.0 + 4.0 * 2.0 + 6.0 * 2.0 * 2.0 + 4.0 * 5.0;
        assert!((score(&numbers, &trends) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_capped() {
        let trends: Vec<NumberTrend> = (1..=45u8)
            .map(|n| {
                let mut t = trend(n, 0.0, Trend::Rising);
                t.frequency = 1.0;
                t.recent_window = vec![true; 10];
                t
            })
            .collect();
        assert_eq!(score(&[1, 11, 21, 31, 41, 45], &trends), 100.0);
    }
}
