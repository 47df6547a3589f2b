use std::collections::BTreeMap;

use serde::Serialize;

use lotto_db::models::{bucket_of, HistoricalDraw, BUCKETS, POOL_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSummary {
    /// Nombre de numéros impairs par tirage -> part des tirages (%).
    pub odd_distribution: BTreeMap<usize, f64>,
    pub most_common_odd_count: usize,
    /// Nombre moyen de numéros par tranche (1-10, ..., 41-45).
    pub bucket_averages: [f64; 5],
    pub average_sum: f64,
    pub sum_range: (u32, u32),
    pub average_consecutive: f64,
    pub most_common_consecutive: usize,
    pub average_gap: f64,
    pub most_common_gap: u8,
}

impl Default for PatternSummary {
    fn default() -> Self {
        Self {
            odd_distribution: BTreeMap::new(),
            most_common_odd_count: 3,
            bucket_averages: [0.0; 5],
            average_sum: 0.0,
            sum_range: (100, 150),
            average_consecutive: 0.0,
            most_common_consecutive: 0,
            average_gap: 0.0,
            most_common_gap: 7,
        }
    }
}

/// Valeur la plus fréquente ; à égalité, la plus petite.
fn mode<K: Ord + Copy>(counts: &BTreeMap<K, u32>) -> Option<K> {
    let mut best: Option<(K, u32)> = None;
    for (&key, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

pub fn analyze_patterns(draws: &[HistoricalDraw]) -> PatternSummary {
    if draws.is_empty() {
        return PatternSummary::default();
    }
    let total = draws.len() as f64;

    let mut odd_counts: BTreeMap<usize, u32> = BTreeMap::new();
    let mut bucket_totals = [0u32; 5];
    let mut sum_total = 0u32;
    let mut consecutive_counts: BTreeMap<usize, u32> = BTreeMap::new();
    let mut consecutive_total = 0usize;
    let mut gap_counts: BTreeMap<u8, u32> = BTreeMap::new();
    let mut gap_total = 0u32;
    let mut gap_n = 0u32;

    for draw in draws {
        let sorted = draw.sorted_numbers();

        let odd = sorted.iter().filter(|&&n| n % 2 == 1).count();
        *odd_counts.entry(odd).or_insert(0) += 1;

        for &n in &sorted {
            if let Some(bucket) = bucket_of(n) {
                bucket_totals[bucket] += 1;
            }
        }

        sum_total += sorted.iter().map(|&n| n as u32).sum::<u32>();

        let mut consecutive = 0usize;
        for pair in sorted.windows(2) {
            let gap = pair[1] - pair[0];
            if gap == 1 {
                consecutive += 1;
            }
            *gap_counts.entry(gap).or_insert(0) += 1;
            gap_total += gap as u32;
            gap_n += 1;
        }
        *consecutive_counts.entry(consecutive).or_insert(0) += 1;
        consecutive_total += consecutive;
    }

    let average_sum = sum_total as f64 / total;
    let avg = average_sum as u32;

    let mut bucket_averages = [0.0; 5];
    for (avg_slot, &count) in bucket_averages.iter_mut().zip(bucket_totals.iter()) {
        *avg_slot = count as f64 / total;
    }

    PatternSummary {
        odd_distribution: odd_counts
            .iter()
            .map(|(&odd, &count)| (odd, count as f64 / total * 100.0))
            .collect(),
        most_common_odd_count: mode(&odd_counts).unwrap_or(3),
        bucket_averages,
        average_sum,
        sum_range: (avg.saturating_sub(20), avg + 20),
        average_consecutive: consecutive_total as f64 / total,
        most_common_consecutive: mode(&consecutive_counts).unwrap_or(0),
        average_gap: if gap_n > 0 { gap_total as f64 / gap_n as f64 } else { 0.0 },
        most_common_gap: mode(&gap_counts).unwrap_or(7),
    }
}

/// Numéros chauds et froids sur les `recent` derniers tirages.
///
/// Chauds : les 10 plus sortis. Froids : les 10 plus petits numéros hors des 35
/// plus sortis (un numéro jamais sorti est toujours froid).
pub fn hot_cold_numbers(draws: &[HistoricalDraw], recent: usize) -> (Vec<u8>, Vec<u8>) {
    let mut chronological: Vec<&HistoricalDraw> = draws.iter().collect();
    chronological.sort_by_key(|d| d.round);
    let window = &chronological[chronological.len().saturating_sub(recent)..];

    let mut counts = [0u32; POOL_SIZE + 1];
    for draw in window {
        for &n in &draw.numbers {
            if let Some(count) = counts.get_mut(n as usize) {
                *count += 1;
            }
        }
    }

    let mut ranked: Vec<u8> = (1..=POOL_SIZE as u8)
        .filter(|&n| counts[n as usize] > 0)
        .collect();
    ranked.sort_by(|&a, &b| counts[b as usize].cmp(&counts[a as usize]).then(a.cmp(&b)));

    let hot: Vec<u8> = ranked.iter().take(10).copied().collect();
    let frequent: Vec<u8> = ranked.iter().take(35).copied().collect();
    let cold: Vec<u8> = (1..=POOL_SIZE as u8)
        .filter(|n| !frequent.contains(n))
        .take(10)
        .collect();

    (hot, cold)
}

/// Libellés des tranches, pour l'affichage.
pub fn bucket_labels() -> Vec<String> {
    BUCKETS
        .iter()
        .map(|(lo, hi)| format!("{}-{}", lo, hi))
        .collect()
}
