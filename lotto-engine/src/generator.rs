use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use lotto_db::models::{bucket_of, HistoricalDraw, BUCKETS, PICK_COUNT, POOL_SIZE};

use crate::conditional::ConstraintSet;
use crate::config::AnalysisConfig;
use crate::error::ConstraintError;
use crate::patterns::{analyze_patterns, hot_cold_numbers};

/// Nombre de tirages essayés avant de renoncer aux filtres.
pub const MAX_ATTEMPTS: usize = 1000;

/// Vivier des numéros chauds pour la génération optimisée.
const OPTIMIZED_HOT_POOL: usize = 15;

/// Filtres de la génération aléatoire. Les numéros imposés et exclus sont toujours
/// respectés ; les autres filtres peuvent être abandonnés après [`MAX_ATTEMPTS`] essais.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorFilters {
    pub constraints: ConstraintSet,
    /// Nombre de numéros impairs accepté, bornes incluses.
    pub odd_range: Option<(usize, usize)>,
    /// Somme des six numéros acceptée, bornes incluses.
    pub sum_range: Option<(u32, u32)>,
    /// Plus longue suite de numéros consécutifs, comptée en écarts de 1
    /// (`7, 8, 9` compte pour 2).
    pub max_consecutive: Option<usize>,
    /// Répartir les numéros libres sur les tranches à tour de rôle.
    pub bucket_balance: bool,
}

impl GeneratorFilters {
    pub fn accepts(&self, numbers: &[u8; 6]) -> bool {
        if let Some((min, max)) = self.odd_range {
            let odd = numbers.iter().filter(|&&n| n % 2 == 1).count();
            if odd < min || odd > max {
                return false;
            }
        }
        if let Some((min, max)) = self.sum_range {
            let sum: u32 = numbers.iter().map(|&n| n as u32).sum();
            if sum < min || sum > max {
                return false;
            }
        }
        if let Some(max) = self.max_consecutive {
            if longest_consecutive_run(numbers) > max {
                return false;
            }
        }
        true
    }
}

pub fn longest_consecutive_run(numbers: &[u8; 6]) -> usize {
    let mut sorted = *numbers;
    sorted.sort();
    let mut longest = 0;
    let mut current = 0;
    for pair in sorted.windows(2) {
        if pair[1] == pair[0] + 1 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedNumbers {
    pub numbers: [u8; 6],
    pub attempts: usize,
    /// Faux si les filtres ont été abandonnés au profit d'un tirage simple.
    pub filtered: bool,
}

fn assemble(locked: &[u8], fill: &[u8]) -> [u8; 6] {
    let mut numbers = [0u8; 6];
    for (slot, &n) in numbers.iter_mut().zip(locked.iter().chain(fill.iter())) {
        *slot = n;
    }
    numbers.sort();
    numbers
}

fn pick_uniform(available: &[u8], count: usize, rng: &mut StdRng) -> Vec<u8> {
    let mut shuffled = available.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled
}

/// Une tranche après l'autre ; une tranche épuisée cède sa place à tout le vivier.
fn pick_by_bucket(available: &[u8], count: usize, rng: &mut StdRng) -> Vec<u8> {
    let mut picked: Vec<u8> = Vec::with_capacity(count);
    for i in 0..count {
        let bucket = i % BUCKETS.len();
        let mut candidates: Vec<u8> = available
            .iter()
            .copied()
            .filter(|&n| bucket_of(n) == Some(bucket) && !picked.contains(&n))
            .collect();
        if candidates.is_empty() {
            candidates = available
                .iter()
                .copied()
                .filter(|n| !picked.contains(n))
                .collect();
        }
        if candidates.is_empty() {
            break;
        }
        picked.push(candidates[rng.random_range(0..candidates.len())]);
    }
    picked
}

/// Grille aléatoire respectant les filtres. Au-delà de [`MAX_ATTEMPTS`] essais, renvoie
/// un tirage simple qui respecte seulement les numéros imposés et exclus.
pub fn generate_filtered(
    filters: &GeneratorFilters,
    seed: u64,
) -> Result<GeneratedNumbers, ConstraintError> {
    let constraints = &filters.constraints;
    constraints.validate()?;

    let locked: Vec<u8> = constraints.locked.iter().copied().collect();
    let available: Vec<u8> = (1..=POOL_SIZE as u8)
        .filter(|n| !constraints.locked.contains(n) && !constraints.excluded.contains(n))
        .collect();
    let needed = PICK_COUNT - locked.len();
    if available.len() < needed {
        return Err(ConstraintError::NotEnoughNumbers {
            available: available.len(),
            needed,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for attempt in 1..=MAX_ATTEMPTS {
        let fill = if filters.bucket_balance {
            pick_by_bucket(&available, needed, &mut rng)
        } else {
            pick_uniform(&available, needed, &mut rng)
        };
        let numbers = assemble(&locked, &fill);
        if filters.accepts(&numbers) {
            return Ok(GeneratedNumbers {
                numbers,
                attempts: attempt,
                filtered: true,
            });
        }
    }

    tracing::warn!(attempts = MAX_ATTEMPTS, "filtres impossibles à satisfaire, tirage simple");
    let fill = pick_uniform(&available, needed, &mut rng);
    Ok(GeneratedNumbers {
        numbers: assemble(&locked, &fill),
        attempts: MAX_ATTEMPTS,
        filtered: false,
    })
}

/// `count` grilles filtrées, chacune avec son propre générateur dérivé de `seed`.
pub fn generate_filtered_batch(
    filters: &GeneratorFilters,
    count: usize,
    seed: u64,
) -> Result<Vec<GeneratedNumbers>, ConstraintError> {
    (0..count)
        .into_par_iter()
        .map(|i| generate_filtered(filters, seed.wrapping_mul(31).wrapping_add(i as u64 + 1)))
        .collect()
}

/// Deux ou trois numéros parmi les chauds, puis complément visant `target_odd`
/// numéros impairs au total.
pub fn generate_optimized(hot: &[u8], target_odd: usize, rng: &mut StdRng) -> [u8; 6] {
    let mut hot_pool: Vec<u8> = hot
        .iter()
        .copied()
        .filter(|&n| n >= 1 && n as usize <= POOL_SIZE)
        .take(OPTIMIZED_HOT_POOL)
        .collect();
    hot_pool.dedup();
    hot_pool.shuffle(rng);
    let hot_count = rng.random_range(2..=3usize).min(hot_pool.len());

    let mut picked: Vec<u8> = hot_pool[..hot_count].to_vec();
    let mut remaining: Vec<u8> = (1..=POOL_SIZE as u8)
        .filter(|n| !picked.contains(n))
        .collect();

    while picked.len() < PICK_COUNT {
        let current_odd = picked.iter().filter(|&&n| n % 2 == 1).count() as i64;
        let need_odd = target_odd as i64 - current_odd;
        let need_even = (PICK_COUNT - picked.len()) as i64 - need_odd;

        let mut candidates: Vec<usize> = (0..remaining.len()).collect();
        if need_odd > 0 && need_even <= 0 {
            candidates.retain(|&i| remaining[i] % 2 == 1);
        } else if need_even > 0 && need_odd <= 0 {
            candidates.retain(|&i| remaining[i] % 2 == 0);
        }
        if candidates.is_empty() {
            candidates = (0..remaining.len()).collect();
        }
        let index = candidates[rng.random_range(0..candidates.len())];
        picked.push(remaining.swap_remove(index));
    }

    assemble(&[], &picked)
}

/// Grilles optimisées d'après l'historique : numéros chauds récents et nombre
/// d'impairs le plus fréquent.
pub fn optimized_picks(
    draws: &[HistoricalDraw],
    config: &AnalysisConfig,
    count: usize,
    seed: u64,
) -> Vec<[u8; 6]> {
    let summary = analyze_patterns(draws);
    let (hot, _) = hot_cold_numbers(draws, config.hot_cold_recent);
    tracing::debug!(
        hot = hot.len(),
        odd = summary.most_common_odd_count,
        "génération optimisée"
    );

    (0..count)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_mul(31).wrapping_add(i as u64 + 1));
            generate_optimized(&hot, summary.most_common_odd_count, &mut rng)
        })
        .collect()
}
