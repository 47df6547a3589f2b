use std::collections::{BTreeSet, HashMap};

use lotto_db::models::{HistoricalDraw, NumberPair, NumberTrend, Trend, POOL_SIZE, PICK_COUNT};

/// Heuristique de première différence : compare les apparitions des deux moitiés
/// de la fenêtre récente. Pas un test statistique, bruité sur petite fenêtre.
pub fn classify_trend(older: u32, newer: u32) -> Trend {
    if newer > older {
        Trend::Rising
    } else if newer < older {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Fréquences, tendances et co-occurrences sur l'historique fourni.
///
/// L'ordre de `draws` est indifférent : la fenêtre récente est déterminée par le
/// numéro de tirage. Les tendances sortent dans l'ordre des numéros (1 à 45), les
/// paires dans l'ordre de leur clé `(a, b)`.
pub fn analyze(
    draws: &[HistoricalDraw],
    recent_window_size: usize,
) -> (Vec<NumberTrend>, Vec<NumberPair>) {
    let trends = number_trends(draws, recent_window_size);
    let pairs = number_pairs(draws);
    tracing::debug!(
        draws = draws.len(),
        window = recent_window_size,
        pairs = pairs.len(),
        "analyse des tendances terminée"
    );
    (trends, pairs)
}

fn number_trends(draws: &[HistoricalDraw], window: usize) -> Vec<NumberTrend> {
    let mut counts = [0u32; POOL_SIZE + 1];
    for draw in draws {
        for &n in &draw.numbers {
            if let Some(count) = counts.get_mut(n as usize) {
                *count += 1;
            }
        }
    }

    // Derniers tirages, du plus ancien au plus récent
    let mut chronological: Vec<&HistoricalDraw> = draws.iter().collect();
    chronological.sort_by_key(|d| d.round);
    let recent = &chronological[chronological.len().saturating_sub(window)..];
    // Fenêtre alignée sur le tirage le plus récent : les cases manquantes restent à false
    let offset = window - recent.len();

    let total = draws.len() as f64;
    let expected = total * PICK_COUNT as f64 / POOL_SIZE as f64;
    let half = window / 2;

    (1..=POOL_SIZE as u8)
        .map(|number| {
            let appearances = counts[number as usize];
            let mut recent_window = vec![false; window];
            for (i, draw) in recent.iter().enumerate() {
                recent_window[offset + i] = draw.contains(number);
            }

            let older = recent_window[..half].iter().filter(|&&hit| hit).count() as u32;
            let newer = recent_window[window - half..].iter().filter(|&&hit| hit).count() as u32;

            let (frequency, deviation_pct) = if draws.is_empty() {
                (0.0, 0.0)
            } else {
                (
                    appearances as f64 / total,
                    (appearances as f64 - expected) / expected * 100.0,
                )
            };

            NumberTrend {
                number,
                appearances,
                frequency,
                expected_frequency: expected,
                deviation_pct,
                trend: classify_trend(older, newer),
                recent_window,
            }
        })
        .collect()
}

fn number_pairs(draws: &[HistoricalDraw]) -> Vec<NumberPair> {
    let mut counter: HashMap<(u8, u8), (u32, BTreeSet<u32>)> = HashMap::new();

    for draw in draws {
        let numbers = draw.sorted_numbers();
        for i in 0..numbers.len() {
            for j in (i + 1)..numbers.len() {
                let entry = counter
                    .entry((numbers[i], numbers[j]))
                    .or_insert_with(|| (0, BTreeSet::new()));
                entry.0 += 1;
                entry.1.insert(draw.round);
            }
        }
    }

    let total = draws.len() as f64;
    let mut pairs: Vec<NumberPair> = counter
        .into_iter()
        .map(|((a, b), (appearances, rounds))| NumberPair {
            a,
            b,
            appearances,
            frequency_pct: appearances as f64 / total * 100.0,
            rounds: rounds.into_iter().collect(),
        })
        .collect();
    pairs.sort_by_key(|p| (p.a, p.b));
    pairs
}

/// Paires les plus fréquentes, à égalité par clé croissante.
pub fn top_pairs(pairs: &[NumberPair], count: usize) -> Vec<NumberPair> {
    let mut sorted = pairs.to_vec();
    sorted.sort_by(|x, y| {
        y.appearances
            .cmp(&x.appearances)
            .then((x.a, x.b).cmp(&(y.a, y.b)))
    });
    sorted.truncate(count);
    sorted
}
