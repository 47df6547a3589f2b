use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::import::ImportResult;
use lotto_db::models::{
    ConditionalProbabilityResult, HistoricalDraw, NumberPair, NumberTrend,
    RecommendedCombination, Trend,
};
use lotto_engine::generator::GeneratedNumbers;
use lotto_engine::patterns::{PatternSummary, bucket_labels};
use lotto_engine::winning::{SimulationReport, TicketCheck};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

/// Montant en wons avec séparateur de milliers.
pub fn format_won(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{out} ₩")
}

pub fn display_draws(draws: &[HistoricalDraw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Tirage", "Date", "Numéros", "Bonus", "Gagnants R1", "Gain R1"]);

    for draw in draws {
        let prize = if draw.first_prize > 0 {
            format_won(draw.first_prize)
        } else {
            "—".to_string()
        };

        table.add_row(vec![
            &draw.round.to_string(),
            &draw.draw_date.to_string(),
            &join_numbers(&draw.sorted_numbers()),
            &format!("{:2}", draw.bonus),
            &draw.first_winners.to_string(),
            &prize,
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_trends(trends: &[NumberTrend], window: usize, draws: usize) {
    println!("\n📊 Fréquences sur {} tirages (tendance sur les {} derniers)\n", draws, window);

    let mut table = new_table(vec!["Numéro", "Sorties", "Fréquence", "Écart", "Récents", "Tendance"]);

    let mut sorted: Vec<&NumberTrend> = trends.iter().collect();
    sorted.sort_by(|a, b| b.appearances.cmp(&a.appearances).then(a.number.cmp(&b.number)));

    for t in sorted {
        let color = match t.trend {
            Trend::Rising => Color::Green,
            Trend::Falling => Color::Red,
            Trend::Stable => Color::White,
        };
        let recent: String = t
            .recent_window
            .iter()
            .map(|&hit| if hit { '●' } else { '·' })
            .collect();
        table.add_row(vec![
            Cell::new(format!("{:2}", t.number)),
            Cell::new(t.appearances),
            Cell::new(format!("{:.3}", t.frequency)),
            Cell::new(format!("{:+.1} %", t.deviation_pct)),
            Cell::new(recent),
            Cell::new(t.trend.to_string()).fg(color),
        ]);
    }
    println!("{table}");
}

pub fn display_pairs(pairs: &[NumberPair]) {
    println!("\n🔗 Paires les plus fréquentes\n");

    let mut table = new_table(vec!["Paire", "Sorties", "Fréquence", "Derniers tirages"]);
    for pair in pairs {
        let rounds = pair
            .rounds
            .iter()
            .rev()
            .take(5)
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            format!("{:2} - {:2}", pair.a, pair.b),
            pair.appearances.to_string(),
            format!("{:.1} %", pair.frequency_pct),
            rounds,
        ]);
    }
    println!("{table}");
}

pub fn display_patterns(summary: &PatternSummary, hot: &[u8], cold: &[u8]) {
    println!("\n🧩 Motifs des tirages\n");

    let mut table = new_table(vec!["Impairs", "Part des tirages"]);
    for (odd, pct) in &summary.odd_distribution {
        table.add_row(vec![format!("{odd}/6"), format!("{:.1} %", pct)]);
    }
    println!("{table}");

    let mut table = new_table(vec!["Tranche", "Moyenne par tirage"]);
    for (label, avg) in bucket_labels().iter().zip(summary.bucket_averages.iter()) {
        table.add_row(vec![label.clone(), format!("{:.2}", avg)]);
    }
    println!("{table}");

    println!("  Somme moyenne      : {:.1} (plage conseillée {}-{})",
        summary.average_sum, summary.sum_range.0, summary.sum_range.1);
    println!("  Impairs fréquents  : {}", summary.most_common_odd_count);
    println!("  Consécutifs        : {:.2} en moyenne, {} le plus souvent",
        summary.average_consecutive, summary.most_common_consecutive);
    println!("  Écart moyen        : {:.2} (le plus fréquent : {})",
        summary.average_gap, summary.most_common_gap);
    println!("  Numéros chauds     : {}", join_numbers(hot));
    println!("  Numéros froids     : {}", join_numbers(cold));
}

pub fn display_recommendations(combinations: &[RecommendedCombination]) {
    println!("\n🎲 Combinaisons recommandées\n");

    let mut table = new_table(vec!["Stratégie", "Numéros", "Score", "Justification"]);
    for combo in combinations {
        table.add_row(vec![
            combo.kind.to_string(),
            join_numbers(&combo.numbers),
            format!("{:.1}", combo.score),
            combo.rationale.clone(),
        ]);
    }
    println!("{table}");
    println!("Rappel : chaque combinaison a exactement la même chance d'être tirée.");
}

pub fn display_generated(grids: &[GeneratedNumbers]) {
    println!("\n🎲 Grilles générées\n");

    let mut table = new_table(vec!["#", "Numéros", "Somme", "Essais", "Filtres"]);
    for (i, grid) in grids.iter().enumerate() {
        let sum: u32 = grid.numbers.iter().map(|&n| n as u32).sum();
        let status = if grid.filtered {
            Cell::new("respectés").fg(Color::Green)
        } else {
            Cell::new("abandonnés").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(join_numbers(&grid.numbers)),
            Cell::new(sum),
            Cell::new(grid.attempts),
            status,
        ]);
    }
    println!("{table}");
}

pub fn display_optimized(grids: &[[u8; 6]], hot: &[u8], target_odd: usize) {
    println!("\n✨ Grilles optimisées ({} impairs visés)\n", target_odd);
    println!("  Numéros chauds : {}", join_numbers(hot));

    let mut table = new_table(vec!["#", "Numéros", "Impairs", "Chauds"]);
    for (i, numbers) in grids.iter().enumerate() {
        let odd = numbers.iter().filter(|&&n| n % 2 == 1).count();
        let from_hot = numbers.iter().filter(|n| hot.contains(n)).count();
        table.add_row(vec![
            format!("{}", i + 1),
            join_numbers(numbers),
            odd.to_string(),
            from_hot.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_conditional(draw: &HistoricalDraw, results: &[ConditionalProbabilityResult]) {
    println!(
        "\n🎯 Probabilités conditionnelles, tirage {} ({}) : {} + bonus {}\n",
        draw.round,
        draw.draw_date,
        join_numbers(&draw.sorted_numbers()),
        draw.bonus
    );

    let mut table = new_table(vec!["Rang", "Probabilité", "Cote", "Cas favorables", "Écart / base", "Détail"]);
    for r in results {
        let odds = if r.odds_denominator == 0 {
            "impossible".to_string()
        } else {
            format!("1 sur {}", r.odds_denominator)
        };
        let color = if r.delta_from_baseline_pct > 0.0 {
            Color::Green
        } else if r.delta_from_baseline_pct < 0.0 {
            Color::Red
        } else {
            Color::White
        };
        table.add_row(vec![
            Cell::new(r.rank.to_string()),
            Cell::new(format!("{:.8}", r.probability)),
            Cell::new(odds),
            Cell::new(format!("{} / {}", r.favorable_cases, r.total_cases)),
            Cell::new(format!("{:+.1} %", r.delta_from_baseline_pct)).fg(color),
            Cell::new(&r.description),
        ]);
    }
    println!("{table}");
}

pub fn display_ticket_check(draw: &HistoricalDraw, check: &TicketCheck, prize: Option<u64>) {
    println!("\nTirage {} : {} + bonus {}", draw.round, join_numbers(&draw.sorted_numbers()), draw.bonus);
    println!("  Numéros trouvés : {}", join_numbers(&check.matched));
    println!("  Autres numéros  : {}", join_numbers(&check.unmatched));
    if check.bonus_matched {
        println!("  Bonus trouvé    : {}", draw.bonus);
    }
    match (check.rank, prize) {
        (Some(rank), Some(amount)) => {
            println!("  Résultat        : {} rang ({}), gain estimé {}", rank, rank.description(), format_won(amount));
        }
        _ => println!("  Résultat        : perdu"),
    }
}

pub fn display_simulation(draw: &HistoricalDraw, report: &SimulationReport) {
    println!("\n🎰 Simulation de {} grilles contre le tirage {}\n", report.games, draw.round);

    let mut table = new_table(vec!["Rang", "Grilles", "Gains"]);
    for (rank, count) in &report.rank_counts {
        let total = report.prize_by_rank.get(rank).copied().unwrap_or(0);
        table.add_row(vec![rank.to_string(), count.to_string(), format_won(total)]);
    }
    println!("{table}");

    println!("  Mise totale     : {}", format_won(report.investment));
    println!("  Gains totaux    : {}", format_won(report.total_prize));
    println!("  Grilles gagnantes : {}", report.winning_games);
    let sign = if report.profit < 0 { "-" } else { "" };
    println!("  Bilan           : {}{}", sign, format_won(report.profit.unsigned_abs()));
    println!("  Rendement       : {:+.1} %", report.return_rate_pct);
}

pub fn display_status(count: u32, latest: Option<&HistoricalDraw>, estimated: u32) {
    println!("Tirages en base : {}", count);
    match latest {
        Some(draw) => {
            println!("Dernier tirage  : n°{} du {}", draw.round, draw.draw_date);
            if estimated > draw.round {
                println!("Tirages manquants estimés : {}", estimated - draw.round);
            }
        }
        None => println!("Base vide. Lancez d'abord : lotto import"),
    }
    println!("Dernier tirage estimé (calendrier) : n°{}", estimated);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_won() {
        assert_eq!(format_won(0), "0 ₩");
        assert_eq!(format_won(1_000), "1,000 ₩");
        assert_eq!(format_won(2_605_303_381), "2,605,303,381 ₩");
        assert_eq!(format_won(999), "999 ₩");
    }

    #[test]
    fn test_join_numbers() {
        assert_eq!(join_numbers(&[3, 11, 45]), " 3 - 11 - 45");
    }
}
