mod display;
mod import;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lotto_db::db::{count_draws, db_path, fetch_last_draws, insert_draw, migrate, open_db};
use lotto_db::models::{HistoricalDraw, validate_draw, validate_numbers};
use lotto_db::rusqlite::Connection;
use lotto_engine::conditional::{ConstraintSet, compute_conditional};
use lotto_engine::config::{AnalysisConfig, load_config, save_config};
use lotto_engine::generator::{GeneratorFilters, generate_filtered_batch, optimized_picks};
use lotto_engine::patterns::{analyze_patterns, hot_cold_numbers};
use lotto_engine::recommend::{date_seed, recommend_with};
use lotto_engine::source::{CachedSource, DrawSource, SqliteSource, collect_window, estimate_latest_round};
use lotto_engine::trend::{analyze, top_pairs};
use lotto_engine::winning::{estimated_prize, rank_ticket, simulate};
use crate::display::{
    display_conditional, display_draws, display_generated, display_import_summary,
    display_optimized, display_pairs, display_patterns, display_recommendations,
    display_simulation, display_status, display_ticket_check, display_trends,
};

#[derive(Parser)]
#[command(name = "lotto", about = "Analyse combinatoire et statistique du Lotto 6/45")]
struct Cli {
    /// Fichier de configuration JSON
    #[arg(long, global = true, default_value = "lotto.json")]
    config: PathBuf,

    /// Niveau de journalisation (surchargé par RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV
    Import {
        /// Chemin vers le fichier CSV
        #[arg(short, long, default_value = "assets/lotto.csv")]
        file: PathBuf,
    },

    /// Importer des réponses JSON de l'API des résultats
    ImportJson {
        /// Fichier contenant une réponse ou une liste de réponses
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// État de la base et dernier tirage estimé
    Status,

    /// Ajouter un tirage manuellement
    Add,

    /// Fréquences, tendances, paires et motifs
    Analyze {
        /// Nombre de tirages analysés (0 = tout l'historique)
        #[arg(short, long)]
        window: Option<u32>,

        /// Taille de la fenêtre récente
        #[arg(short, long)]
        recent: Option<usize>,

        /// Nombre de paires affichées
        #[arg(short, long, default_value = "10")]
        pairs: usize,
    },

    /// Combinaisons recommandées par stratégie
    Recommend {
        /// Nombre de tirages analysés (0 = tout l'historique)
        #[arg(short, long)]
        window: Option<u32>,

        /// Seed pour la reproductibilité (par défaut : date du jour)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Grilles aléatoires sous filtres
    Generate {
        /// Numéros à inclure, séparés par des virgules
        #[arg(short, long, value_delimiter = ',')]
        include: Vec<u8>,

        /// Numéros à exclure, séparés par des virgules
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<u8>,

        /// Nombre minimal de numéros impairs
        #[arg(long, requires = "max_odd")]
        min_odd: Option<usize>,

        /// Nombre maximal de numéros impairs
        #[arg(long, requires = "min_odd")]
        max_odd: Option<usize>,

        /// Somme minimale
        #[arg(long, requires = "max_sum")]
        min_sum: Option<u32>,

        /// Somme maximale
        #[arg(long, requires = "min_sum")]
        max_sum: Option<u32>,

        /// Plus longue suite de consécutifs autorisée
        #[arg(long)]
        max_consecutive: Option<usize>,

        /// Répartir les numéros sur les tranches
        #[arg(short, long)]
        balanced: bool,

        /// Nombre de grilles
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Grilles optimisées d'après les numéros chauds et la parité fréquente
    Optimize {
        /// Nombre de tirages analysés (0 = tout l'historique)
        #[arg(short, long)]
        window: Option<u32>,

        /// Nombre de grilles
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Probabilités de chaque rang avec numéros imposés et exclus
    Conditional {
        /// Tirage de référence (par défaut : le dernier)
        #[arg(long)]
        round: Option<u32>,

        /// Numéros imposés, séparés par des virgules
        #[arg(short, long, value_delimiter = ',')]
        locked: Vec<u8>,

        /// Numéros exclus, séparés par des virgules
        #[arg(short, long, value_delimiter = ',')]
        excluded: Vec<u8>,
    },

    /// Vérifier une grille contre un tirage
    Check {
        /// Tirage de référence (par défaut : le dernier)
        #[arg(long)]
        round: Option<u32>,

        /// 6 numéros séparés par des virgules
        #[arg(short, long, value_delimiter = ',', required = true)]
        numbers: Vec<u8>,
    },

    /// Jouer des grilles aléatoires contre un tirage connu
    Simulate {
        /// Tirage de référence (par défaut : le dernier)
        #[arg(long)]
        round: Option<u32>,

        /// Nombre de grilles
        #[arg(short, long, default_value = "1000")]
        games: u32,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Afficher ou initialiser la configuration
    Config {
        /// Écrire la configuration par défaut
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = read_config(&cli.config)?;
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::ImportJson { file } => cmd_import_json(&conn, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Status => cmd_status(&conn),
        Command::Add => cmd_add(&conn),
        Command::Analyze { window, recent, pairs } => cmd_analyze(&conn, &config, window, recent, pairs),
        Command::Recommend { window, seed } => cmd_recommend(&conn, &config, window, seed),
        Command::Generate {
            include,
            exclude,
            min_odd,
            max_odd,
            min_sum,
            max_sum,
            max_consecutive,
            balanced,
            count,
            seed,
        } => {
            let filters = GeneratorFilters {
                constraints: ConstraintSet::new(include, exclude)?,
                odd_range: min_odd.zip(max_odd),
                sum_range: min_sum.zip(max_sum),
                max_consecutive,
                bucket_balance: balanced,
            };
            cmd_generate(&filters, count, seed)
        }
        Command::Optimize { window, count, seed } => cmd_optimize(&conn, &config, window, count, seed),
        Command::Conditional { round, locked, excluded } => cmd_conditional(&conn, round, locked, excluded),
        Command::Check { round, numbers } => cmd_check(&conn, round, &numbers),
        Command::Simulate { round, games, seed } => cmd_simulate(&conn, round, games, seed),
        Command::Config { init } => cmd_config(&cli.config, &config, init),
    }
}

fn read_config(path: &Path) -> Result<AnalysisConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "pas de configuration, valeurs par défaut");
        return Ok(AnalysisConfig::default());
    }
    load_config(path).with_context(|| format!("Configuration illisible {:?}", path))
}

fn ensure_not_empty(conn: &Connection) -> Result<bool> {
    if count_draws(conn)? == 0 {
        println!("Base vide. Lancez d'abord : lotto import");
        return Ok(false);
    }
    Ok(true)
}

fn load_window(conn: &Connection, config: &AnalysisConfig, window: Option<u32>) -> Result<Vec<HistoricalDraw>> {
    let source = CachedSource::new(SqliteSource::new(conn));
    let draws = collect_window(&source, window.unwrap_or(config.window), &config.pacing())?;
    Ok(draws)
}

fn reference_draw(conn: &Connection, round: Option<u32>) -> Result<HistoricalDraw> {
    let source = SqliteSource::new(conn);
    let round = match round {
        Some(r) => r,
        None => source.latest_round()?,
    };
    Ok(source.fetch_round(round)?)
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_import_json(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_json(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let draws = fetch_last_draws(conn, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_status(conn: &Connection) -> Result<()> {
    let count = count_draws(conn)?;
    let latest = fetch_last_draws(conn, 1)?;
    let estimated = estimate_latest_round(chrono::Local::now().date_naive());
    display_status(count, latest.first(), estimated);
    Ok(())
}

fn cmd_analyze(
    conn: &Connection,
    config: &AnalysisConfig,
    window: Option<u32>,
    recent: Option<usize>,
    pairs: usize,
) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let draws = load_window(conn, config, window)?;
    let recent = recent.unwrap_or(config.recent_window);

    let (trends, all_pairs) = analyze(&draws, recent);
    display_trends(&trends, recent, draws.len());
    display_pairs(&top_pairs(&all_pairs, pairs));

    let summary = analyze_patterns(&draws);
    let (hot, cold) = hot_cold_numbers(&draws, config.hot_cold_recent);
    display_patterns(&summary, &hot, &cold);
    Ok(())
}

fn cmd_recommend(conn: &Connection, config: &AnalysisConfig, window: Option<u32>, seed: Option<u64>) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let draws = load_window(conn, config, window)?;
    let (trends, _) = analyze(&draws, config.recent_window);

    let seed = seed.unwrap_or_else(date_seed);
    tracing::info!(seed, draws = draws.len(), "génération des recommandations");
    let combinations = recommend_with(&trends, config, seed);
    display_recommendations(&combinations);
    Ok(())
}

fn cmd_generate(filters: &GeneratorFilters, count: usize, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or_else(date_seed);
    let grids = generate_filtered_batch(filters, count, seed)?;
    display_generated(&grids);
    Ok(())
}

fn cmd_optimize(conn: &Connection, config: &AnalysisConfig, window: Option<u32>, count: usize, seed: Option<u64>) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let draws = load_window(conn, config, window)?;
    let summary = analyze_patterns(&draws);
    let (hot, _) = hot_cold_numbers(&draws, config.hot_cold_recent);
    let grids = optimized_picks(&draws, config, count, seed.unwrap_or_else(date_seed));
    display_optimized(&grids, &hot, summary.most_common_odd_count);
    Ok(())
}

fn cmd_conditional(conn: &Connection, round: Option<u32>, locked: Vec<u8>, excluded: Vec<u8>) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let constraints = ConstraintSet::new(locked, excluded)?;
    let draw = reference_draw(conn, round)?;
    let results = compute_conditional(&draw, &constraints)?;
    display_conditional(&draw, &results);
    Ok(())
}

fn cmd_check(conn: &Connection, round: Option<u32>, numbers: &[u8]) -> Result<()> {
    if numbers.len() != 6 {
        bail!("Entrez exactement 6 numéros ({} reçus)", numbers.len());
    }
    validate_numbers(numbers)?;
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let draw = reference_draw(conn, round)?;
    let check = rank_ticket(numbers, &draw);
    let prize = check.rank.map(|rank| estimated_prize(rank, &draw));
    display_ticket_check(&draw, &check, prize);
    Ok(())
}

fn cmd_simulate(conn: &Connection, round: Option<u32>, games: u32, seed: Option<u64>) -> Result<()> {
    if !ensure_not_empty(conn)? {
        return Ok(());
    }
    let draw = reference_draw(conn, round)?;
    let report = simulate(&draw, games, seed.unwrap_or_else(date_seed));
    display_simulation(&draw, &report);
    Ok(())
}

fn cmd_config(path: &Path, config: &AnalysisConfig, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            bail!("{:?} existe déjà", path);
        }
        save_config(&AnalysisConfig::default(), path)?;
        println!("Configuration écrite dans {}", path.display());
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn cmd_add(conn: &Connection) -> Result<()> {
    println!("Ajout d'un tirage manuellement\n");

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let raw_round = prompt(&mut input, "Numéro du tirage (ex: 1101) : ")?;
    let round: u32 = raw_round
        .parse()
        .with_context(|| format!("Numéro de tirage invalide: '{}'", raw_round))?;
    let raw_date = prompt(&mut input, "Date (AAAA-MM-JJ) : ")?;
    let draw_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .with_context(|| format!("Format de date invalide: '{}'", raw_date))?;

    let numbers = prompt_numbers(&mut input)?;
    let bonus = prompt_bonus(&mut input, &numbers)?;
    validate_draw(&numbers, bonus)?;

    let draw = HistoricalDraw {
        round,
        draw_date,
        numbers,
        bonus,
        first_prize: 0,
        first_winners: 0,
        total_sales: 0,
    };

    println!("\nTirage à insérer :");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt(&mut input, "\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.trim().to_lowercase() == "o" {
        let inserted = insert_draw(conn, &draw)?;
        if inserted {
            println!("Tirage inséré avec succès.");
        } else {
            println!("Ce tirage existe déjà (doublon ignoré).");
        }
    } else {
        println!("Insertion annulée.");
    }

    Ok(())
}

/// Une ligne de l'entrée ; la fin de l'entrée est une erreur.
fn prompt(input: &mut impl BufRead, msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("Erreur de lecture")?;
    if read == 0 {
        bail!("Entrée interrompue");
    }
    Ok(line.trim().to_string())
}

fn prompt_numbers(input: &mut impl BufRead) -> Result<[u8; 6]> {
    loop {
        let line = prompt(input, "6 numéros (séparés par des espaces, 1-45) : ")?;
        let nums: Result<Vec<u8>, _> = line.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(v) if v.len() == 6 => {
                if validate_numbers(&v).is_ok() {
                    return Ok([v[0], v[1], v[2], v[3], v[4], v[5]]);
                }
                println!("Numéros invalides (1-45, pas de doublons). Réessayez.");
            }
            _ => println!("Entrez exactement 6 numéros. Réessayez."),
        }
    }
}

fn prompt_bonus(input: &mut impl BufRead, numbers: &[u8; 6]) -> Result<u8> {
    loop {
        let line = prompt(input, "Numéro bonus (1-45) : ")?;
        match line.parse::<u8>() {
            Ok(bonus) if validate_draw(numbers, bonus).is_ok() => return Ok(bonus),
            _ => println!("Bonus invalide (1-45, absent des 6 numéros). Réessayez."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_reads_trimmed_line() {
        let mut input = Cursor::new("  1101 \n");
        assert_eq!(prompt(&mut input, "").unwrap(), "1101");
    }

    #[test]
    fn test_prompt_fails_at_end_of_input() {
        let mut input = Cursor::new("");
        let err = prompt(&mut input, "").unwrap_err();
        assert_eq!(err.to_string(), "Entrée interrompue");
    }

    #[test]
    fn test_prompt_numbers_retries_then_stops_at_end_of_input() {
        let mut input = Cursor::new("1 2 3\n1 1 2 3 4 5\n");
        assert!(prompt_numbers(&mut input).is_err());
    }

    #[test]
    fn test_prompt_numbers_after_invalid_line() {
        let mut input = Cursor::new("1 2 3\n45 3 11 22 33 41\n");
        assert_eq!(prompt_numbers(&mut input).unwrap(), [45, 3, 11, 22, 33, 41]);
    }

    #[test]
    fn test_prompt_bonus_stops_at_end_of_input() {
        let numbers = [3, 11, 22, 33, 41, 45];
        let mut input = Cursor::new("3\n");
        assert!(prompt_bonus(&mut input, &numbers).is_err());

        let mut input = Cursor::new("3\n7\n");
        assert_eq!(prompt_bonus(&mut input, &numbers).unwrap(), 7);
    }

    #[test]
    fn test_generate_command_parses_filters() {
        let cli = Cli::try_parse_from([
            "lotto", "generate", "--include", "3,7", "--min-odd", "2", "--max-odd", "4", "--balanced",
        ])
        .unwrap();
        match cli.command {
            Command::Generate { include, min_odd, max_odd, balanced, min_sum, .. } => {
                assert_eq!(include, vec![3, 7]);
                assert_eq!(min_odd.zip(max_odd), Some((2, 4)));
                assert!(balanced);
                assert!(min_sum.is_none());
            }
            _ => panic!("sous-commande inattendue"),
        }
    }
}
