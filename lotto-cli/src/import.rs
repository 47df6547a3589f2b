use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use lotto_db::rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;

use lotto_db::db::insert_draw;
use lotto_db::models::{HistoricalDraw, validate_draw};

/// Accepte `AAAA-MM-JJ`, `AAAA.MM.JJ` et `JJ/MM/AAAA`.
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%Y.%m.%d", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .with_context(|| format!("Format de date invalide: '{}'", raw))
}

/// Montant éventuellement formaté avec séparateurs de milliers (`1,234,567`).
fn parse_amount(raw: &str) -> Result<u64> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.is_empty() {
        return Ok(0);
    }
    cleaned
        .parse::<u64>()
        .with_context(|| format!("Montant invalide: '{}'", raw))
}

fn parse_record(record: &csv::StringRecord) -> Result<HistoricalDraw> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let raw_round = get(0)?;
    let round: u32 = raw_round
        .parse()
        .with_context(|| format!("Numéro de tirage invalide: '{}'", raw_round))?;
    let draw_date = parse_date(&get(1)?)?;

    let numbers: [u8; 6] = [
        get_u8(2)?,
        get_u8(3)?,
        get_u8(4)?,
        get_u8(5)?,
        get_u8(6)?,
        get_u8(7)?,
    ];
    let bonus = get_u8(8)?;
    validate_draw(&numbers, bonus).with_context(|| format!("Tirage {} invalide", round))?;

    // Les colonnes de gains sont facultatives
    let first_prize = parse_amount(&get(9).unwrap_or_default())?;
    let first_winners = u32::try_from(parse_amount(&get(10).unwrap_or_default())?)
        .with_context(|| format!("Nombre de gagnants hors limites pour le tirage {}", round))?;
    let total_sales = parse_amount(&get(11).unwrap_or_default())?;

    Ok(HistoricalDraw {
        round,
        draw_date,
        numbers,
        bonus,
        first_prize,
        first_winners,
        total_sales,
    })
}

#[derive(Debug, Default)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

impl ImportResult {
    fn record(&mut self, line: u32, outcome: Result<bool>) {
        match outcome {
            Ok(true) => self.inserted += 1,
            Ok(false) => self.skipped += 1,
            Err(e) => {
                tracing::warn!(line, error = %format!("{e:#}"), "ligne ignorée");
                self.errors += 1;
            }
        }
    }
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult::default();

    for record_result in reader.records() {
        result.total_records += 1;
        let outcome = record_result
            .context("Erreur de lecture")
            .and_then(|record| parse_record(&record))
            .and_then(|draw| insert_draw(&tx, &draw));
        result.record(result.total_records, outcome);
    }

    tx.commit().context("Échec du commit")?;
    tracing::info!(
        inserted = result.inserted,
        skipped = result.skipped,
        errors = result.errors,
        "import CSV terminé"
    );
    Ok(result)
}

/// Réponse de l'API publique des résultats (`returnValue` vaut `success` ou `fail`).
#[derive(Debug, Deserialize)]
pub struct LottoResponse {
    #[serde(rename = "returnValue")]
    pub return_value: String,
    #[serde(rename = "drwNo", default)]
    pub round: u32,
    #[serde(rename = "drwNoDate", default)]
    pub date: String,
    #[serde(rename = "drwtNo1", default)]
    pub n1: u8,
    #[serde(rename = "drwtNo2", default)]
    pub n2: u8,
    #[serde(rename = "drwtNo3", default)]
    pub n3: u8,
    #[serde(rename = "drwtNo4", default)]
    pub n4: u8,
    #[serde(rename = "drwtNo5", default)]
    pub n5: u8,
    #[serde(rename = "drwtNo6", default)]
    pub n6: u8,
    #[serde(rename = "bnusNo", default)]
    pub bonus: u8,
    #[serde(rename = "firstWinamnt", default)]
    pub first_prize: u64,
    #[serde(rename = "firstPrzwnerCo", default)]
    pub first_winners: u32,
    #[serde(rename = "totSellamnt", default)]
    pub total_sales: u64,
}

impl LottoResponse {
    pub fn into_draw(self) -> Result<HistoricalDraw> {
        if self.return_value != "success" {
            bail!("Réponse en échec pour le tirage {}", self.round);
        }
        let numbers = [self.n1, self.n2, self.n3, self.n4, self.n5, self.n6];
        validate_draw(&numbers, self.bonus)
            .with_context(|| format!("Tirage {} invalide", self.round))?;
        Ok(HistoricalDraw {
            round: self.round,
            draw_date: parse_date(&self.date)?,
            numbers,
            bonus: self.bonus,
            first_prize: self.first_prize,
            first_winners: self.first_winners,
            total_sales: self.total_sales,
        })
    }
}

/// Un fichier peut contenir une réponse unique ou une liste de réponses.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LottoPayload {
    Many(Vec<LottoResponse>),
    One(LottoResponse),
}

pub fn parse_json(json: &str) -> Result<Vec<LottoResponse>> {
    let payload: LottoPayload = serde_json::from_str(json).context("JSON invalide")?;
    Ok(match payload {
        LottoPayload::Many(responses) => responses,
        LottoPayload::One(response) => vec![response],
    })
}

pub fn import_json(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;
    let responses = parse_json(&json)?;

    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult::default();
    for response in responses {
        result.total_records += 1;
        let outcome = response.into_draw().and_then(|draw| insert_draw(&tx, &draw));
        result.record(result.total_records, outcome);
    }

    tx.commit().context("Échec du commit")?;
    tracing::info!(inserted = result.inserted, errors = result.errors, "import JSON terminé");
    Ok(result)
}
