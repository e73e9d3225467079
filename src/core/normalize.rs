//! Record normalizer: turns the raw registry export into deduplicated,
//! fully populated [`FundRecord`]s.
//!
//! The stages run in a fixed order: decode and parse, strip punctuation from
//! the fund identifier, drop repeated identifiers (first occurrence wins) and
//! finally fill absent values with their type default.

use crate::core::error::ParseError;
use crate::core::record::{COLUMN_COUNT, COLUMNS, ColumnKind, FundRecord, IDENTIFIER_INDEX};
use chrono::NaiveDate;
use encoding_rs::Encoding;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::vec::IntoIter;
use tracing::{debug, info, warn};

/// Tokens treated as a missing value, in addition to an empty field.
const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Significant digits a SQLite REAL keeps through a text round trip.
const MAX_EXACT_DIGITS: u32 = 15;

/// Magnitude bound of a `DECIMAL(18,2)` value.
const DECIMAL_INTEGER_LIMIT: u64 = 10_000_000_000_000_000;

/// How the source bytes are laid out.
#[derive(Debug, Clone, Copy)]
pub struct SourceFormat {
    pub encoding: &'static Encoding,
    pub delimiter: u8,
}

impl Default for SourceFormat {
    fn default() -> Self {
        SourceFormat {
            encoding: encoding_rs::WINDOWS_1252,
            delimiter: b';',
        }
    }
}

/// A parsed row before type coercion, values in [`COLUMNS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub line: u64,
    pub values: Vec<Option<String>>,
}

impl RawRecord {
    pub fn identifier(&self) -> Option<&str> {
        self.values[IDENTIFIER_INDEX].as_deref()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows_read: usize,
    pub duplicates_removed: usize,
    pub missing_identifiers: usize,
}

#[derive(Debug)]
pub struct Normalized {
    pub records: Vec<FundRecord>,
    pub stats: NormalizeStats,
}

/// Runs every normalization stage over a raw export.
pub fn normalize(bytes: &[u8], format: &SourceFormat) -> Result<Normalized, ParseError> {
    let mut rows = parse(bytes, format)?;
    let rows_read = rows.len();
    info!("Parsed {} rows from source", rows_read);

    let mut missing_identifiers = 0;
    for row in &mut rows {
        match row.values[IDENTIFIER_INDEX].as_mut() {
            Some(id) => {
                *id = normalize_identifier(id);
                if !id.chars().all(|c| c.is_ascii_digit()) {
                    warn!("Line {}: identifier '{}' is not all digits", row.line, id);
                }
            }
            None => missing_identifiers += 1,
        }
    }
    if missing_identifiers > 0 {
        warn!("{} rows have no CNPJ_FUNDO", missing_identifiers);
    }

    let rows = dedup_first(rows);
    let duplicates_removed = rows_read - rows.len();
    info!("Removed {} rows with a repeated CNPJ_FUNDO", duplicates_removed);

    let records = rows
        .into_iter()
        .map(fill_defaults)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Normalized {
        records,
        stats: NormalizeStats {
            rows_read,
            duplicates_removed,
            missing_identifiers,
        },
    })
}

/// Decodes `bytes` and reads them as delimited text with a header row.
///
/// Every registry column must be named in the header; extra columns are
/// skipped. Values are reordered into [`COLUMNS`] order.
pub fn parse(bytes: &[u8], format: &SourceFormat) -> Result<Vec<RawRecord>, ParseError> {
    let (text, _, had_errors) = format.encoding.decode(bytes);
    if had_errors {
        warn!(
            "Source contains byte sequences invalid for {}; they were replaced",
            format.encoding.name()
        );
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::MissingHeader);
    }

    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        positions.entry(name.trim()).or_insert(idx);
    }

    let mut layout = Vec::with_capacity(COLUMN_COUNT);
    let mut missing = Vec::new();
    for def in &COLUMNS {
        match positions.get(def.name) {
            Some(&idx) => layout.push(idx),
            None => missing.push(def.name.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(ParseError::MissingColumns(missing));
    }

    let known: HashSet<&str> = COLUMNS.iter().map(|c| c.name).collect();
    let extra: Vec<&str> = headers
        .iter()
        .map(str::trim)
        .filter(|h| !known.contains(h))
        .collect();
    if !extra.is_empty() {
        warn!("Ignoring unknown source columns: {}", extra.join(", "));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let values = layout
            .iter()
            .map(|&idx| record.get(idx).and_then(present))
            .collect();
        rows.push(RawRecord { line, values });
    }
    debug!("Read {} data rows", rows.len());
    Ok(rows)
}

fn present(field: &str) -> Option<String> {
    if field.is_empty() || MISSING_MARKERS.contains(&field) {
        None
    } else {
        Some(field.to_string())
    }
}

/// Removes every `.`, `/` and `-` from a CNPJ, keeping everything else in order.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '.' | '/' | '-'))
        .collect()
}

/// Keeps the first row for each identifier, preserving source order.
///
/// Rows without an identifier all share the same empty key.
pub fn dedup_first(rows: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| {
            let key = row.identifier().unwrap_or_default().to_string();
            if seen.insert(key) {
                true
            } else {
                debug!("Line {}: dropping repeated identifier", row.line);
                false
            }
        })
        .collect()
}

/// Coerces a raw row into a [`FundRecord`], substituting type defaults for
/// absent values.
pub fn fill_defaults(raw: RawRecord) -> Result<FundRecord, ParseError> {
    let mut f = Fields {
        line: raw.line,
        pos: 0,
        values: raw.values.into_iter(),
    };

    // Field order below must match COLUMNS.
    Ok(FundRecord {
        tp_fundo: f.text(),
        cnpj_fundo: f.text(),
        denom_social: f.text(),
        dt_reg: f.date()?,
        dt_const: f.date()?,
        cd_cvm: f.integer()?,
        dt_cancel: f.date()?,
        sit: f.text(),
        dt_ini_sit: f.date()?,
        dt_ini_ativ: f.date()?,
        dt_ini_exerc: f.date()?,
        dt_fim_exerc: f.date()?,
        classe: f.text(),
        dt_ini_classe: f.date()?,
        rentab_fundo: f.text(),
        condom: f.text(),
        fundo_cotas: f.text(),
        fundo_exclusivo: f.text(),
        trib_lprazo: f.text(),
        publico_alvo: f.text(),
        entid_invest: f.text(),
        taxa_perfm: f.float()?,
        inf_taxa_perfm: f.text(),
        taxa_adm: f.float()?,
        inf_taxa_adm: f.text(),
        vl_patrim_liq: f.decimal()?,
        dt_patrim_liq: f.date()?,
        diretor: f.text(),
        cnpj_admin: f.text(),
        admin: f.text(),
        pf_pj_gestor: f.text(),
        cpf_cnpj_gestor: f.text(),
        gestor: f.text(),
        cnpj_auditor: f.text(),
        auditor: f.text(),
        cnpj_custodiante: f.text(),
        custodiante: f.text(),
        cnpj_controlador: f.text(),
        controlador: f.text(),
        invest_cempr_exter: f.text(),
        classe_anbima: f.text(),
    })
}

/// Whether `amount` fits `DECIMAL(18,2)` and survives SQLite's NUMERIC
/// affinity, which stores it as a REAL.
fn stored_exactly(amount: Decimal) -> bool {
    let digits = amount
        .normalize()
        .mantissa()
        .unsigned_abs()
        .checked_ilog10()
        .map_or(1, |d| d + 1);
    digits <= MAX_EXACT_DIGITS && amount.abs() < Decimal::from(DECIMAL_INTEGER_LIMIT)
}

/// Walks a raw row column by column.
struct Fields {
    line: u64,
    pos: usize,
    values: IntoIter<Option<String>>,
}

impl Fields {
    fn next(&mut self, expected: fn(ColumnKind) -> bool) -> (&'static str, Option<String>) {
        let def = &COLUMNS[self.pos];
        debug_assert!(expected(def.kind), "{} read as wrong kind", def.name);
        self.pos += 1;
        (def.name, self.values.next().flatten())
    }

    fn invalid(&self, column: &'static str, value: String, expected: &'static str) -> ParseError {
        ParseError::InvalidValue {
            line: self.line,
            column,
            value,
            expected,
        }
    }

    fn text(&mut self) -> String {
        let (_, value) = self.next(|k| {
            matches!(
                k,
                ColumnKind::Text(_) | ColumnKind::LargeText | ColumnKind::Char(_)
            )
        });
        value.unwrap_or_default()
    }

    fn date(&mut self) -> Result<Option<NaiveDate>, ParseError> {
        let (column, value) = self.next(|k| k == ColumnKind::Date);
        value
            .map(|v| {
                NaiveDate::parse_from_str(v.trim(), DATE_FORMAT)
                    .map_err(|_| self.invalid(column, v, "date"))
            })
            .transpose()
    }

    fn integer(&mut self) -> Result<i64, ParseError> {
        let (column, value) = self.next(|k| k == ColumnKind::Integer);
        match value {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| self.invalid(column, v, "integer")),
            None => Ok(0),
        }
    }

    fn float(&mut self) -> Result<f64, ParseError> {
        let (column, value) = self.next(|k| k == ColumnKind::Float);
        match value {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| self.invalid(column, v, "number")),
            None => Ok(0.0),
        }
    }

    fn decimal(&mut self) -> Result<Decimal, ParseError> {
        let (column, value) = self.next(|k| k == ColumnKind::Decimal);
        match value {
            Some(v) => {
                let amount = Decimal::from_str(v.trim())
                    .or_else(|_| Decimal::from_scientific(v.trim()))
                    .map_err(|_| self.invalid(column, v.clone(), "decimal"))?
                    .round_dp(2);
                if stored_exactly(amount) {
                    Ok(amount)
                } else {
                    Err(self.invalid(column, v, "amount of at most 15 significant digits"))
                }
            }
            None => Ok(Decimal::ZERO),
        }
    }
}
