//! Mean-price aggregation over the historical FIPE price table.
//!
//! Streams a CSV source once, resolves the relevant columns by header name,
//! accumulates a running sum and count per (model year, brand) pair, and
//! produces an ordered year → brand → mean report.

use crate::error::AggregateError;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Model-year column in the FIPE export.
pub const YEAR_COLUMN: &str = "anoModelo";
/// Brand column in the FIPE export.
pub const BRAND_COLUMN: &str = "marca";
/// Price column in the FIPE export.
pub const PRICE_COLUMN: &str = "valor";

/// Resolved positions of the three required columns.
///
/// The FIPE export carries a leading unnamed index column, so positions must
/// be looked up by name rather than assumed.
struct Columns {
    year: usize,
    brand: usize,
    price: usize,
}

impl Columns {
    fn resolve(header: &csv::StringRecord) -> Result<Self, AggregateError> {
        let index: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        let position = |name: &'static str| {
            index
                .get(name)
                .copied()
                .ok_or(AggregateError::MissingColumn(name))
        };

        Ok(Columns {
            year: position(YEAR_COLUMN)?,
            brand: position(BRAND_COLUMN)?,
            price: position(PRICE_COLUMN)?,
        })
    }
}

/// One valid data row after extraction and normalization.
struct ParsedRow {
    year: i32,
    brand: String,
    price: f64,
}

/// Validates and normalizes one CSV record.
///
/// Returns `None` for rows excluded from the aggregate: rows missing a
/// required field, rows with an empty required value after trimming, and
/// rows whose year or price does not parse.
fn parse_row(record: &csv::StringRecord, columns: &Columns) -> Option<ParsedRow> {
    let year = record.get(columns.year)?.trim();
    let brand = record.get(columns.brand)?.trim();
    let price = record.get(columns.price)?.trim();

    if year.is_empty() || brand.is_empty() || price.is_empty() {
        return None;
    }

    let year: i32 = year.parse().ok()?;
    let price = parse_price(price)?;

    Some(ParsedRow {
        year,
        brand: brand.to_string(),
        price,
    })
}

/// Parses a raw price value, tolerating common noise in the historical data:
/// embedded spaces and non-breaking spaces are stripped, and a comma decimal
/// separator is accepted.
fn parse_price(raw: &str) -> Option<f64> {
    let normalized: String = raw
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{00A0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    normalized.parse().ok()
}

/// Rounds to two decimal places, half away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Running sum and count for one (year, brand) bucket.
#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: u64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Mean prices grouped by model year, then by brand.
///
/// The grouping is held as an explicit ordered structure rather than a map:
/// years ascend numerically, brands ascend lexically within each year, and
/// serialization preserves exactly that order. Every year present holds at
/// least one brand.
#[derive(Debug, PartialEq)]
pub struct MeanPriceReport {
    years: Vec<YearMeans>,
}

#[derive(Debug, PartialEq)]
struct YearMeans {
    year: i32,
    brands: Vec<(String, f64)>,
}

impl MeanPriceReport {
    fn from_accumulators(accumulators: HashMap<(i32, String), Accumulator>) -> Self {
        let mut entries: Vec<_> = accumulators.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut years: Vec<YearMeans> = Vec::new();
        for ((year, brand), acc) in entries {
            let mean = round2(acc.mean());
            match years.last_mut() {
                Some(group) if group.year == year => group.brands.push((brand, mean)),
                _ => years.push(YearMeans {
                    year,
                    brands: vec![(brand, mean)],
                }),
            }
        }

        MeanPriceReport { years }
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Model years present in the report, in ascending order.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.iter().map(|group| group.year)
    }

    /// Brands recorded for a year, in ascending lexical order.
    pub fn brands(&self, year: i32) -> impl Iterator<Item = &str> + '_ {
        self.years
            .iter()
            .filter(move |group| group.year == year)
            .flat_map(|group| group.brands.iter().map(|(brand, _)| brand.as_str()))
    }

    /// The rounded mean price for one (year, brand) pair, if present.
    pub fn mean_price(&self, year: i32, brand: &str) -> Option<f64> {
        let group = self.years.iter().find(|group| group.year == year)?;
        group
            .brands
            .iter()
            .find(|(b, _)| b == brand)
            .map(|(_, mean)| *mean)
    }
}

impl Serialize for MeanPriceReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.years.len()))?;
        for group in &self.years {
            map.serialize_entry(&group.year.to_string(), &BrandMeans(&group.brands))?;
        }
        map.end()
    }
}

struct BrandMeans<'a>(&'a [(String, f64)]);

impl Serialize for BrandMeans<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (brand, mean) in self.0 {
            map.serialize_entry(brand, mean)?;
        }
        map.end()
    }
}

/// Aggregates mean prices per (model year, brand) from a CSV source with a
/// header row.
///
/// Consumes the source strictly once, top to bottom. Memory use is bounded
/// by the number of distinct (year, brand) pairs, not by the row count.
///
/// # Errors
///
/// Returns [`AggregateError::NoHeader`] for an empty source and
/// [`AggregateError::MissingColumn`] when the header lacks one of
/// [`YEAR_COLUMN`], [`BRAND_COLUMN`], [`PRICE_COLUMN`]. Row-level problems
/// never fail the call; those rows are skipped.
pub fn aggregate<R: Read>(source: R) -> Result<MeanPriceReport, AggregateError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);

    let header = reader
        .headers()
        .map_err(|_| AggregateError::NoHeader)?
        .clone();
    if header.is_empty() {
        return Err(AggregateError::NoHeader);
    }

    let columns = Columns::resolve(&header)?;

    let mut accumulators: HashMap<(i32, String), Accumulator> = HashMap::new();

    for record in reader.records() {
        let Ok(record) = record else { continue };
        let Some(row) = parse_row(&record, &columns) else {
            continue;
        };

        accumulators
            .entry((row.year, row.brand))
            .or_default()
            .add(row.price);
    }

    Ok(MeanPriceReport::from_accumulators(accumulators))
}

/// Opens `path` and aggregates its contents. See [`aggregate`].
pub fn aggregate_file(path: impl AsRef<Path>) -> Result<MeanPriceReport, AggregateError> {
    let file = File::open(path)?;
    aggregate(file)
}
