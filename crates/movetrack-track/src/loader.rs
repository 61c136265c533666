//! Delimited track file loader
//!
//! Rows missing a timestamp, a coordinate or an individual identifier are
//! dropped and counted in a [`LoadReport`]; they never reach the analyzers.
//! Records the reader cannot decode are skipped and counted the same way.

use crate::config::LoaderConfig;
use crate::types::{Relocation, Track};
use csv::{ReaderBuilder, StringRecord};
use movetrack_core::time::parse_timestamp;
use movetrack_core::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Tokens treated as a missing value
const MISSING_TOKENS: &[&str] = &["", "NA", "NaN", "nan", "null", "NULL"];

/// Counts of rows read, kept and dropped while loading a track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub missing_timestamp: usize,
    pub invalid_timestamp: usize,
    pub missing_coordinates: usize,
    pub invalid_coordinates: usize,
    pub missing_individual: usize,
    /// Records the reader could not decode (invalid UTF-8, broken quoting)
    pub malformed_rows: usize,
    /// Covariate cells that were missing or unparsable (stored as NaN, row kept)
    pub missing_covariates: usize,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Track load report:")?;
        writeln!(f, "  Rows read: {}", self.rows_read)?;
        writeln!(f, "  Rows kept: {}", self.rows_kept)?;
        writeln!(f, "  Missing timestamp: {}", self.missing_timestamp)?;
        writeln!(f, "  Unparsable timestamp: {}", self.invalid_timestamp)?;
        writeln!(f, "  Missing coordinates: {}", self.missing_coordinates)?;
        writeln!(f, "  Invalid coordinates: {}", self.invalid_coordinates)?;
        writeln!(f, "  Missing individual: {}", self.missing_individual)?;
        writeln!(f, "  Malformed rows: {}", self.malformed_rows)?;
        write!(f, "  Missing covariate values: {}", self.missing_covariates)
    }
}

enum RowOutcome {
    Kept(Relocation),
    MissingTimestamp,
    InvalidTimestamp,
    MissingCoordinates,
    InvalidCoordinates,
    MissingIndividual,
}

struct ColumnIndex {
    timestamp: usize,
    longitude: usize,
    latitude: usize,
    individual: usize,
    tag: Option<usize>,
    covariates: Vec<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, config: &LoaderConfig) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                Error::Configuration(format!("required column '{name}' not found in header"))
            })
        };

        Ok(Self {
            timestamp: require(&config.timestamp_column)?,
            longitude: require(&config.longitude_column)?,
            latitude: require(&config.latitude_column)?,
            individual: require(&config.individual_column)?,
            tag: find(&config.tag_column),
            covariates: config
                .covariate_columns
                .iter()
                .map(|c| require(c))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

fn field<'a>(record: &'a StringRecord, index: usize) -> Option<&'a str> {
    record
        .get(index)
        .map(str::trim)
        .filter(|v| !MISSING_TOKENS.contains(v))
}

/// Reads delimited track files into a [`Track`]
#[derive(Debug, Clone, Default)]
pub struct TrackLoader {
    config: LoaderConfig,
}

impl TrackLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a track from a file path
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<(Track, LoadReport)> {
        let file = File::open(path.as_ref())?;
        self.from_reader(file)
    }

    /// Load a track from any reader
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<(Track, LoadReport)> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let columns = ColumnIndex::resolve(&headers, &self.config)?;

        let mut report = LoadReport::default();
        let mut records = Vec::new();

        for row in csv_reader.records() {
            report.rows_read += 1;
            let row = match row {
                Ok(row) => row,
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "skipping malformed row");
                    report.malformed_rows += 1;
                    continue;
                }
            };
            match self.parse_row(&row, &columns, &mut report) {
                RowOutcome::Kept(relocation) => records.push(relocation),
                RowOutcome::MissingTimestamp => report.missing_timestamp += 1,
                RowOutcome::InvalidTimestamp => report.invalid_timestamp += 1,
                RowOutcome::MissingCoordinates => report.missing_coordinates += 1,
                RowOutcome::InvalidCoordinates => report.invalid_coordinates += 1,
                RowOutcome::MissingIndividual => report.missing_individual += 1,
            }
        }
        report.rows_kept = records.len();

        if report.rows_dropped() > 0 {
            warn!(
                dropped = report.rows_dropped(),
                read = report.rows_read,
                "dropped incomplete or malformed rows"
            );
        }
        if report.missing_covariates > 0 {
            warn!(cells = report.missing_covariates, "covariate values missing, stored as NaN");
        }
        info!(rows = report.rows_kept, "loaded track");

        let track = Track::new(records, self.config.covariate_columns.clone())?;
        Ok((track, report))
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        columns: &ColumnIndex,
        report: &mut LoadReport,
    ) -> RowOutcome {
        let Some(raw_timestamp) = field(row, columns.timestamp) else {
            return RowOutcome::MissingTimestamp;
        };
        let (Some(raw_lon), Some(raw_lat)) =
            (field(row, columns.longitude), field(row, columns.latitude))
        else {
            return RowOutcome::MissingCoordinates;
        };
        let Some(individual_id) = field(row, columns.individual) else {
            return RowOutcome::MissingIndividual;
        };

        let Ok(timestamp) = parse_timestamp(raw_timestamp, &self.config.timestamp_formats) else {
            return RowOutcome::InvalidTimestamp;
        };
        let (Ok(longitude), Ok(latitude)) = (raw_lon.parse::<f64>(), raw_lat.parse::<f64>()) else {
            return RowOutcome::InvalidCoordinates;
        };
        if !longitude.is_finite()
            || !latitude.is_finite()
            || !(-180.0..=180.0).contains(&longitude)
            || !(-90.0..=90.0).contains(&latitude)
        {
            return RowOutcome::InvalidCoordinates;
        }

        let covariates = columns
            .covariates
            .iter()
            .map(|&c| match field(row, c).and_then(|v| v.parse::<f64>().ok()) {
                Some(value) => value,
                None => {
                    report.missing_covariates += 1;
                    f64::NAN
                }
            })
            .collect();

        RowOutcome::Kept(Relocation {
            individual_id: individual_id.to_string(),
            tag_id: columns.tag.and_then(|t| field(row, t)).map(str::to_string),
            timestamp,
            longitude,
            latitude,
            covariates,
        })
    }
}
