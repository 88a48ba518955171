//! History Store
//!
//! The system's only persistent state: an immutable seed dataset plus an
//! append-only prediction log. `load()` reads both fresh on every call and
//! returns them newest-first (log entries reversed, then seed rows
//! reversed; seed data is considered older than any prediction).
//!
//! Single-writer, single-process: no file locking is attempted.

use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use penguin_common::config::DataPaths;
use penguin_common::features::{SPECIES_COLUMN, TIMESTAMP_COLUMN};
use penguin_common::{Error, Island, NumericFeature, Observation, Result, Sex, Species};

// ========================================
// Raw tables
// ========================================

/// Header-bearing table of optional string cells
///
/// Missing cells (empty, `NA`, `NaN`) are stored as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Read a CSV file
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("No data found at {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|cell| (!is_missing(cell)).then(|| cell.to_string()))
                    .collect(),
            );
        }

        Ok(Self { columns, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| Error::InvalidInput(format!("Dataset is missing column '{}'", name)))
    }
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan")
}

/// Drop rows missing any numeric feature or the label, and drop the timestamp column
///
/// A row missing only the timestamp is kept.
pub fn clean_data(raw: RawTable) -> Result<RawTable> {
    let mut required = NumericFeature::ALL
        .iter()
        .map(|f| raw.require_column(f.name()))
        .collect::<Result<Vec<_>>>()?;
    required.push(raw.require_column(SPECIES_COLUMN)?);

    let drop_index = raw.column_index(TIMESTAMP_COLUMN);
    let keep = |i: &usize| Some(*i) != drop_index;

    let columns = (0..raw.columns.len())
        .filter(keep)
        .map(|i| raw.columns[i].clone())
        .collect();

    let rows = raw
        .rows
        .into_iter()
        .filter(|row| {
            required
                .iter()
                .all(|&i| row.get(i).map_or(false, Option::is_some))
        })
        .map(|row| {
            row.into_iter()
                .enumerate()
                .filter(|(i, _)| keep(i))
                .map(|(_, cell)| cell)
                .collect()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

/// Convert a cleaned table into observations
///
/// Rows whose island, species, sex or numbers cannot be interpreted are
/// skipped with a warning.
pub fn to_observations(table: &RawTable) -> Result<Vec<Observation>> {
    let island_idx = table.require_column("island")?;
    let species_idx = table.require_column(SPECIES_COLUMN)?;
    let sex_idx = table.column_index("sex");
    let numeric_idx = NumericFeature::ALL
        .iter()
        .map(|f| table.require_column(f.name()))
        .collect::<Result<Vec<_>>>()?;

    let mut observations = Vec::with_capacity(table.rows.len());
    for (line, row) in table.rows.iter().enumerate() {
        match parse_row(row, island_idx, species_idx, sex_idx, &numeric_idx) {
            Some(observation) => observations.push(observation),
            None => warn!(row = line + 1, "Skipping uninterpretable dataset row"),
        }
    }
    Ok(observations)
}

fn parse_row(
    row: &[Option<String>],
    island_idx: usize,
    species_idx: usize,
    sex_idx: Option<usize>,
    numeric_idx: &[usize],
) -> Option<Observation> {
    let cell = |i: usize| row.get(i).and_then(|c| c.as_deref());

    let island = cell(island_idx)?.parse::<Island>().ok()?;
    let species = cell(species_idx)?.parse::<Species>().ok()?;
    let sex = match sex_idx.and_then(cell) {
        None => None,
        Some(raw) => Some(raw.parse::<Sex>().ok()?),
    };

    let mut values = [0.0; 4];
    for (slot, &i) in values.iter_mut().zip(numeric_idx) {
        *slot = cell(i)?.parse::<f64>().ok()?;
    }
    let [bill_length_mm, bill_depth_mm, flipper_length_mm, body_mass_g] = values;

    Some(Observation {
        species: Some(species),
        island,
        bill_length_mm,
        bill_depth_mm,
        flipper_length_mm,
        body_mass_g,
        sex,
    })
}

/// Read, clean and convert a labelled dataset file
pub fn load_labelled(path: &Path) -> Result<Vec<Observation>> {
    to_observations(&clean_data(RawTable::read(path)?)?)
}

// ========================================
// Store
// ========================================

/// Seed dataset + prediction log
#[derive(Debug, Clone)]
pub struct HistoryStore {
    seed_path: PathBuf,
    log_path: PathBuf,
}

impl HistoryStore {
    pub fn new(seed_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            seed_path: seed_path.into(),
            log_path: log_path.into(),
        }
    }

    pub fn from_paths(paths: &DataPaths) -> Self {
        Self::new(&paths.seed, &paths.history)
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Full history, most recent record first
    pub fn load(&self) -> Result<Vec<Observation>> {
        let seed = load_labelled(&self.seed_path)?;
        let log = self.load_log()?;
        debug!(seed = seed.len(), predictions = log.len(), "Loaded history");

        let mut history = seed;
        history.extend(log);
        history.reverse();
        Ok(history)
    }

    /// Prediction log in insertion order; an absent log is empty
    pub fn load_log(&self) -> Result<Vec<Observation>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }
        let table = RawTable::read(&self.log_path)?;
        if table.columns.is_empty() {
            return Ok(Vec::new());
        }
        to_observations(&clean_data(table)?)
    }

    /// Append one classified record to the prediction log
    ///
    /// Creates the file (and header) on first use.
    pub fn append(&self, observation: &Observation) -> Result<()> {
        if observation.species.is_none() {
            return Err(Error::InvalidInput(
                "Only classified observations can be added to the history".to_string(),
            ));
        }

        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let needs_header = std::fs::metadata(&self.log_path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(observation)?;
        writer.flush()?;

        debug!(path = %self.log_path.display(), "Appended prediction to history");
        Ok(())
    }
}
