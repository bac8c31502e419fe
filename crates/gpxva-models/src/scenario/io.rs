//! CSV import and export of scenario sets.
//!
//! Long format, one row per `(path, step)`:
//!
//! ```text
//! path,step,time,r_USD,r_EUR,fx_EUR,deflator
//! 0,0,0,0.03,0.02,1.1,1
//! 0,1,0.25,0.0312,0.0195,1.104,0.9922
//! ```
//!
//! Rows are ordered by path, then step. Every path must carry the same
//! time grid.

use std::io::{Read, Write};
use std::path::Path;

use gpxva_core::TimeGrid;
use log::info;
use ndarray::{Array2, Array3};

use super::ScenarioSet;
use crate::error::{ModelError, ModelResult};

const PATH_COLUMN: &str = "path";
const STEP_COLUMN: &str = "step";
const TIME_COLUMN: &str = "time";
const DEFLATOR_COLUMN: &str = "deflator";

/// Relative tolerance when comparing grids across paths.
const GRID_TOLERANCE: f64 = 1e-10;

struct Row {
    path: usize,
    step: usize,
    time: f64,
    factors: Vec<f64>,
    deflator: f64,
}

impl ScenarioSet {
    /// Writes the set as CSV to `path`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> ModelResult<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.to_writer(file)?;
        info!(
            "Wrote {} paths x {} steps to {}",
            self.n_paths(),
            self.n_steps(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Reads a set written by [`ScenarioSet::write_csv`] or an external
    /// simulator using the same layout.
    pub fn read_csv(path: impl AsRef<Path>) -> ModelResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let set = Self::from_reader(file)?;
        info!(
            "Loaded {} paths x {} steps from {}",
            set.n_paths(),
            set.n_steps(),
            path.as_ref().display()
        );
        Ok(set)
    }

    /// Writes CSV to any writer.
    pub fn to_writer<W: Write>(&self, writer: W) -> ModelResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut header = vec![
            PATH_COLUMN.to_string(),
            STEP_COLUMN.to_string(),
            TIME_COLUMN.to_string(),
        ];
        header.extend(self.factor_names.iter().cloned());
        header.push(DEFLATOR_COLUMN.to_string());
        csv.write_record(&header)?;

        for p in 0..self.n_paths() {
            for s in 0..self.n_steps() {
                let mut record = Vec::with_capacity(header.len());
                record.push(p.to_string());
                record.push(s.to_string());
                record.push(self.grid.time(s).to_string());
                record.extend(self.values.slice(ndarray::s![p, s, ..]).iter().map(f64::to_string));
                record.push(self.deflators[[p, s]].to_string());
                csv.write_record(&record)?;
            }
        }
        csv.flush()?;
        Ok(())
    }

    /// Reads CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> ModelResult<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let factor_names = parse_header(csv.headers()?)?;
        let width = factor_names.len() + 4;

        let mut rows = Vec::new();
        for (i, record) in csv.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = i + 2;
            if record.len() != width {
                return Err(ModelError::scenario(format!(
                    "line {line}: expected {width} fields, got {}",
                    record.len()
                )));
            }
            let index = |k: usize| -> ModelResult<usize> {
                record[k].parse().map_err(|_| {
                    ModelError::scenario(format!("line {line}: bad index '{}'", &record[k]))
                })
            };
            let number = |k: usize| -> ModelResult<f64> {
                record[k].parse().map_err(|_| {
                    ModelError::scenario(format!("line {line}: bad number '{}'", &record[k]))
                })
            };
            rows.push(Row {
                path: index(0)?,
                step: index(1)?,
                time: number(2)?,
                factors: (3..width - 1).map(number).collect::<ModelResult<_>>()?,
                deflator: number(width - 1)?,
            });
        }
        assemble(factor_names, &rows)
    }
}

fn parse_header(header: &csv::StringRecord) -> ModelResult<Vec<String>> {
    let fields: Vec<&str> = header.iter().collect();
    if fields.len() < 5
        || fields[0] != PATH_COLUMN
        || fields[1] != STEP_COLUMN
        || fields[2] != TIME_COLUMN
        || fields[fields.len() - 1] != DEFLATOR_COLUMN
    {
        return Err(ModelError::scenario(format!(
            "header must be '{PATH_COLUMN},{STEP_COLUMN},{TIME_COLUMN},<factors...>,{DEFLATOR_COLUMN}', got '{}'",
            fields.join(",")
        )));
    }
    Ok(fields[3..fields.len() - 1]
        .iter()
        .map(|s| (*s).to_string())
        .collect())
}

fn assemble(factor_names: Vec<String>, rows: &[Row]) -> ModelResult<ScenarioSet> {
    if rows.is_empty() {
        return Err(ModelError::scenario("no data rows"));
    }
    let n_steps = rows.iter().take_while(|r| r.path == 0).count();
    if n_steps == 0 || rows.len() % n_steps != 0 {
        return Err(ModelError::scenario(format!(
            "{} rows do not split into paths of {n_steps} steps",
            rows.len()
        )));
    }
    let n_paths = rows.len() / n_steps;
    let n_factors = factor_names.len();
    let times: Vec<f64> = rows[..n_steps].iter().map(|r| r.time).collect();

    let mut values = Array3::zeros((n_paths, n_steps, n_factors));
    let mut deflators = Array2::zeros((n_paths, n_steps));
    for (k, row) in rows.iter().enumerate() {
        let (p, s) = (k / n_steps, k % n_steps);
        if row.path != p || row.step != s {
            return Err(ModelError::scenario(format!(
                "expected path {p} step {s}, found path {} step {}",
                row.path, row.step
            )));
        }
        let tol = GRID_TOLERANCE * times[s].abs().max(1.0);
        if (row.time - times[s]).abs() > tol {
            return Err(ModelError::scenario(format!(
                "path {p} step {s}: time {} differs from path 0 time {}",
                row.time, times[s]
            )));
        }
        for (f, v) in row.factors.iter().enumerate() {
            values[[p, s, f]] = *v;
        }
        deflators[[p, s]] = row.deflator;
    }

    let grid = TimeGrid::from_times(times)?;
    ScenarioSet::new(grid, factor_names, values, deflators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "path,step,time,r_USD,deflator
0,0,0,0.03,1
0,1,0.5,0.031,0.985
1,0,0,0.03,1
1,1,0.5,0.029,0.986
";

    #[test]
    fn test_parse_sample() {
        let set = ScenarioSet::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!((set.n_paths(), set.n_steps(), set.n_factors()), (2, 2, 1));
        assert_eq!(set.factor_names(), &["r_USD".to_string()]);
        assert_relative_eq!(set.path_state(1, 1)[0], 0.029);
        assert_relative_eq!(set.deflator(0, 1), 0.985);
        assert_relative_eq!(set.grid().time(1), 0.5);
    }

    #[test]
    fn test_round_trip_is_exact() {
        let set = ScenarioSet::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut buf = Vec::new();
        set.to_writer(&mut buf).unwrap();
        let back = ScenarioSet::from_reader(buf.as_slice()).unwrap();
        assert_eq!(back.values(), set.values());
        assert_eq!(back.deflators(), set.deflators());
    }

    #[test]
    fn test_bad_header() {
        let data = "p,step,time,r_USD,deflator\n0,0,0,0.03,1\n";
        assert!(ScenarioSet::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_inconsistent_grid() {
        let data = "path,step,time,r_USD,deflator
0,0,0,0.03,1
0,1,0.5,0.031,0.985
1,0,0,0.03,1
1,1,0.75,0.029,0.986
";
        let err = ScenarioSet::from_reader(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("differs"));
    }

    #[test]
    fn test_missing_step() {
        let data = "path,step,time,r_USD,deflator
0,0,0,0.03,1
0,1,0.5,0.031,0.985
1,1,0.5,0.029,0.986
";
        assert!(ScenarioSet::from_reader(data.as_bytes()).is_err());
    }
}
