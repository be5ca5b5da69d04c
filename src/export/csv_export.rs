//! CSV export of bar tables and design matrices.
//!
//! Floats are written in their shortest round-trip form; missing design
//! cells are written as empty fields and read back as `None`.

use super::file_stem;
use crate::alignment::{level_column, BarFrame, DesignMatrix, INTEGRATED_COLUMN};
use crate::error::{OfiError, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Name of the index column in design CSVs.
pub const INDEX_COLUMN: &str = "bar_start_ns";

/// CSV exporter writing into one directory.
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Write `{SYM}_bars.csv` and return its path.
    pub fn export_frame(&self, frame: &BarFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{}_bars.csv", file_stem(&frame.symbol)));
        write_bars(frame, File::create(&path)?)?;
        log::info!("wrote {} bars to {}", frame.len(), path.display());
        Ok(path)
    }

    /// Write `design_matrix.csv` and return its path.
    pub fn export_design(&self, design: &DesignMatrix) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("design_matrix.csv");
        write_design(design, File::create(&path)?)?;
        log::info!("wrote design matrix to {}", path.display());
        Ok(path)
    }
}

/// Write one symbol's bars as CSV.
///
/// Columns: `start_ns, end_ns, message_count, trade_count`, then per level
/// `ofi_NN`, `raw_ofi_NN`, `depth_NN`, then `ofi_integrated`.
pub fn write_bars<W: Write>(frame: &BarFrame, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let levels = frame.levels;

    let mut header = vec![
        "start_ns".to_string(),
        "end_ns".to_string(),
        "message_count".to_string(),
        "trade_count".to_string(),
    ];
    header.extend((0..levels).map(level_column));
    header.extend((0..levels).map(|m| format!("raw_{}", level_column(m))));
    header.extend((0..levels).map(|m| format!("depth_{m:02}")));
    header.push(INTEGRATED_COLUMN.to_string());
    wtr.write_record(&header)?;

    for bar in &frame.bars {
        let mut record = vec![
            bar.start_ns.to_string(),
            bar.end_ns.to_string(),
            bar.message_count.to_string(),
            bar.trade_count.to_string(),
        ];
        let cells = |values: &[f64]| -> Vec<String> {
            (0..levels)
                .map(|m| values.get(m).copied().unwrap_or(0.0).to_string())
                .collect()
        };
        record.extend(cells(&bar.normalized_ofi));
        record.extend(cells(&bar.ofi));
        record.extend(cells(&bar.avg_depth));
        record.push(bar.integrated_ofi.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write a design matrix as CSV, gaps as empty fields.
pub fn write_design<W: Write>(design: &DesignMatrix, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(design.n_cols() + 1);
    header.push(INDEX_COLUMN);
    header.extend(design.columns().iter().map(String::as_str));
    wtr.write_record(&header)?;

    for (row, ts) in design.index().iter().enumerate() {
        let mut record = Vec::with_capacity(design.n_cols() + 1);
        record.push(ts.to_string());
        record.extend(
            design
                .row(row)
                .into_iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read a design matrix written by [`write_design`].
pub fn read_design<R: Read>(reader: R) -> Result<DesignMatrix> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.get(0) != Some(INDEX_COLUMN) {
        return Err(OfiError::malformed(0, INDEX_COLUMN));
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut index = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); columns.len()];

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let ts = record
            .get(0)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| OfiError::malformed(row, INDEX_COLUMN))?;
        index.push(ts);

        for (c, column) in columns.iter().enumerate() {
            let cell = record.get(c + 1).map(str::trim).unwrap_or("");
            let value = if cell.is_empty() {
                None
            } else {
                Some(
                    cell.parse::<f64>()
                        .map_err(|_| OfiError::malformed(row, column.clone()))?,
                )
            };
            values[c].push(value);
        }
    }

    DesignMatrix::new(index, columns, values)
}

/// Read a design matrix CSV file.
pub fn read_design_csv<P: AsRef<Path>>(path: P) -> Result<DesignMatrix> {
    read_design(File::open(path)?)
}
