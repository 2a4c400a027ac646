use crate::domain::model::Dataset;
use crate::domain::ports::Storage;
use crate::utils::error::{EnrichError, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::{ReaderBuilder, WriterBuilder};
use rust_xlsxwriter::Workbook;
use chrono::Timelike;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and writes CSV/XLSX datasets relative to `base_path`. The output
/// format follows the output file's extension.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".".to_string())
    }
}

impl Storage for LocalStorage {
    async fn read_dataset(&self, path: &str) -> Result<Dataset> {
        let full_path = self.resolve(path);
        if !full_path.exists() {
            return Err(EnrichError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Input file not found: {}", full_path.display()),
            )));
        }

        match extension(&full_path).as_str() {
            "csv" => read_csv(&full_path),
            "xlsx" => read_xlsx(&full_path),
            other => Err(EnrichError::InvalidConfigValueError {
                field: "input".to_string(),
                value: path.to_string(),
                reason: format!("Unsupported input format '{}', expected csv or xlsx", other),
            }),
        }
    }

    async fn write_dataset(&self, path: &str, dataset: &Dataset) -> Result<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let ext = extension(&full_path);
        let data = match ext.as_str() {
            "csv" => csv_bytes(dataset)?,
            "xlsx" => xlsx_bytes(dataset)?,
            other => {
                return Err(EnrichError::InvalidConfigValueError {
                    field: "output".to_string(),
                    value: path.to_string(),
                    reason: format!("Unsupported output format '{}', expected csv or xlsx", other),
                })
            }
        };

        // 先寫暫存檔再改名，失敗時不留下半成品（輸出可覆蓋輸入檔）
        let tmp_path = full_path.with_extension(format!("{}.tmp", ext));
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &full_path)?;

        tracing::debug!("Wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }
}

pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn csv_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&dataset.headers)?;
    for row in &dataset.rows {
        let mut cells: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("")).collect();
        cells.resize(dataset.headers.len(), "");
        writer.write_record(&cells)?;
    }
    writer
        .into_inner()
        .map_err(|e| EnrichError::IoError(e.into_error()))
}

/// First worksheet, header row first. Cells that read back as the same
/// number are written as numbers, everything else as text.
fn xlsx_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in dataset.headers.iter().enumerate() {
        sheet.write_string(0, sheet_col(col)?, header)?;
    }
    for (idx, row) in dataset.rows.iter().enumerate() {
        let excel_row = sheet_row(idx + 1)?;
        for (col, cell) in row.iter().enumerate() {
            let Some(text) = cell else {
                continue;
            };
            match numeric_cell(text) {
                Some(number) => sheet.write_number(excel_row, sheet_col(col)?, number)?,
                None => sheet.write_string(excel_row, sheet_col(col)?, text)?,
            };
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn sheet_row(idx: usize) -> Result<u32> {
    u32::try_from(idx).map_err(|_| EnrichError::ProcessingError {
        message: format!("Row {} does not fit in a worksheet", idx),
    })
}

fn sheet_col(idx: usize) -> Result<u16> {
    u16::try_from(idx).map_err(|_| EnrichError::ProcessingError {
        message: format!("Column {} does not fit in a worksheet", idx),
    })
}

/// `"12345"` or `"44.44"` are numbers; `"00123"` or `"1e5"` stay text.
fn numeric_cell(text: &str) -> Option<f64> {
    let number: f64 = text.parse().ok()?;
    (number.is_finite() && number.to_string() == text).then_some(number)
}

/// Cell text as a user would see it. Whole floats lose the `.0`, date
/// cells become ISO dates instead of serial numbers.
fn xlsx_cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.num_seconds_from_midnight() == 0 => {
                Some(value.format("%Y-%m-%d").to_string())
            }
            Some(value) => Some(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(dt.as_f64().to_string()),
        },
        other => to_cell(&other.to_string()),
    }
}

fn to_cell(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn push_data_row(dataset: &mut Dataset, mut cells: Vec<Option<String>>, line: usize) {
    if cells.iter().all(Option::is_none) {
        return;
    }
    if cells.len() > dataset.headers.len() {
        tracing::warn!(
            "Row {} has {} cells but only {} headers, extra cells dropped",
            line,
            cells.len(),
            dataset.headers.len()
        );
        cells.truncate(dataset.headers.len());
    }
    dataset.push_row(cells);
}

fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut dataset = Dataset::new(headers);

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let cells = record.iter().map(to_cell).collect();
        push_data_row(&mut dataset, cells, idx + 2);
    }

    tracing::debug!("Read {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

fn read_xlsx(path: &Path) -> Result<Dataset> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EnrichError::ProcessingError {
            message: format!("Workbook {} has no worksheets", path.display()),
        })?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| EnrichError::ProcessingError {
        message: format!("Worksheet '{}' has no header row", sheet_name),
    })?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    let mut dataset = Dataset::new(headers);

    for (idx, data_row) in rows.enumerate() {
        let cells = data_row.iter().map(xlsx_cell_text).collect();
        push_data_row(&mut dataset, cells, idx + 2);
    }

    tracing::debug!(
        "Read {} rows from sheet '{}' of {}",
        dataset.len(),
        sheet_name,
        path.display()
    );
    Ok(dataset)
}
