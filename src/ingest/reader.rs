use bigdecimal::BigDecimal;
use calamine::{open_workbook_auto, Data, DataType, Range, Reader, Xls, Xlsx};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::str::FromStr;

use crate::error::{PipelineError, Result};
use crate::models::{Cell, Table};

/// 上传文件格式 (按扩展名判断)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Xls,
}

impl SourceFormat {
    pub fn from_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" | "xlsm" => Ok(SourceFormat::Xlsx),
            "xls" => Ok(SourceFormat::Xls),
            _ => Err(PipelineError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// 从磁盘读取第一张工作表 / CSV
pub fn read_table(path: &Path) -> Result<Table> {
    let name = path.to_string_lossy().to_string();
    match SourceFormat::from_name(&name)? {
        SourceFormat::Csv => read_csv(File::open(path)?, &name),
        SourceFormat::Xlsx | SourceFormat::Xls => {
            let mut workbook = open_workbook_auto(path)?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| PipelineError::EmptyInput(name.clone()))??;
            range_to_table(&range, &name)
        }
    }
}

/// 从上传的字节读取
pub fn read_table_from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Table> {
    match SourceFormat::from_name(file_name)? {
        SourceFormat::Csv => read_csv(Cursor::new(bytes), file_name),
        SourceFormat::Xlsx => {
            let mut workbook: Xlsx<_> =
                Xlsx::new(Cursor::new(bytes)).map_err(calamine::Error::Xlsx)?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| PipelineError::EmptyInput(file_name.to_string()))?
                .map_err(calamine::Error::Xlsx)?;
            range_to_table(&range, file_name)
        }
        SourceFormat::Xls => {
            let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes)).map_err(calamine::Error::Xls)?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| PipelineError::EmptyInput(file_name.to_string()))?
                .map_err(calamine::Error::Xls)?;
            range_to_table(&range, file_name)
        }
    }
}

/// CSV: 首行为表头, 所有值读为文本 (数值转换在规范化阶段进行)
pub fn read_csv<R: Read>(reader: R, source: &str) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(PipelineError::EmptyInput(source.to_string()));
    }

    let mut table = Table::new(columns);
    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(Cell::text).collect());
    }

    tracing::debug!("读取 {}: {} 行", source, table.height());
    Ok(table)
}

fn range_to_table(range: &Range<Data>, source: &str) -> Result<Table> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| PipelineError::EmptyInput(source.to_string()))?;
    let columns: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.iter().map(data_to_cell).collect());
    }

    tracing::debug!("读取 {}: {} 行", source, table.height());
    Ok(table)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Int(i) => Cell::Number(BigDecimal::from(*i)),
        Data::Float(f) => BigDecimal::from_str(&f.to_string())
            .map(Cell::Number)
            .unwrap_or(Cell::Empty),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(_) => match data.as_datetime() {
            Some(dt) => Cell::Date(dt),
            None => Cell::text(data.to_string()),
        },
        other => Cell::text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(SourceFormat::from_name("a/B.CSV").unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_name("wb.xlsx").unwrap(), SourceFormat::Xlsx);
        assert!(matches!(
            SourceFormat::from_name("upload.zip"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn csv_reads_header_and_blank_fields() {
        let data = "\u{feff}Site Name , Spend (EUR)\nIN Chennai,\"60,000\"\nIN Hyderabad,\n";
        let table = read_csv(data.as_bytes(), "test.csv").unwrap();
        assert_eq!(table.columns(), &["Site Name".to_string(), "Spend (EUR)".to_string()]);
        assert_eq!(table.height(), 2);
        assert_eq!(table.cell(0, "Spend (EUR)"), Some(&Cell::text("60,000")));
        assert_eq!(table.cell(1, "Spend (EUR)"), Some(&Cell::Empty));
    }

    #[test]
    fn csv_bytes_go_through_same_path() {
        let table = read_table_from_bytes("po.csv", b"ITEM,VENDOR_NUM\nP1,5\n".to_vec()).unwrap();
        assert_eq!(table.cell(0, "ITEM"), Some(&Cell::text("P1")));
    }

    #[test]
    fn workbook_cells_map_to_typed_cells() {
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

        assert_eq!(
            data_to_cell(&Data::Float(60000.5)),
            Cell::Number(BigDecimal::from_str("60000.5").unwrap())
        );
        assert_eq!(data_to_cell(&Data::Int(5)), Cell::Number(BigDecimal::from(5)));
        assert_eq!(data_to_cell(&Data::Error(CellErrorType::Div0)), Cell::Empty);
        assert_eq!(data_to_cell(&Data::String("  ".to_string())), Cell::Empty);

        // 45323 = 2024-02-01
        let serial = Data::DateTime(ExcelDateTime::new(45323.0, ExcelDateTimeType::DateTime, false));
        match data_to_cell(&serial) {
            Cell::Date(d) => assert_eq!(d.date(), chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            other => panic!("expected date cell, got {:?}", other),
        }
    }

    #[test]
    fn first_range_row_is_header() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String(" ITEM ".to_string()));
        range.set_value((0, 1), Data::String("UNIT_PRICE".to_string()));
        range.set_value((1, 0), Data::String("P1".to_string()));
        range.set_value((1, 1), Data::Float(10.5));
        range.set_value((2, 0), Data::String("P2".to_string()));

        let table = range_to_table(&range, "wb.xlsx").unwrap();
        assert_eq!(table.columns(), &["ITEM".to_string(), "UNIT_PRICE".to_string()]);
        assert_eq!(table.height(), 2);
        assert_eq!(
            table.cell(0, "UNIT_PRICE"),
            Some(&Cell::Number(BigDecimal::from_str("10.5").unwrap()))
        );
        assert_eq!(table.cell(1, "UNIT_PRICE"), Some(&Cell::Empty));
    }

    #[test]
    fn empty_range_has_no_header() {
        let range: Range<Data> = Range::empty();
        assert!(matches!(
            range_to_table(&range, "blank.xlsx"),
            Err(PipelineError::EmptyInput(_))
        ));
    }

    #[test]
    fn corrupt_workbook_bytes_are_workbook_errors() {
        assert!(matches!(
            read_table_from_bytes("wb.xlsx", b"not a zip archive".to_vec()),
            Err(PipelineError::Workbook(_))
        ));
        assert!(matches!(
            read_table(Path::new("/nonexistent/procurement-recon/wb.xlsx")),
            Err(PipelineError::Workbook(_))
        ));
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert!(matches!(
            read_csv("".as_bytes(), "empty.csv"),
            Err(PipelineError::EmptyInput(_))
        ));
    }
}
