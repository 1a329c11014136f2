use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::models::{ReconciledLine, ReconciliationReport, Table};

fn write_table<W: Write>(writer: &mut Writer<W>, table: &Table) -> Result<()> {
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_reconciled<W: Write>(writer: &mut Writer<W>, report: &ReconciliationReport) -> Result<()> {
    writer.write_record(ReconciledLine::headers(&report.reference_currency))?;
    for line in &report.lines {
        writer.write_record(line.record())?;
    }
    writer.flush()?;
    Ok(())
}

/// 结果表 -> CSV 字节 (下载用)
pub fn table_to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    write_table(&mut writer, table)?;
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// 对账结果 -> CSV 字节
pub fn reconciled_to_csv(report: &ReconciliationReport) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    write_reconciled(&mut writer, report)?;
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// 导出结果表到 CSV 文件
pub fn export_to_csv(table: &Table, output_path: &Path) -> Result<()> {
    let mut writer = Writer::from_writer(File::create(output_path)?);
    write_table(&mut writer, table)
}

/// 导出对账结果到 CSV 文件
pub fn export_reconciled_to_csv(report: &ReconciliationReport, output_path: &Path) -> Result<()> {
    let mut writer = Writer::from_writer(File::create(output_path)?);
    write_reconciled(&mut writer, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    #[test]
    fn table_csv_has_header_and_rows() {
        let table = Table::with_rows(
            vec!["Part Number".into(), "Total Opportunity".into()],
            vec![
                vec![Cell::text("P-1"), Cell::Number("-6000.00".parse().unwrap())],
                vec![Cell::text("P, 2"), Cell::Empty],
            ],
        );
        let text = String::from_utf8(table_to_csv(&table).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Part Number,Total Opportunity");
        assert_eq!(lines[1], "P-1,-6000.00");
        assert_eq!(lines[2], "\"P, 2\",");
    }

    #[test]
    fn empty_report_still_writes_header() {
        let report = ReconciliationReport {
            reference_currency: "EUR".to_string(),
            lines: Vec::new(),
            warning: None,
        };
        let text = String::from_utf8(reconciled_to_csv(&report).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("IMPACT_EUR"));
    }
}
