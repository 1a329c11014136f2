use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::error::{PipelineError, Result};
use crate::models::{Cell, Table};

/// 源列名 -> 规范列名 (有序)
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    entries: Vec<(String, String)>,
}

impl SchemaMapping {
    pub fn new<S: Into<String>, T: Into<String>>(entries: impl IntoIterator<Item = (S, T)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .collect(),
        }
    }

    /// 源列名即规范列名
    pub fn identity<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            entries: columns
                .into_iter()
                .map(|c| {
                    let c = c.into();
                    (c.clone(), c)
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// 缺失的源列 (按映射顺序)
    pub fn missing_in(&self, table: &Table) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(source, _)| table.column_index(source.trim()).is_none())
            .map(|(source, _)| source.clone())
            .collect()
    }
}

/// 校验 + 重命名 + 数值转换; 未映射的列原样保留
pub fn normalize(table: &Table, mapping: &SchemaMapping) -> Result<Table> {
    let missing = mapping.missing_in(table);
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let mut out = table.clone();
    for column in out.columns_mut().iter_mut() {
        let trimmed = column.trim().to_string();
        let renamed = mapping
            .entries()
            .iter()
            .find(|(source, _)| source.trim() == trimmed)
            .map(|(_, canonical)| canonical.clone());
        *column = renamed.unwrap_or(trimmed);
    }
    coerce_numeric_columns(&mut out);
    Ok(out)
}

/// 同 normalize, 但只保留映射中的列, 按映射顺序
pub fn normalize_select(table: &Table, mapping: &SchemaMapping) -> Result<Table> {
    let missing = mapping.missing_in(table);
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let indices: Vec<usize> = mapping
        .entries()
        .iter()
        .filter_map(|(source, _)| table.column_index(source.trim()))
        .collect();
    let columns = mapping
        .entries()
        .iter()
        .map(|(_, canonical)| canonical.clone())
        .collect();
    let rows = table
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();

    let mut out = Table::with_rows(columns, rows);
    coerce_numeric_columns(&mut out);
    Ok(out)
}

/// 解析带千分位的数字文本
pub fn parse_number(text: &str) -> Option<BigDecimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    BigDecimal::from_str(&cleaned).ok()
}

/// 对含文本的列尝试整体转为数值; 任一文本单元格解析失败则该列保持原样
fn coerce_numeric_columns(table: &mut Table) {
    let width = table.columns().len();
    for idx in 0..width {
        let has_text = table
            .column_values(idx)
            .any(|c| matches!(c, Cell::Text(_)));
        if !has_text {
            continue;
        }

        let mut parsed: Vec<Option<BigDecimal>> = Vec::with_capacity(table.height());
        let mut convertible = true;
        for cell in table.column_values(idx) {
            match cell {
                Cell::Text(s) => match parse_number(s) {
                    Some(n) => parsed.push(Some(n)),
                    None => {
                        convertible = false;
                        break;
                    }
                },
                _ => parsed.push(None),
            }
        }

        if !convertible {
            tracing::debug!("列 '{}' 保持文本 (数值转换失败)", table.columns()[idx]);
            continue;
        }

        for (row, value) in table.rows_mut().iter_mut().zip(parsed) {
            if let Some(n) = value {
                row[idx] = Cell::Number(n);
            }
        }
    }
}
