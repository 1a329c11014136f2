use bigdecimal::BigDecimal;
use chrono::{NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// 单元格 (类型化)
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(BigDecimal),
    Date(NaiveDateTime),
}

impl Cell {
    /// 文本单元格, 空白字符串视为 Empty
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn number(n: BigDecimal) -> Self {
        Cell::Number(n)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_number(&self) -> Option<&BigDecimal> {
        match self {
            Cell::Number(n) => Some(n),
            _ => None,
        }
    }

    /// 文本形式 (数字按十进制输出)
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// 连接键: 数字去掉尾随零 (5 与 5.0 与 "5" 相等); 文本只去空白, "0012" 与 "12" 不同
    pub fn key(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.normalized().to_string(),
            Cell::Date(d) => d.to_string(),
        }
    }

    /// 数值保留两位小数, 其余类型原样返回
    pub fn rounded(&self) -> Cell {
        match self {
            Cell::Number(n) => Cell::Number(round2(n)),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Date(d) => {
                if d.hour() == 0 && d.minute() == 0 && d.second() == 0 {
                    write!(f, "{}", d.date())
                } else {
                    write!(f, "{}", d)
                }
            }
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// 两位小数舍入
pub fn round2(n: &BigDecimal) -> BigDecimal {
    n.round(2)
}

/// 配置中的浮点阈值转为十进制 (取最短表示, 0.93 -> 0.93)
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// 内存表: 有序列名 + 行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 行长度与列数不一致时补 Empty / 截断
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().filter_map(move |r| r.get(idx))
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<String> {
        &mut self.columns
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Cell>> {
        &mut self.rows
    }

    /// 所有数值单元格保留两位小数
    pub fn round_numbers(&self) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|r| r.iter().map(Cell::rounded).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn key_treats_numeric_forms_alike() {
        assert_eq!(Cell::Number(dec("5")).key(), Cell::Number(dec("5.00")).key());
        assert_eq!(Cell::text("5").key(), Cell::Number(dec("5.0")).key());
        assert_eq!(Cell::text(" P1 ").key(), "P1");
    }

    #[test]
    fn key_keeps_leading_zero_ids_distinct() {
        assert_ne!(Cell::text("0012").key(), Cell::text("12").key());
        assert_ne!(Cell::text("0012").key(), Cell::Number(dec("12")).key());
        assert_ne!(Cell::text("1E3").key(), Cell::Number(dec("1000")).key());
        assert_eq!(Cell::text("12").key(), Cell::Number(dec("12.00")).key());
    }

    #[test]
    fn blank_text_is_empty() {
        assert!(Cell::text("   ").is_empty());
        assert!(!Cell::text("x").is_empty());
    }

    #[test]
    fn rounding_twice_equals_once() {
        let table = Table::with_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Cell::Number(dec("10.4567")), Cell::text("x")]],
        );
        let once = table.round_numbers();
        let twice = once.round_numbers();
        assert_eq!(once, twice);
        assert_eq!(once.cell(0, "a"), Some(&Cell::Number(dec("10.46"))));
    }

    #[test]
    fn short_rows_are_padded() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![Cell::text("x")]);
        assert_eq!(table.cell(0, "b"), Some(&Cell::Empty));
    }

    #[test]
    fn config_floats_convert_exactly() {
        assert_eq!(decimal_from_f64(0.93), Some(dec("0.93")));
        assert_eq!(decimal_from_f64(-5000.0), Some(dec("-5000")));
        assert_eq!(decimal_from_f64(f64::NAN), None);
    }
}
