use bigdecimal::BigDecimal;
use serde::Serialize;

use super::table::Cell;

/// 采购机会明细行 (规范化后的列)
#[derive(Debug, Clone)]
pub struct ProcurementLine {
    pub part_number: String,
    pub site_name: Option<String>,
    pub category_code: Option<String>,
    pub supplier_name: Option<String>,
    pub spend: Option<BigDecimal>,
    pub projection_quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
    pub best_price: Option<BigDecimal>,
    pub best_price_quantity: Option<BigDecimal>,
    pub best_price_site: Option<String>,
    pub best_price_region: Option<String>,
    pub best_price_supplier: Option<String>,
    pub total_opportunity: Option<BigDecimal>,
}

/// 通过过滤链的记录
#[derive(Debug, Clone)]
pub struct OpportunityRecord {
    pub line: ProcurementLine,
    pub qty_projection_ratio: BigDecimal,
    pub absolute_opportunity: BigDecimal,
    /// 原始行 (规范化列顺序), 用于输出完整表
    pub cells: Vec<Cell>,
}

impl OpportunityRecord {
    pub fn total_opportunity(&self) -> BigDecimal {
        self.line.total_opportunity.clone().unwrap_or_default()
    }
}

/// 分组汇总项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub value: BigDecimal,
}

/// 结果洞察汇总
#[derive(Debug, Clone, Serialize)]
pub struct InsightsSummary {
    pub total_opportunity: BigDecimal,
    pub avg_qty_projection: BigDecimal,
    pub part_count: usize,
    pub supplier_count: usize,
    /// 按 |机会| 汇总的前 N 供应商
    pub top_suppliers: Vec<RankedEntry>,
    /// 按 |机会| 汇总的前 N 品类
    pub top_categories: Vec<RankedEntry>,
    /// 品类 -> 机会合计 (按品类名排序)
    pub opportunity_by_category: Vec<RankedEntry>,
    /// 机会最大 (最负) 的前 10 供应商
    pub supplier_opportunity: Vec<RankedEntry>,
}
