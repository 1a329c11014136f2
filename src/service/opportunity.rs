use bigdecimal::BigDecimal;
use std::collections::HashMap;

use crate::config::OpportunityConfig;
use crate::error::{PipelineError, Result};
use crate::models::table::round2;
use crate::models::{
    Cell, OpportunityRecord, OpportunityReport, PipelineWarning, ProcurementLine, Table,
};
use crate::service::filters::{FilterStage, OpportunityRules, Verdict};
use crate::service::insights::generate_insights;
use crate::service::schema::{normalize, SchemaMapping};

/// 规范列名
pub mod columns {
    pub const PART_NUMBER: &str = "Part Number";
    pub const DUNS: &str = "DUNS Elementary Code";
    pub const PROJECTION_QUANTITY: &str = "12m Projection Quantity";
    pub const UNIT_PRICE: &str = "Unit Price in Euros";
    pub const BEST_PRICE: &str = "Best Price in Euros";
    pub const BEST_PRICE_QUANTITY: &str = "Best Price Quantity";
    pub const BEST_PRICE_SITE: &str = "Best Price Site";
    pub const BEST_PRICE_REGION: &str = "Best Price Region";
    pub const BEST_PRICE_SUPPLIER: &str = "Best Price Supplier";
    pub const TOTAL_OPPORTUNITY: &str = "Total Opportunity";
    pub const SITE_NAME: &str = "Site Name";
    pub const CATEGORY_CODE: &str = "Category Code";
    pub const SPEND: &str = "Spend (EUR)";
    pub const SUPPLIER_NAME: &str = "Supplier Name";
    pub const QTY_PROJECTION: &str = "Qty/projection";
    pub const ABSOLUTE_OPPORTUNITY: &str = "AbsoluteOpportunity";

    pub const NUMERIC: [&str; 6] = [
        SPEND,
        PROJECTION_QUANTITY,
        BEST_PRICE_QUANTITY,
        TOTAL_OPPORTUNITY,
        UNIT_PRICE,
        BEST_PRICE,
    ];
}

/// 机会导出的源列 -> 规范列
pub fn source_mapping() -> SchemaMapping {
    use columns::*;
    SchemaMapping::new([
        ("Part Number (Standardized)", PART_NUMBER),
        ("Supplier DUNS Elementary Code", DUNS),
        ("Next 12m Projection Quantity (Normalized UoM)", PROJECTION_QUANTITY),
        ("Line Price (EUR/NUoM) (Includes SQL FX)", UNIT_PRICE),
        (
            "CPR:Best Line Price (including Logistics Simulation Delta if any) (EUR/NUoM) (Global)",
            BEST_PRICE,
        ),
        ("CPR:Quantity of Best Price Line (NUoM) (Global)", BEST_PRICE_QUANTITY),
        ("CPR:Site Name of Best Price Line (Global)", BEST_PRICE_SITE),
        ("CPR:Site Region of Best Price Line (Global)", BEST_PRICE_REGION),
        ("CPR:Supplier Name of Best Price Line (Global)", BEST_PRICE_SUPPLIER),
        (
            "CPR:Total Opportunity (EUR), including Logistics Simulation (Global)",
            TOTAL_OPPORTUNITY,
        ),
        (SITE_NAME, SITE_NAME),
        (CATEGORY_CODE, CATEGORY_CODE),
        (SPEND, SPEND),
        (SUPPLIER_NAME, SUPPLIER_NAME),
    ])
}

/// 规范化表中各字段的列下标
#[derive(Debug, Clone)]
struct LineColumns {
    part_number: usize,
    site_name: usize,
    category_code: usize,
    supplier_name: usize,
    spend: usize,
    projection_quantity: usize,
    unit_price: usize,
    best_price: usize,
    best_price_quantity: usize,
    best_price_site: usize,
    best_price_region: usize,
    best_price_supplier: usize,
    total_opportunity: usize,
}

impl LineColumns {
    fn resolve(table: &Table) -> Result<Self> {
        use columns::*;
        let mut missing = Vec::new();
        let mut find = |name: &str| match table.column_index(name) {
            Some(idx) => idx,
            None => {
                missing.push(name.to_string());
                usize::MAX
            }
        };
        let cols = Self {
            part_number: find(PART_NUMBER),
            site_name: find(SITE_NAME),
            category_code: find(CATEGORY_CODE),
            supplier_name: find(SUPPLIER_NAME),
            spend: find(SPEND),
            projection_quantity: find(PROJECTION_QUANTITY),
            unit_price: find(UNIT_PRICE),
            best_price: find(BEST_PRICE),
            best_price_quantity: find(BEST_PRICE_QUANTITY),
            best_price_site: find(BEST_PRICE_SITE),
            best_price_region: find(BEST_PRICE_REGION),
            best_price_supplier: find(BEST_PRICE_SUPPLIER),
            total_opportunity: find(TOTAL_OPPORTUNITY),
        };
        if !missing.is_empty() {
            return Err(PipelineError::Schema { missing });
        }
        Ok(cols)
    }

    fn read(&self, row: &[Cell]) -> ProcurementLine {
        let text = |idx: usize| row[idx].as_text().map(|s| s.into_owned());
        let number = |idx: usize| row[idx].as_number().cloned();
        ProcurementLine {
            part_number: text(self.part_number).unwrap_or_default(),
            site_name: text(self.site_name),
            category_code: text(self.category_code),
            supplier_name: text(self.supplier_name),
            spend: number(self.spend),
            projection_quantity: number(self.projection_quantity),
            unit_price: number(self.unit_price),
            best_price: number(self.best_price),
            best_price_quantity: number(self.best_price_quantity),
            best_price_site: text(self.best_price_site),
            best_price_region: text(self.best_price_region),
            best_price_supplier: text(self.best_price_supplier),
            total_opportunity: number(self.total_opportunity),
        }
    }
}

/// 输出列布局: 派生列已存在则原位替换, 否则追加
#[derive(Debug, Clone)]
struct OutputLayout {
    columns: Vec<String>,
    ratio: usize,
    absolute: usize,
}

impl OutputLayout {
    fn for_table(table: &Table) -> Self {
        let mut columns = table.columns().to_vec();
        let mut slot = |name: &str| match columns.iter().position(|c| c == name) {
            Some(idx) => idx,
            None => {
                columns.push(name.to_string());
                columns.len() - 1
            }
        };
        let ratio = slot(columns::QTY_PROJECTION);
        let absolute = slot(columns::ABSOLUTE_OPPORTUNITY);
        Self {
            columns,
            ratio,
            absolute,
        }
    }
}

/// 机会分析服务
pub struct OpportunityService {
    rules: OpportunityRules,
    top_n: usize,
}

impl OpportunityService {
    pub fn new(rules: OpportunityRules, top_n: usize) -> Self {
        Self { rules, top_n }
    }

    pub fn from_config(cfg: &OpportunityConfig) -> Result<Self> {
        Ok(Self::new(OpportunityRules::from_config(cfg)?, cfg.top_n))
    }

    /// 完整流水线: 规范化 -> 过滤 -> 派生 -> 舍入 -> 排序 -> 汇总
    pub fn run(&self, raw: &Table) -> Result<OpportunityReport> {
        tracing::info!("机会分析开始: {} 行, {} 列", raw.height(), raw.columns().len());

        let normalized = normalize(raw, &source_mapping())?;
        warn_non_numeric(&normalized);

        let mut records = self.filter_records(&normalized)?;
        // 按 |机会| 降序, 稳定排序保留输入顺序
        records.sort_by(|a, b| b.absolute_opportunity.cmp(&a.absolute_opportunity));

        let layout = OutputLayout::for_table(&normalized);
        let table = Table::with_rows(
            layout.columns,
            records.iter().map(|r| r.cells.clone()).collect(),
        );

        let insights = generate_insights(&records, self.top_n);
        let warning = if records.is_empty() {
            tracing::warn!("No data matches the filtering criteria");
            Some(PipelineWarning::EmptyResult { stage: "filter" })
        } else {
            None
        };

        Ok(OpportunityReport {
            table,
            records,
            insights,
            warning,
        })
    }

    /// 对规范化表执行过滤链, 返回通过的记录 (派生列已写入并舍入)
    pub fn filter_records(&self, table: &Table) -> Result<Vec<OpportunityRecord>> {
        let cols = LineColumns::resolve(table)?;
        let layout = OutputLayout::for_table(table);

        let mut rejected: HashMap<FilterStage, usize> = HashMap::new();
        let mut records = Vec::new();

        for row in table.rows() {
            // 先舍入再判断, 输出表再次过滤时结果不变
            let cells: Vec<Cell> = row.iter().map(Cell::rounded).collect();
            let line = cols.read(&cells);
            let ratio = match self.rules.evaluate(&line) {
                Verdict::Accepted(ratio) => ratio,
                Verdict::Rejected(stage) => {
                    *rejected.entry(stage).or_insert(0) += 1;
                    continue;
                }
            };
            records.push(derive_record(&layout, cells, line, &ratio));
        }

        let summary: Vec<String> = FilterStage::ALL
            .iter()
            .map(|s| format!("{:?}={}", s, rejected.get(s).copied().unwrap_or(0)))
            .collect();
        tracing::info!(
            "过滤完成: 输入 {}, 通过 {}, 排除 [{}]",
            table.height(),
            records.len(),
            summary.join(", ")
        );

        Ok(records)
    }
}

/// 在已舍入的行上写入派生列
fn derive_record(
    layout: &OutputLayout,
    mut cells: Vec<Cell>,
    line: ProcurementLine,
    ratio: &BigDecimal,
) -> OpportunityRecord {
    cells.resize(layout.columns.len(), Cell::Empty);

    let qty_projection_ratio = round2(ratio);
    let absolute_opportunity = round2(&line.total_opportunity.clone().unwrap_or_default().abs());

    cells[layout.ratio] = Cell::Number(qty_projection_ratio.clone());
    cells[layout.absolute] = Cell::Number(absolute_opportunity.clone());

    OpportunityRecord {
        line,
        qty_projection_ratio,
        absolute_opportunity,
        cells,
    }
}

fn warn_non_numeric(table: &Table) {
    for name in columns::NUMERIC {
        if let Some(idx) = table.column_index(name) {
            let text_cells = table
                .column_values(idx)
                .filter(|c| matches!(c, Cell::Text(_)))
                .count();
            if text_cells > 0 {
                tracing::warn!(
                    "Column '{}' kept as text ({} non-numeric cells); rows depending on it are excluded",
                    name,
                    text_cells
                );
            }
        }
    }
}
