use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use indexmap::IndexSet;
use std::collections::HashMap;

use crate::config::OpenPoConfig;
use crate::error::{PipelineError, Result};
use crate::models::table::round2;
use crate::models::{
    BenchmarkLine, Cell, OpenPoLine, PipelineWarning, ReconciledLine, ReconciliationReport, Table,
    VendorGroup,
};
use crate::service::currency::CurrencyTable;
use crate::service::schema::{normalize_select, SchemaMapping};

/// 未结 PO 导出的源列 (CURRNECY 为导出系统中的原始列名)
pub fn open_po_mapping() -> SchemaMapping {
    SchemaMapping::new([
        ("ORDER_TYPE", "ORDER_TYPE"),
        ("LINE_TYPE", "LINE_TYPE"),
        ("ITEM", "ITEM"),
        ("VENDOR_NUM", "VENDOR_NUM"),
        ("PO_NUM", "PO_NUM"),
        ("RELEASE_NUM", "RELEASE_NUM"),
        ("LINE_NUM", "LINE_NUM"),
        ("SHIPMENT_NUM", "SHIPMENT_NUM"),
        ("AUTHORIZATION_STATUS", "AUTHORIZATION_STATUS"),
        ("PO_SHIPMENT_CREATION_DATE", "PO_SHIPMENT_CREATION_DATE"),
        ("QTY_ELIGIBLE_TO_SHIP", "QTY_ELIGIBLE_TO_SHIP"),
        ("UNIT_PRICE", "UNIT_PRICE"),
        ("CURRNECY", "CURRENCY"),
    ])
}

/// 价格基准导出的源列
pub fn benchmark_mapping() -> SchemaMapping {
    SchemaMapping::new([
        ("PART_NUMBER", "PART_NUMBER"),
        ("DESCRIPTION", "DESCRIPTION"),
        ("VENDOR_NUM", "VENDOR_NUM"),
        ("VENDOR_NAME", "VENDOR_NAME"),
        ("DANDB", "VENDOR_DUNS"),
        ("STARS Category Code", "STARS Category Code"),
        ("ASL_MPN", "ASL_MPN"),
        ("UNIT_PRICE", "UNIT_PRICE"),
        ("CURRENCY_CODE", "CURRENCY_CODE"),
    ])
}

/// 集团内供应商识别
#[derive(Debug, Clone)]
pub struct VendorClassifier {
    markers: Vec<String>,
    case_insensitive: bool,
}

impl VendorClassifier {
    pub fn new(markers: Vec<String>, case_insensitive: bool) -> Self {
        let markers = if case_insensitive {
            markers.iter().map(|m| m.to_uppercase()).collect()
        } else {
            markers
        };
        Self {
            markers,
            case_insensitive,
        }
    }

    pub fn classify(&self, vendor_name: &str) -> VendorGroup {
        let name = if self.case_insensitive {
            vendor_name.to_uppercase()
        } else {
            vendor_name.to_string()
        };
        if self.markers.iter().any(|m| name.contains(m.as_str())) {
            VendorGroup::IntraGroup
        } else {
            VendorGroup::OtherGroup
        }
    }
}

/// 未结 PO 对账服务
pub struct ReconciliationService {
    currency: CurrencyTable,
    classifier: VendorClassifier,
    line_type: String,
}

impl ReconciliationService {
    pub fn new(currency: CurrencyTable, classifier: VendorClassifier, line_type: &str) -> Self {
        Self {
            currency,
            classifier,
            line_type: line_type.to_string(),
        }
    }

    pub fn from_config(cfg: &OpenPoConfig) -> Result<Self> {
        Ok(Self::new(
            CurrencyTable::from_config(cfg)?,
            VendorClassifier::new(cfg.intra_group_markers.clone(), cfg.case_insensitive_markers),
            &cfg.line_type,
        ))
    }

    /// 规范化 -> 行类型过滤 -> 内连接 -> 去重 -> 换算 -> 派生 -> 按 Impact 降序
    pub fn run(&self, open_po: &Table, benchmark: &Table) -> Result<ReconciliationReport> {
        tracing::info!(
            "未结PO对账开始: open_po {} 行, benchmark {} 行",
            open_po.height(),
            benchmark.height()
        );

        let po = normalize_select(open_po, &open_po_mapping())?;
        let wb = normalize_select(benchmark, &benchmark_mapping())?;

        let po_lines: Vec<OpenPoLine> = read_open_po(&po)
            .into_iter()
            .filter(|l| {
                l.line_type
                    .as_text()
                    .map(|t| t.trim() == self.line_type)
                    .unwrap_or(false)
            })
            .collect();
        let wb_lines = read_benchmark(&wb);
        tracing::info!("{} 类型 PO 行: {}", self.line_type, po_lines.len());

        let pairs = dedup_pairs(inner_join(&wb_lines, &po_lines));
        tracing::info!("连接完成: {} 行 (去重后)", pairs.len());

        let mut lines = Vec::with_capacity(pairs.len());
        for (wb_line, po_line) in pairs {
            lines.push(self.reconcile(wb_line, po_line)?);
        }
        lines.sort_by(|a, b| b.impact.cmp(&a.impact));

        let warning = if lines.is_empty() {
            tracing::warn!("Open PO join produced no rows");
            Some(PipelineWarning::EmptyResult { stage: "join" })
        } else {
            None
        };

        Ok(ReconciliationReport {
            reference_currency: self.currency.reference().to_string(),
            lines,
            warning,
        })
    }

    fn reconcile(&self, wb: &BenchmarkLine, po: &OpenPoLine) -> Result<ReconciledLine> {
        let qty = required_number(&po.qty_eligible_to_ship, "QTY_ELIGIBLE_TO_SHIP", po.row)?;
        let po_price = required_number(&po.unit_price, "UNIT_PRICE", po.row)?;
        let wb_price = required_number(&wb.unit_price, "UNIT_PRICE", wb.row)?;
        let po_currency = po.currency.to_string().trim().to_string();
        let wb_currency = wb.currency_code.to_string().trim().to_string();

        let po_ref = self.currency.convert(&po_price, &po_currency)?;
        let wb_ref = self.currency.convert(&wb_price, &wb_currency)?;
        let delta = &po_ref - &wb_ref;
        let impact = &delta * &qty;
        let open_po_value = &qty * &po_ref;

        let creation_date = parse_date(&po.creation_date, "PO_SHIPMENT_CREATION_DATE", po.row)?;

        Ok(ReconciledLine {
            order_type: po.order_type.clone(),
            part_number: wb.part_number.clone(),
            asl_mpn: wb.asl_mpn.clone(),
            description: wb.description.clone(),
            vendor_name: wb.vendor_name.clone(),
            vendor_duns: wb.vendor_duns.clone(),
            vendor_num: wb.vendor_num.clone(),
            category_code: wb.category_code.clone(),
            vendor_group: self.classifier.classify(&wb.vendor_name.to_string()),
            po_num: po.po_num.clone(),
            release_num: po.release_num.clone(),
            line_num: po.line_num.clone(),
            shipment_num: po.shipment_num.clone(),
            authorization_status: po.authorization_status.clone(),
            po_year: creation_date.map(|d| d.year()),
            creation_date,
            qty_eligible_to_ship: qty,
            unit_price_benchmark: wb_price,
            currency_benchmark: wb_currency,
            unit_price_po: po_price,
            currency_po: po_currency,
            unit_price_benchmark_ref: round2(&wb_ref),
            unit_price_po_ref: round2(&po_ref),
            price_delta: round2(&delta),
            impact: round2(&impact),
            open_po_value: round2(&open_po_value),
        })
    }
}

fn read_open_po(table: &Table) -> Vec<OpenPoLine> {
    // normalize_select 保证列顺序与 open_po_mapping() 一致
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, r)| OpenPoLine {
            order_type: r[0].clone(),
            line_type: r[1].clone(),
            item: r[2].clone(),
            vendor_num: r[3].clone(),
            po_num: r[4].clone(),
            release_num: r[5].clone(),
            line_num: r[6].clone(),
            shipment_num: r[7].clone(),
            authorization_status: r[8].clone(),
            creation_date: r[9].clone(),
            qty_eligible_to_ship: r[10].clone(),
            unit_price: r[11].clone(),
            currency: r[12].clone(),
            row: idx + 1,
        })
        .collect()
}

fn read_benchmark(table: &Table) -> Vec<BenchmarkLine> {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, r)| BenchmarkLine {
            part_number: r[0].clone(),
            description: r[1].clone(),
            vendor_num: r[2].clone(),
            vendor_name: r[3].clone(),
            vendor_duns: r[4].clone(),
            category_code: r[5].clone(),
            asl_mpn: r[6].clone(),
            unit_price: r[7].clone(),
            currency_code: r[8].clone(),
            row: idx + 1,
        })
        .collect()
}

/// 内连接 (part number = item, vendor number); 键为空的行不参与连接
pub fn inner_join<'a>(
    benchmarks: &'a [BenchmarkLine],
    po_lines: &'a [OpenPoLine],
) -> Vec<(&'a BenchmarkLine, &'a OpenPoLine)> {
    let mut index: HashMap<(String, String), Vec<&OpenPoLine>> = HashMap::new();
    for po in po_lines {
        if po.item.is_empty() || po.vendor_num.is_empty() {
            continue;
        }
        index
            .entry((po.item.key(), po.vendor_num.key()))
            .or_default()
            .push(po);
    }

    let mut pairs = Vec::new();
    for wb in benchmarks {
        if wb.part_number.is_empty() || wb.vendor_num.is_empty() {
            continue;
        }
        if let Some(matches) = index.get(&(wb.part_number.key(), wb.vendor_num.key())) {
            for po in matches {
                pairs.push((wb, *po));
            }
        }
    }
    pairs
}

/// 按输出投影去除完全重复的行 (保序)
fn dedup_pairs<'a>(
    pairs: Vec<(&'a BenchmarkLine, &'a OpenPoLine)>,
) -> Vec<(&'a BenchmarkLine, &'a OpenPoLine)> {
    let mut seen: IndexSet<Vec<String>> = IndexSet::new();
    pairs
        .into_iter()
        .filter(|(wb, po)| {
            let key: Vec<String> = [
                &po.order_type,
                &wb.part_number,
                &wb.asl_mpn,
                &wb.description,
                &wb.vendor_name,
                &wb.vendor_duns,
                &wb.vendor_num,
                &wb.category_code,
                &po.po_num,
                &po.release_num,
                &po.line_num,
                &po.shipment_num,
                &po.authorization_status,
                &po.creation_date,
                &po.qty_eligible_to_ship,
                &wb.unit_price,
                &wb.currency_code,
                &po.unit_price,
                &po.currency,
            ]
            .iter()
            .map(|c| c.key())
            .collect();
            seen.insert(key)
        })
        .collect()
}

fn required_number(cell: &Cell, column: &str, row: usize) -> Result<BigDecimal> {
    cell.as_number()
        .cloned()
        .ok_or_else(|| PipelineError::InvalidValue {
            column: column.to_string(),
            row,
            value: cell.to_string(),
        })
}

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d-%b-%y", "%d-%b-%Y", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%b-%y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// 解析发运创建日期; 空值为 None, 无法解析为 InvalidValue
pub fn parse_date(cell: &Cell, column: &str, row: usize) -> Result<Option<NaiveDateTime>> {
    let invalid = || PipelineError::InvalidValue {
        column: column.to_string(),
        row,
        value: cell.to_string(),
    };
    match cell {
        Cell::Empty => Ok(None),
        Cell::Date(d) => Ok(Some(*d)),
        // Excel 序列日期 (1899-12-30 起算)
        Cell::Number(n) => {
            let days = n
                .to_i64()
                .filter(|d| (0..=2_958_465).contains(d))
                .ok_or_else(invalid)?;
            NaiveDate::from_ymd_opt(1899, 12, 30)
                .and_then(|base| base.checked_add_signed(Duration::days(days)))
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(Some)
                .ok_or_else(invalid)
        }
        Cell::Text(s) => {
            let s = s.trim();
            for fmt in DATETIME_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Ok(Some(dt));
                }
            }
            for fmt in DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return Ok(d.and_hms_opt(0, 0, 0));
                }
            }
            Err(invalid())
        }
    }
}
