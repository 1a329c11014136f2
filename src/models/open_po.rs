use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::Serialize;

use super::table::Cell;

/// 未结采购订单发运行
#[derive(Debug, Clone)]
pub struct OpenPoLine {
    pub order_type: Cell,
    pub line_type: Cell,
    pub item: Cell,
    pub vendor_num: Cell,
    pub po_num: Cell,
    pub release_num: Cell,
    pub line_num: Cell,
    pub shipment_num: Cell,
    pub authorization_status: Cell,
    pub creation_date: Cell,
    pub qty_eligible_to_ship: Cell,
    pub unit_price: Cell,
    pub currency: Cell,
    /// 源表中的行号 (从 1 开始, 不含表头)
    pub row: usize,
}

/// 价格基准行
#[derive(Debug, Clone)]
pub struct BenchmarkLine {
    pub part_number: Cell,
    pub description: Cell,
    pub vendor_num: Cell,
    pub vendor_name: Cell,
    pub vendor_duns: Cell,
    pub category_code: Cell,
    pub asl_mpn: Cell,
    pub unit_price: Cell,
    pub currency_code: Cell,
    pub row: usize,
}

/// 供应商分组: 集团内 / 集团外
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VendorGroup {
    #[serde(rename = "Intra-group")]
    IntraGroup,
    #[serde(rename = "Other-group")]
    OtherGroup,
}

impl VendorGroup {
    pub fn label(&self) -> &'static str {
        match self {
            VendorGroup::IntraGroup => "Intra-group",
            VendorGroup::OtherGroup => "Other-group",
        }
    }
}

/// 对账结果行
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledLine {
    pub order_type: Cell,
    pub part_number: Cell,
    pub asl_mpn: Cell,
    pub description: Cell,
    pub vendor_name: Cell,
    pub vendor_duns: Cell,
    pub vendor_num: Cell,
    pub category_code: Cell,
    pub vendor_group: VendorGroup,
    pub po_num: Cell,
    pub release_num: Cell,
    pub line_num: Cell,
    pub shipment_num: Cell,
    pub authorization_status: Cell,
    pub po_year: Option<i32>,
    pub creation_date: Option<NaiveDateTime>,
    pub qty_eligible_to_ship: BigDecimal,
    pub unit_price_benchmark: BigDecimal,
    pub currency_benchmark: String,
    pub unit_price_po: BigDecimal,
    pub currency_po: String,
    pub unit_price_benchmark_ref: BigDecimal,
    pub unit_price_po_ref: BigDecimal,
    pub price_delta: BigDecimal,
    pub impact: BigDecimal,
    pub open_po_value: BigDecimal,
}

impl ReconciledLine {
    /// 导出表头 (派生金额列带参考币种后缀)
    pub fn headers(reference: &str) -> Vec<String> {
        let mut headers: Vec<String> = [
            "ORDER_TYPE",
            "PART_NUMBER",
            "ASL_MPN",
            "DESCRIPTION",
            "VENDOR_NAME",
            "VENDOR_DUNS",
            "VENDOR_NUM",
            "STARS Category Code",
            "IG/OG",
            "PO_NUM",
            "RELEASE_NUM",
            "LINE_NUM",
            "SHIPMENT_NUM",
            "AUTHORIZATION_STATUS",
            "PO Year",
            "PO_SHIPMENT_CREATION_DATE",
            "QTY_ELIGIBLE_TO_SHIP",
            "UNIT_PRICE_WB",
            "CURRENCY_CODE_WB",
            "UNIT_PRICE_OPO",
            "CURRENCY_OPO",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();
        headers.push(format!("UNIT_PRICE_WB_{}", reference));
        headers.push(format!("UNIT_PRICE_OPO_{}", reference));
        headers.push("PRICE_DELTA".to_string());
        headers.push(format!("IMPACT_{}", reference));
        headers.push(format!("OPEN_PO_VALUE_{}", reference));
        headers
    }

    /// 与 headers() 对齐的文本记录
    pub fn record(&self) -> Vec<String> {
        let date = self
            .creation_date
            .map(|d| Cell::Date(d).to_string())
            .unwrap_or_default();
        vec![
            self.order_type.to_string(),
            self.part_number.to_string(),
            self.asl_mpn.to_string(),
            self.description.to_string(),
            self.vendor_name.to_string(),
            self.vendor_duns.to_string(),
            self.vendor_num.to_string(),
            self.category_code.to_string(),
            self.vendor_group.label().to_string(),
            self.po_num.to_string(),
            self.release_num.to_string(),
            self.line_num.to_string(),
            self.shipment_num.to_string(),
            self.authorization_status.to_string(),
            self.po_year.map(|y| y.to_string()).unwrap_or_default(),
            date,
            self.qty_eligible_to_ship.to_string(),
            self.unit_price_benchmark.to_string(),
            self.currency_benchmark.clone(),
            self.unit_price_po.to_string(),
            self.currency_po.clone(),
            self.unit_price_benchmark_ref.to_string(),
            self.unit_price_po_ref.to_string(),
            self.price_delta.to_string(),
            self.impact.to_string(),
            self.open_po_value.to_string(),
        ]
    }
}
