use serde::Serialize;

use super::open_po::ReconciledLine;
use super::opportunity::{InsightsSummary, OpportunityRecord};
use super::table::Table;

/// 非错误的提示: 过滤或连接后没有数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    EmptyResult { stage: &'static str },
}

/// 机会流水线结果
#[derive(Debug, Clone)]
pub struct OpportunityReport {
    /// 过滤+派生+舍入后的完整表 (按 |机会| 降序)
    pub table: Table,
    pub records: Vec<OpportunityRecord>,
    /// None 表示没有匹配行
    pub insights: Option<InsightsSummary>,
    pub warning: Option<PipelineWarning>,
}

impl OpportunityReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 未结 PO 对账结果
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub reference_currency: String,
    /// 按 Impact 降序
    pub lines: Vec<ReconciledLine>,
    pub warning: Option<PipelineWarning>,
}

impl ReconciliationReport {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
