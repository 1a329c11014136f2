use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;

use crate::config::OpportunityConfig;
use crate::error::Result;
use crate::models::table::decimal_from_f64;
use crate::models::ProcurementLine;

/// 过滤链各阶段 (固定顺序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterStage {
    Site,
    Category,
    Spend,
    Region,
    Opportunity,
    QtyProjection,
}

impl FilterStage {
    pub const ALL: [FilterStage; 6] = [
        FilterStage::Site,
        FilterStage::Category,
        FilterStage::Spend,
        FilterStage::Region,
        FilterStage::Opportunity,
        FilterStage::QtyProjection,
    ];
}

/// 过滤结果
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// 通过, 携带 Qty/projection 比率
    Accepted(BigDecimal),
    Rejected(FilterStage),
}

/// 机会过滤规则 (由配置构建)
#[derive(Debug, Clone)]
pub struct OpportunityRules {
    sites: Vec<String>,
    category_prefixes: Vec<String>,
    spend_floor: BigDecimal,
    excluded_region: String,
    opportunity_ceiling: BigDecimal,
    min_qty_projection: BigDecimal,
}

fn threshold(name: &str, value: f64) -> Result<BigDecimal> {
    decimal_from_f64(value).ok_or_else(|| {
        config::ConfigError::Message(format!("opportunity.{} is not a finite number", name)).into()
    })
}

impl OpportunityRules {
    pub fn from_config(cfg: &OpportunityConfig) -> Result<Self> {
        Ok(Self {
            sites: cfg.sites.clone(),
            category_prefixes: cfg.category_prefixes.clone(),
            spend_floor: threshold("spend_floor", cfg.spend_floor)?,
            excluded_region: cfg.excluded_region.clone(),
            opportunity_ceiling: threshold("opportunity_ceiling", cfg.opportunity_ceiling)?,
            min_qty_projection: threshold("min_qty_projection", cfg.min_qty_projection)?,
        })
    }

    pub fn site_allowed(&self, line: &ProcurementLine) -> bool {
        line.site_name
            .as_deref()
            .map(|site| self.sites.iter().any(|s| s == site))
            .unwrap_or(false)
    }

    /// 前缀匹配: "P1" 与 "P2" 都匹配前缀 "P"
    pub fn category_allowed(&self, line: &ProcurementLine) -> bool {
        line.category_code
            .as_deref()
            .map(|code| self.category_prefixes.iter().any(|p| code.starts_with(p.as_str())))
            .unwrap_or(false)
    }

    pub fn spend_above_floor(&self, line: &ProcurementLine) -> bool {
        matches!(&line.spend, Some(spend) if *spend > self.spend_floor)
    }

    /// 空区域视为通过
    pub fn region_allowed(&self, line: &ProcurementLine) -> bool {
        line.best_price_region.as_deref() != Some(self.excluded_region.as_str())
    }

    pub fn opportunity_within_ceiling(&self, line: &ProcurementLine) -> bool {
        matches!(&line.total_opportunity, Some(opp) if *opp <= self.opportunity_ceiling)
    }

    /// 排除一次性采购
    pub fn recurring(&self, ratio: &BigDecimal) -> bool {
        *ratio > self.min_qty_projection
    }

    pub fn evaluate(&self, line: &ProcurementLine) -> Verdict {
        if !self.site_allowed(line) {
            return Verdict::Rejected(FilterStage::Site);
        }
        if !self.category_allowed(line) {
            return Verdict::Rejected(FilterStage::Category);
        }
        if !self.spend_above_floor(line) {
            return Verdict::Rejected(FilterStage::Spend);
        }
        if !self.region_allowed(line) {
            return Verdict::Rejected(FilterStage::Region);
        }
        if !self.opportunity_within_ceiling(line) {
            return Verdict::Rejected(FilterStage::Opportunity);
        }
        match qty_projection_ratio(line) {
            Some(ratio) if self.recurring(&ratio) => Verdict::Accepted(ratio),
            _ => Verdict::Rejected(FilterStage::QtyProjection),
        }
    }
}

/// bestPriceQuantity / projectionQuantity × 100; 预测量为 0 或缺失时无定义
pub fn qty_projection_ratio(line: &ProcurementLine) -> Option<BigDecimal> {
    let best = line.best_price_quantity.as_ref()?;
    let projection = line.projection_quantity.as_ref()?;
    if projection.is_zero() {
        return None;
    }
    let scaled = best * &BigDecimal::from(100);
    Some(&scaled / projection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn line() -> ProcurementLine {
        ProcurementLine {
            part_number: "PN-1".to_string(),
            site_name: Some("IN Chennai".to_string()),
            category_code: Some("A1".to_string()),
            supplier_name: Some("ACME".to_string()),
            spend: Some(dec("60000")),
            projection_quantity: Some(dec("100")),
            unit_price: Some(dec("12.5")),
            best_price: Some(dec("10")),
            best_price_quantity: Some(dec("10")),
            best_price_site: Some("FR Grenoble".to_string()),
            best_price_region: Some("EU".to_string()),
            best_price_supplier: Some("ACME EU".to_string()),
            total_opportunity: Some(dec("-6000")),
        }
    }

    fn rules() -> OpportunityRules {
        OpportunityRules::from_config(&OpportunityConfig::default()).unwrap()
    }

    #[test]
    fn accepts_qualifying_line_with_ratio() {
        assert_eq!(rules().evaluate(&line()), Verdict::Accepted(dec("10")));
    }

    #[test]
    fn site_outside_allow_list_is_rejected() {
        let mut l = line();
        l.site_name = Some("FR Grenoble".to_string());
        assert_eq!(rules().evaluate(&l), Verdict::Rejected(FilterStage::Site));
    }

    #[test]
    fn category_matches_by_prefix() {
        let r = rules();
        let mut l = line();
        l.category_code = Some("P1-7".to_string());
        assert!(r.category_allowed(&l));
        l.category_code = Some("P3".to_string());
        assert!(!r.category_allowed(&l));
        l.category_code = Some("Z9".to_string());
        assert_eq!(r.evaluate(&l), Verdict::Rejected(FilterStage::Category));
    }

    #[test]
    fn spend_must_be_strictly_above_floor() {
        let r = rules();
        let mut l = line();
        l.spend = Some(dec("50000"));
        assert_eq!(r.evaluate(&l), Verdict::Rejected(FilterStage::Spend));
        l.spend = None;
        assert_eq!(r.evaluate(&l), Verdict::Rejected(FilterStage::Spend));
    }

    #[test]
    fn excluded_region_is_rejected_but_blank_passes() {
        let r = rules();
        let mut l = line();
        l.best_price_region = Some("India / MEA".to_string());
        assert_eq!(r.evaluate(&l), Verdict::Rejected(FilterStage::Region));
        l.best_price_region = None;
        assert!(matches!(r.evaluate(&l), Verdict::Accepted(_)));
    }

    #[test]
    fn opportunity_ceiling_is_inclusive() {
        let r = rules();
        let mut l = line();
        l.total_opportunity = Some(dec("-5000"));
        assert!(r.opportunity_within_ceiling(&l));
        l.total_opportunity = Some(dec("-4999.99"));
        assert_eq!(r.evaluate(&l), Verdict::Rejected(FilterStage::Opportunity));
    }

    #[test]
    fn zero_projection_excludes_without_panicking() {
        let mut l = line();
        l.projection_quantity = Some(BigDecimal::zero());
        assert_eq!(qty_projection_ratio(&l), None);
        assert_eq!(rules().evaluate(&l), Verdict::Rejected(FilterStage::QtyProjection));
    }

    #[test]
    fn one_time_buys_are_rejected() {
        let mut l = line();
        l.best_price_quantity = Some(dec("5"));
        assert_eq!(rules().evaluate(&l), Verdict::Rejected(FilterStage::QtyProjection));
    }
}
