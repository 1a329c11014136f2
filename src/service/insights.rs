use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::models::table::round2;
use crate::models::{InsightsSummary, OpportunityRecord, RankedEntry};

const UNKNOWN: &str = "(blank)";

/// 生成洞察汇总; 无记录时返回 None (没有匹配行)
pub fn generate_insights(records: &[OpportunityRecord], top_n: usize) -> Option<InsightsSummary> {
    if records.is_empty() {
        return None;
    }

    let mut total_opportunity = BigDecimal::zero();
    let mut ratio_sum = BigDecimal::zero();
    // 保序分组 (首次出现顺序)
    let mut by_supplier_abs: IndexMap<String, BigDecimal> = IndexMap::new();
    let mut by_category_abs: IndexMap<String, BigDecimal> = IndexMap::new();
    let mut by_supplier_signed: IndexMap<String, BigDecimal> = IndexMap::new();
    let mut by_category_signed: BTreeMap<String, BigDecimal> = BTreeMap::new();

    for rec in records {
        let opportunity = rec.total_opportunity();
        total_opportunity += &opportunity;
        ratio_sum += &rec.qty_projection_ratio;

        let supplier = rec.line.supplier_name.clone().unwrap_or_else(|| UNKNOWN.to_string());
        let category = rec.line.category_code.clone().unwrap_or_else(|| UNKNOWN.to_string());

        *by_supplier_abs.entry(supplier.clone()).or_insert_with(BigDecimal::zero) +=
            &rec.absolute_opportunity;
        *by_category_abs.entry(category.clone()).or_insert_with(BigDecimal::zero) +=
            &rec.absolute_opportunity;
        *by_supplier_signed.entry(supplier).or_insert_with(BigDecimal::zero) += &opportunity;
        *by_category_signed.entry(category).or_insert_with(BigDecimal::zero) += &opportunity;
    }

    let count = BigDecimal::from(records.len() as i64);
    let avg_qty_projection = round2(&(&ratio_sum / &count));

    let supplier_count = by_supplier_abs.len();

    Some(InsightsSummary {
        total_opportunity: round2(&total_opportunity),
        avg_qty_projection,
        part_count: records.len(),
        supplier_count,
        top_suppliers: top_descending(&by_supplier_abs, top_n),
        top_categories: top_descending(&by_category_abs, top_n),
        opportunity_by_category: by_category_signed
            .into_iter()
            .map(|(name, value)| RankedEntry {
                name,
                value: round2(&value),
            })
            .collect(),
        supplier_opportunity: top_ascending(&by_supplier_signed, 10),
    })
}

/// 值降序; 相等时按名称字典序
fn top_descending(groups: &IndexMap<String, BigDecimal>, n: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<(&String, &BigDecimal)> = groups.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    to_ranked(entries, n)
}

/// 值升序 (机会最负者在前); 相等时按名称字典序
fn top_ascending(groups: &IndexMap<String, BigDecimal>, n: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<(&String, &BigDecimal)> = groups.iter().collect();
    entries.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
    to_ranked(entries, n)
}

fn to_ranked(entries: Vec<(&String, &BigDecimal)>, n: usize) -> Vec<RankedEntry> {
    entries
        .into_iter()
        .take(n)
        .map(|(name, value)| RankedEntry {
            name: name.clone(),
            value: round2(value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcurementLine;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn record(supplier: &str, category: &str, opportunity: &str, ratio: &str) -> OpportunityRecord {
        let opp = dec(opportunity);
        OpportunityRecord {
            line: ProcurementLine {
                part_number: format!("{}-{}", supplier, category),
                site_name: Some("IN Chennai".to_string()),
                category_code: Some(category.to_string()),
                supplier_name: Some(supplier.to_string()),
                spend: Some(dec("60000")),
                projection_quantity: Some(dec("100")),
                unit_price: None,
                best_price: None,
                best_price_quantity: Some(dec("10")),
                best_price_site: None,
                best_price_region: None,
                best_price_supplier: None,
                total_opportunity: Some(opp.clone()),
            },
            qty_projection_ratio: dec(ratio),
            absolute_opportunity: opp.abs(),
            cells: Vec::new(),
        }
    }

    #[test]
    fn empty_input_signals_no_matches() {
        assert!(generate_insights(&[], 5).is_none());
    }

    #[test]
    fn totals_and_mean_ratio() {
        let records = vec![
            record("ACME", "A1", "-6000", "10"),
            record("BOLT", "B2", "-9000", "20"),
            record("ACME", "A1", "-5000", "15"),
        ];
        let s = generate_insights(&records, 5).unwrap();
        assert_eq!(s.total_opportunity, dec("-20000"));
        assert_eq!(s.avg_qty_projection, dec("15"));
        assert_eq!(s.part_count, 3);
        assert_eq!(s.supplier_count, 2);
        assert_eq!(s.top_suppliers[0], RankedEntry { name: "ACME".into(), value: dec("11000") });
        assert_eq!(s.top_categories[1].name, "B2");
        assert_eq!(s.supplier_opportunity[0].name, "ACME");
        assert_eq!(
            s.opportunity_by_category.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["A1", "B2"]
        );
    }

    #[test]
    fn ties_break_lexicographically_and_cap_at_n() {
        let records = vec![
            record("ZETA", "C1", "-6000", "10"),
            record("ALPHA", "C1", "-6000", "10"),
            record("MID", "C1", "-7000", "10"),
        ];
        let s = generate_insights(&records, 2).unwrap();
        let names: Vec<_> = s.top_suppliers.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["MID", "ALPHA"]);
    }

    #[test]
    fn mean_ratio_is_rounded() {
        let records = vec![
            record("A", "A1", "-6000", "10"),
            record("B", "A1", "-6000", "10"),
            record("C", "A1", "-6000", "11"),
        ];
        let s = generate_insights(&records, 5).unwrap();
        assert_eq!(s.avg_qty_projection, dec("10.33"));
    }
}
