use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub opportunity: OpportunityConfig,
    pub open_po: OpenPoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 上传文件大小上限 (字节)
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// 机会流水线的业务过滤常量
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpportunityConfig {
    pub sites: Vec<String>,
    pub category_prefixes: Vec<String>,
    /// Spend 必须严格大于该值
    pub spend_floor: f64,
    pub excluded_region: String,
    /// Total Opportunity 必须小于等于该值 (负数 = 节省)
    pub opportunity_ceiling: f64,
    /// Qty/projection (%) 必须严格大于该值
    pub min_qty_projection: f64,
    pub top_n: usize,
}

impl Default for OpportunityConfig {
    fn default() -> Self {
        Self {
            sites: vec![
                "IN Bangalore ITB".to_string(),
                "IN Chennai".to_string(),
                "IN Hyderabad".to_string(),
                "IN Bangalore SEPFC".to_string(),
            ],
            category_prefixes: ["A", "B", "C", "D", "H", "K", "G", "E", "P1", "P2", "M1", "M2"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            spend_floor: 50_000.0,
            excluded_region: "India / MEA".to_string(),
            opportunity_ceiling: -5_000.0,
            min_qty_projection: 5.0,
            top_n: 5,
        }
    }
}

/// 未结 PO 对账常量
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenPoConfig {
    pub line_type: String,
    pub reference_currency: String,
    /// 币种 -> 参考币种汇率
    pub rates: BTreeMap<String, f64>,
    pub intra_group_markers: Vec<String>,
    pub case_insensitive_markers: bool,
}

impl Default for OpenPoConfig {
    fn default() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), 0.93);
        rates.insert("GBP".to_string(), 1.2);
        rates.insert("INR".to_string(), 0.011);
        rates.insert("JPY".to_string(), 0.0061);
        Self {
            line_type: "Inventory".to_string(),
            reference_currency: "EUR".to_string(),
            rates,
            intra_group_markers: vec!["SCHNEIDER".to_string(), "WUXI".to_string()],
            case_insensitive_markers: true,
        }
    }
}

impl AppConfig {
    /// 默认值 <- 可选 TOML 文件 <- PROCUREMENT__* 环境变量 (列表项用逗号分隔)
    pub fn load(path: &str) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PROCUREMENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("opportunity.sites")
                    .with_list_parse_key("opportunity.category_prefixes")
                    .with_list_parse_key("open_po.intra_group_markers"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// 从环境变量加载配置 (PROCUREMENT_CONFIG 指定文件路径)
    pub fn from_env() -> crate::Result<Self> {
        let path =
            std::env::var("PROCUREMENT_CONFIG").unwrap_or_else(|_| "procurement.toml".to_string());
        Self::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_business_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.opportunity.sites.len(), 4);
        assert!(cfg.opportunity.category_prefixes.contains(&"P1".to_string()));
        assert_eq!(cfg.opportunity.spend_floor, 50_000.0);
        assert_eq!(cfg.opportunity.opportunity_ceiling, -5_000.0);
        assert_eq!(cfg.open_po.rates.get("USD"), Some(&0.93));
        assert_eq!(cfg.open_po.reference_currency, "EUR");
    }

    #[test]
    fn list_settings_overlay_from_env() {
        std::env::set_var("PROCUREMENT__OPPORTUNITY__SITES", "IN Pune,IN Chennai");
        std::env::set_var("PROCUREMENT__OPEN_PO__INTRA_GROUP_MARKERS", "SCHNEIDER");
        std::env::set_var("PROCUREMENT__OPPORTUNITY__SPEND_FLOOR", "75000");
        let cfg = AppConfig::load("/nonexistent/procurement-recon-env-test");
        std::env::remove_var("PROCUREMENT__OPPORTUNITY__SITES");
        std::env::remove_var("PROCUREMENT__OPEN_PO__INTRA_GROUP_MARKERS");
        std::env::remove_var("PROCUREMENT__OPPORTUNITY__SPEND_FLOOR");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.opportunity.sites, vec!["IN Pune".to_string(), "IN Chennai".to_string()]);
        assert_eq!(cfg.open_po.intra_group_markers, vec!["SCHNEIDER".to_string()]);
        assert_eq!(cfg.opportunity.spend_floor, 75_000.0);
        assert_eq!(cfg.opportunity.category_prefixes.len(), 12);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AppConfig::load("/nonexistent/procurement-recon-test").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.opportunity.top_n, 5);
    }
}
