use bigdecimal::BigDecimal;
use std::collections::HashMap;

use crate::config::OpenPoConfig;
use crate::error::{PipelineError, Result};
use crate::models::table::decimal_from_f64;

/// 汇率表: 币种 -> 参考币种
#[derive(Debug, Clone)]
pub struct CurrencyTable {
    reference: String,
    rates: HashMap<String, BigDecimal>,
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl CurrencyTable {
    pub fn new(reference: &str) -> Self {
        Self {
            reference: normalize_code(reference),
            rates: HashMap::new(),
        }
    }

    pub fn with_rate(mut self, code: &str, rate: BigDecimal) -> Self {
        self.rates.insert(normalize_code(code), rate);
        self
    }

    pub fn from_config(cfg: &OpenPoConfig) -> Result<Self> {
        let mut table = Self::new(&cfg.reference_currency);
        for (code, rate) in &cfg.rates {
            let rate = decimal_from_f64(*rate).ok_or_else(|| {
                config::ConfigError::Message(format!("open_po.rates.{} is not a finite number", code))
            })?;
            table = table.with_rate(code, rate);
        }
        Ok(table)
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// 参考币种本身按 1 换算
    pub fn rate(&self, code: &str) -> Option<BigDecimal> {
        let code = normalize_code(code);
        match self.rates.get(&code) {
            Some(rate) => Some(rate.clone()),
            None if code == self.reference => Some(BigDecimal::from(1)),
            None => None,
        }
    }

    /// 未知币种返回 UnknownCurrency, 不产生无效数值
    pub fn convert(&self, price: &BigDecimal, code: &str) -> Result<BigDecimal> {
        let rate = self.rate(code).ok_or_else(|| PipelineError::UnknownCurrency {
            code: code.trim().to_string(),
            reference: self.reference.clone(),
        })?;
        Ok(price * &rate)
    }
}
