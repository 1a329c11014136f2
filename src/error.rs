use thiserror::Error;

/// 流水线错误
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 缺少必需列 (按映射顺序列出)
    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// 汇率表中没有该币种
    #[error("Unknown currency code: '{code}' (no conversion rate to {reference})")]
    UnknownCurrency { code: String, reference: String },

    /// 派生指标依赖的值无法解析
    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Input file has no header row: {0}")]
    EmptyInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
