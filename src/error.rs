use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Tax rate undefined for {date}: tax-exclusive price is zero")]
    ZeroPriceTaxRate { date: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
