use thiserror::Error;

/// Errors raised while building or populating a [`Trade`](crate::trade::Trade).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TradeError {
    #[error("ticker must not be absent")]
    MissingTicker,

    #[error("unknown trade field `{0}`")]
    UnknownField(String),

    #[error("invalid value `{value}` for field `{field}`")]
    InvalidValue { field: &'static str, value: String },
}
