use std::fmt;

use crate::errors::TradeError;

/// A trade is one exchange of a financial instrument between two market
/// participants at a point in time.
///
/// # Terminology
/// - **Ticker**: short name of the instrument being traded, most often a stock symbol.
/// - **Quantity**: the amount of the instrument that changed hands.
/// - **Price**: the price at which the transaction took place.
///
/// # Construction
/// - [`Trade::default`] yields zeroed fields and no ticker. The field mapper
///   starts from this and binds each column through the setters.
/// - [`Trade::try_new`] is the checked constructor: an absent ticker is rejected
///   with [`TradeError::MissingTicker`].
/// - [`Trade::new`] takes the ticker by value, so it cannot be absent.
///
/// The setters never validate, including [`Trade::set_ticker`].
///
/// Example:
/// - `Trade::new(1_650_000_000_000, "AAPL", 100, 15000)` displays as
///   `Trade{time=1650000000000, ticker='AAPL', quantity=100, price=15000}`.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(default)]
pub struct Trade {
    time: i64,
    ticker: Option<String>,
    quantity: i64,
    price: i64,
}

impl Trade {
    pub fn new(time: i64, ticker: impl Into<String>, quantity: i64, price: i64) -> Self {
        Trade {
            time,
            ticker: Some(ticker.into()),
            quantity,
            price,
        }
    }

    /// Builds a trade, failing when `ticker` is `None`.
    pub fn try_new<S: Into<String>>(
        time: i64,
        ticker: Option<S>,
        quantity: i64,
        price: i64,
    ) -> Result<Self, TradeError> {
        let ticker = ticker.ok_or(TradeError::MissingTicker)?;
        Ok(Trade::new(time, ticker, quantity, price))
    }

    /// Event time of the trade.
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Name of the instrument being traded.
    pub fn ticker(&self) -> Option<&str> {
        self.ticker.as_deref()
    }

    /// Amount of the instrument that has been traded.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Price at which the transaction took place.
    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn set_time(&mut self, time: i64) {
        self.time = time;
    }

    pub fn set_ticker(&mut self, ticker: Option<String>) {
        self.ticker = ticker;
    }

    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    pub fn set_price(&mut self, price: i64) {
        self.price = price;
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade{{time={}, ticker='{}', quantity={}, price={}}}",
            self.time,
            self.ticker().unwrap_or("null"),
            self.quantity,
            self.price
        )
    }
}
