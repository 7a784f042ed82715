//! Named-field binding for [`Trade`].
//!
//! Structured sources (a CSV row, a key/value message, a line of text) hand
//! over values as text keyed by a field name. Instead of reflecting over the
//! struct, each name is bound to a plain setter function in [`FIELDS`].
//!
//! - [`set_field`] binds a single `name = value` pair.
//! - [`FieldMapper`] resolves a header row once, then maps every record of
//!   that source without repeating the name lookups.

use tracing::warn;

use crate::{errors::TradeError, trade::Trade};

/// Parses `value` and writes it into one field of `trade`.
pub type FieldSetter = fn(&mut Trade, &str) -> Result<(), TradeError>;

/// The binding table, in canonical column order.
pub const FIELDS: &[(&str, FieldSetter)] = &[
    ("time", bind_time),
    ("ticker", bind_ticker),
    ("quantity", bind_quantity),
    ("price", bind_price),
];

fn parse_i64(field: &'static str, value: &str) -> Result<i64, TradeError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| TradeError::InvalidValue {
            field,
            value: value.to_string(),
        })
}

fn bind_time(trade: &mut Trade, value: &str) -> Result<(), TradeError> {
    trade.set_time(parse_i64("time", value)?);
    Ok(())
}

fn bind_ticker(trade: &mut Trade, value: &str) -> Result<(), TradeError> {
    trade.set_ticker(Some(value.trim().to_string()));
    Ok(())
}

fn bind_quantity(trade: &mut Trade, value: &str) -> Result<(), TradeError> {
    trade.set_quantity(parse_i64("quantity", value)?);
    Ok(())
}

fn bind_price(trade: &mut Trade, value: &str) -> Result<(), TradeError> {
    trade.set_price(parse_i64("price", value)?);
    Ok(())
}

/// Field names in canonical order, e.g. for a CSV header.
pub fn field_names() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|(name, _)| *name)
}

/// Looks up the setter bound to `name` (surrounding whitespace and case are ignored).
pub fn setter(name: &str) -> Option<FieldSetter> {
    let name = name.trim();
    FIELDS
        .iter()
        .find(|(field, _)| field.eq_ignore_ascii_case(name))
        .map(|(_, set)| *set)
}

/// Binds one textual value to the field called `name`.
pub fn set_field(trade: &mut Trade, name: &str, value: &str) -> Result<(), TradeError> {
    let set = setter(name).ok_or_else(|| TradeError::UnknownField(name.to_string()))?;
    set(trade, value)
}

/// A header row resolved to one optional setter per column.
///
/// Columns with no matching field are skipped, unless the mapper was built
/// `strict`, in which case they are rejected up front.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    columns: Vec<Option<FieldSetter>>,
}

impl FieldMapper {
    pub fn from_headers<I, S>(headers: I, strict: bool) -> Result<Self, TradeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = Vec::new();
        for header in headers {
            let header = header.as_ref();
            match setter(header) {
                Some(set) => columns.push(Some(set)),
                None if strict => return Err(TradeError::UnknownField(header.to_string())),
                None => {
                    warn!(column = header, "ignoring column with no matching trade field");
                    columns.push(None);
                }
            }
        }
        Ok(FieldMapper { columns })
    }

    /// Number of header columns, bound or not.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Builds a trade from one record's values, positionally matched to the header.
    ///
    /// Fields the header doesn't name keep their defaults; values past the
    /// header width are ignored.
    pub fn map<I, S>(&self, values: I) -> Result<Trade, TradeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trade = Trade::default();
        for (set, value) in self.columns.iter().zip(values) {
            if let Some(set) = set {
                set(&mut trade, value.as_ref())?;
            }
        }
        Ok(trade)
    }
}
