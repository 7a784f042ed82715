use std::collections::HashSet;

use trade_files::{errors::TradeError, mapper, trade::Trade};

#[test]
fn accessors_return_constructor_arguments() {
    let cases = [
        (0, "A", 0, 0),
        (1_650_000_000_000, "AAPL", 100, 15000),
        (i64::MIN, "", i64::MAX, -1),
    ];
    for (time, ticker, quantity, price) in cases {
        let t = Trade::try_new(time, Some(ticker), quantity, price).unwrap();
        assert_eq!(
            (t.time(), t.ticker(), t.quantity(), t.price()),
            (time, Some(ticker), quantity, price)
        );
    }
}

#[test]
fn missing_ticker_is_an_argument_error() {
    let err = Trade::try_new(0, None::<&str>, 0, 0).unwrap_err();
    assert_eq!(err, TradeError::MissingTicker);
    assert_eq!(err.to_string(), "ticker must not be absent");
}

#[test]
fn display_contains_every_field() {
    let s = Trade::new(1_650_000_000_000, "AAPL", 100, 15000).to_string();
    for part in [
        "time=1650000000000",
        "ticker='AAPL'",
        "quantity=100",
        "price=15000",
    ] {
        assert!(s.contains(part), "{s} lacks {part}");
    }
}

#[test]
fn mapper_populates_default_instance_by_name() {
    let mut t = Trade::default();
    for (name, value) in [("ticker", "IBM"), ("price", "120"), ("time", "5"), ("quantity", "3")] {
        mapper::set_field(&mut t, name, value).unwrap();
    }
    assert_eq!(t, Trade::new(5, "IBM", 3, 120));
}

#[test]
fn equal_fields_mean_equal_trades() {
    let a = Trade::new(1, "X", 2, 3);
    let mut b = Trade::default();
    b.set_time(1);
    b.set_ticker(Some("X".into()));
    b.set_quantity(2);
    b.set_price(3);
    assert_eq!(a, b);
    assert_eq!(a.to_string(), b.to_string());

    let set: HashSet<Trade> = [a, b].into_iter().collect();
    assert_eq!(set.len(), 1);
}
