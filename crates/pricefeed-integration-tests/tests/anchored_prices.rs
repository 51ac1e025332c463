//! Integration test: posting reporter prices against exchange anchors.
//!
//! Exercises the batch lifecycle of the anchored view:
//! 1. Reporter prices within tolerance of the TWAP anchor are published
//! 2. Prices outside tolerance are guarded and leave the prior price intact
//! 3. Observation windows rotate only after a full anchor period
//! 4. Stale, replayed, future and foreign reports are ignored
//! 5. Malformed batches fail as a whole without touching state
//! 6. Fixed-price assets and 36-decimal underlying values

use alloy_primitives::U256;
use pricefeed_crypto::secp256k1::ReporterKey;
use pricefeed_integration_tests::*;
use pricefeed_oracle::OracleError;
use pricefeed_types::events::{EntryOutcome, OracleEvent};
use pricefeed_types::UNDERLYING_PRICE_SCALE;

const PERIOD: u64 = 30 * 60;

#[test]
fn test_prices_within_bounds_are_published() {
    init_tracing();
    let key = reporter();
    let mut view = standard_view(PERIOD);
    let now = BASE_TIME + 60;
    trade_at(view.markets_mut(), now, usd(200), usd(10_000), usd(1));

    let (messages, signatures) = sign_prices(
        &key,
        &[
            (now - 5, "ETH", usd(201)),
            (now - 5, "BTC", usd(9_950)),
            (now - 5, "DAI", 1_010_000),
        ],
    );
    let report = view
        .post_prices(&messages, &signatures, &["ETH", "BTC", "DAI"], now)
        .expect("post");

    assert!(report.outcomes.iter().all(EntryOutcome::is_published));
    assert_eq!(view.price("ETH").expect("ETH"), usd(201));
    assert_eq!(view.price("BTC").expect("BTC"), usd(9_950));
    assert_eq!(view.price("DAI").expect("DAI"), 1_010_000);

    let anchors: Vec<(String, u64)> = report
        .events
        .iter()
        .filter_map(|event| match event {
            OracleEvent::AnchorPriceUpdated {
                symbol,
                anchor_price,
                ..
            } => Some((symbol.clone(), *anchor_price)),
            _ => None,
        })
        .collect();
    // The native anchor is computed once and shared by the other assets.
    assert_eq!(
        anchors,
        vec![
            ("ETH".to_string(), usd(200)),
            ("BTC".to_string(), usd(10_000)),
            ("DAI".to_string(), usd(1)),
        ]
    );
}

#[test]
fn test_equal_anchor_accepted_and_far_anchor_guarded() {
    init_tracing();
    let key = reporter();
    let mut view = standard_view(60);
    let first = BASE_TIME + 60;
    trade_at(view.markets_mut(), first, 91_000_000, usd(10_000), usd(1));

    let (messages, signatures) = sign_prices(&key, &[(first, "ETH", 91_000_000)]);
    let report = view
        .post_prices(&messages, &signatures, &["ETH"], first)
        .expect("post");
    assert!(report.events.contains(&OracleEvent::PriceUpdated {
        symbol: "ETH".to_string(),
        price: 91_000_000,
    }));
    assert!(!report
        .events
        .iter()
        .any(|event| matches!(event, OracleEvent::PriceGuarded { .. })));

    // The next window only covers trading at 89.9.
    let second = first + 60;
    trade_at(view.markets_mut(), second, 89_900_000, usd(10_000), usd(1));
    let (messages, signatures) = sign_prices(&key, &[(second, "ETH", usd(100))]);
    let report = view
        .post_prices(&messages, &signatures, &["ETH"], second)
        .expect("post");

    assert!(report.events.contains(&OracleEvent::PriceGuarded {
        symbol: "ETH".to_string(),
        reporter: usd(100),
        anchor: 89_900_000,
    }));
    assert!(!report
        .events
        .iter()
        .any(|event| matches!(event, OracleEvent::PriceUpdated { .. })));
    assert_eq!(view.price("ETH").expect("ETH"), 91_000_000);
    // The rejected value is still checkpointed.
    assert_eq!(view.store().price(&key.address(), "ETH"), usd(100));
}

#[test]
fn test_window_rotates_once_per_period() {
    init_tracing();
    let key = reporter();
    let mut view = standard_view(PERIOD);
    let start = *view.observations("ETH").expect("ETH window");

    let early = BASE_TIME + 60;
    trade_at(view.markets_mut(), early, usd(200), usd(10_000), usd(1));
    let (messages, signatures) = sign_prices(&key, &[(early, "ETH", usd(200))]);
    let report = view
        .post_prices(&messages, &signatures, &["ETH"], early)
        .expect("post");
    assert!(!report
        .events
        .iter()
        .any(|event| matches!(event, OracleEvent::WindowUpdated { .. })));
    assert_eq!(*view.observations("ETH").expect("ETH window"), start);

    let rotate = BASE_TIME + PERIOD;
    trade_at(view.markets_mut(), rotate, usd(200), usd(10_000), usd(1));
    let (messages, signatures) = sign_prices(&key, &[(rotate, "ETH", usd(200))]);
    let report = view
        .post_prices(&messages, &signatures, &["ETH"], rotate)
        .expect("post");
    let window = *view.observations("ETH").expect("ETH window");
    assert_eq!(window.old, start.new);
    assert_eq!(window.new.timestamp, clock(rotate));
    assert!(report.events.contains(&OracleEvent::WindowUpdated {
        symbol_hash: pricefeed_crypto::keccak::symbol_hash("ETH"),
        old_timestamp: clock(BASE_TIME),
        new_timestamp: clock(rotate),
        old_accumulator: start.new.accumulator,
        new_accumulator: window.new.accumulator,
    }));

    let again = rotate + PERIOD;
    trade_at(view.markets_mut(), again, usd(200), usd(10_000), usd(1));
    let (messages, signatures) = sign_prices(&key, &[(again, "ETH", usd(200))]);
    view.post_prices(&messages, &signatures, &["ETH"], again)
        .expect("post");
    let rotated = view.observations("ETH").expect("ETH window");
    assert_eq!(rotated.old, window.new);
    assert_eq!(rotated.new.timestamp, clock(again));
    // BTC was never posted, so its window never moved.
    assert_eq!(view.observations("BTC").expect("BTC window").new.timestamp, clock(BASE_TIME));
}

#[test]
fn test_stale_and_future_reports_are_ignored() {
    init_tracing();
    let key = reporter();
    let mut view = standard_view(PERIOD);
    let now = BASE_TIME + 120;
    trade_at(view.markets_mut(), now, usd(200), usd(10_000), usd(1));

    let (messages, signatures) = sign_prices(&key, &[(now - 10, "ETH", usd(200))]);
    view.post_prices(&messages, &signatures, &["ETH"], now)
        .expect("post");

    // Replay of the same report.
    let report = view
        .post_prices(&messages, &signatures, &["ETH"], now)
        .expect("replay");
    assert_eq!(
        report.outcomes,
        vec![EntryOutcome::Ignored { symbol: "ETH".to_string() }]
    );
    assert!(matches!(
        report.events.as_slice(),
        [OracleEvent::UpdateFailed { prior_timestamp, message_timestamp, .. }]
            if *prior_timestamp == now - 10 && *message_timestamp == now - 10
    ));

    // Older and future reports.
    let (messages, signatures) = sign_prices(
        &key,
        &[(now - 20, "ETH", usd(150)), (now + 1, "ETH", usd(150))],
    );
    let report = view
        .post_prices(&messages, &signatures, &["ETH"], now)
        .expect("post");
    assert_eq!(report.events.len(), 2);
    assert!(report
        .events
        .iter()
        .all(|event| matches!(event, OracleEvent::UpdateFailed { .. })));
    assert_eq!(view.price("ETH").expect("ETH"), usd(200));
    assert_eq!(view.store().get(&key.address(), "ETH").timestamp, now - 10);
}

#[test]
fn test_foreign_signer_is_ignored_in_mixed_batch() {
    init_tracing();
    let key = reporter();
    let stranger = ReporterKey::generate();
    let mut view = standard_view(PERIOD);
    let now = BASE_TIME + 60;
    trade_at(view.markets_mut(), now, usd(200), usd(10_000), usd(1));

    let (mut messages, mut signatures) = sign_prices(&key, &[(now, "ETH", usd(200))]);
    let (foreign_messages, foreign_signatures) = sign_prices(&stranger, &[(now, "BTC", usd(10_000))]);
    messages.extend(foreign_messages);
    signatures.extend(foreign_signatures);

    let report = view
        .post_prices(&messages, &signatures, &["ETH", "BTC"], now)
        .expect("post");
    assert_eq!(
        report.outcomes,
        vec![
            EntryOutcome::Published {
                symbol: "ETH".to_string(),
                price: usd(200),
            },
            EntryOutcome::Ignored { symbol: "BTC".to_string() },
        ]
    );
    assert_eq!(view.price("BTC").expect("BTC"), 0);
    assert_eq!(view.store().price(&stranger.address(), "BTC"), usd(10_000));
}

#[test]
fn test_malformed_batches_change_nothing() {
    init_tracing();
    let key = reporter();
    let mut view = standard_view(PERIOD);
    let start = *view.observations("ETH").expect("ETH window");
    let now = BASE_TIME + 60;
    trade_at(view.markets_mut(), now, usd(200), usd(10_000), usd(1));
    let (messages, signatures) = sign_prices(&key, &[(now, "ETH", usd(200)), (now, "BTC", usd(10_000))]);

    let err = view
        .post_prices(&messages, &signatures[..1], &["ETH"], now)
        .unwrap_err();
    assert!(matches!(err, OracleError::LengthMismatch { messages: 2, signatures: 1 }));

    let err = view
        .post_prices(&messages, &signatures, &["ETH", "COMP"], now)
        .unwrap_err();
    assert!(matches!(err, OracleError::ConfigNotFound(symbol) if symbol == "COMP"));

    let err = view
        .post_prices(&messages, &signatures, &["ETH", "USDT"], now)
        .unwrap_err();
    assert!(matches!(err, OracleError::PriceSourceMismatch { symbol } if symbol == "USDT"));

    let mut bad_signatures = signatures.clone();
    bad_signatures[1][95] = 0;
    let err = view
        .post_prices(&messages, &bad_signatures, &["ETH", "BTC"], now)
        .unwrap_err();
    assert!(matches!(err, OracleError::Crypto(_)));

    assert_eq!(view.store().get(&key.address(), "ETH").timestamp, 0);
    assert_eq!(view.price("ETH").expect("ETH"), 0);
    assert_eq!(*view.observations("ETH").expect("ETH window"), start);

    // The same batch succeeds once well-formed.
    let report = view
        .post_prices(&messages, &signatures, &["ETH", "BTC"], now)
        .expect("post");
    assert!(report.outcomes.iter().all(EntryOutcome::is_published));
}

#[test]
fn test_underlying_values() {
    init_tracing();
    let key = reporter();
    let mut view = standard_view(PERIOD);

    assert_eq!(
        view.underlying_value(&USDT_ASSET).expect("USDT"),
        U256::from(UNDERLYING_PRICE_SCALE)
    );
    assert!(matches!(
        view.underlying_value(&SAI_ASSET),
        Err(OracleError::PriceNotSet(symbol)) if symbol == "ETH"
    ));
    assert_eq!(view.underlying_value(&ETH_ASSET).expect("ETH"), U256::ZERO);

    let now = BASE_TIME + 60;
    trade_at(view.markets_mut(), now, usd(200), usd(10_000), usd(1));
    let (messages, signatures) = sign_prices(&key, &[(now, "ETH", usd(200)), (now, "BTC", usd(10_000))]);
    view.post_prices(&messages, &signatures, &["ETH", "BTC"], now)
        .expect("post");

    let e18 = U256::from(1_000_000_000_000_000_000u128);
    assert_eq!(view.underlying_value(&ETH_ASSET).expect("ETH"), U256::from(200u64) * e18);
    assert_eq!(
        view.underlying_value(&BTC_ASSET).expect("BTC"),
        U256::from(100_000_000_000_000u64) * e18
    );
    // 0.005 ETH at $200.
    assert_eq!(view.price("SAI").expect("SAI"), usd(1));
    assert_eq!(view.underlying_value(&SAI_ASSET).expect("SAI"), e18);
    assert!(matches!(
        view.underlying_value(&alloy_primitives::Address::repeat_byte(0x77)),
        Err(OracleError::ConfigNotFound(_))
    ));
}
