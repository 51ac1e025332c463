//! Integration test crate for the anchored price feed.
//!
//! Holds fixtures shared by the end-to-end scenarios under `tests/`: a
//! deterministic reporter key, a standard token list, in-memory reference
//! markets and helpers to drive their counters at chosen prices.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p pricefeed-integration-tests
//! ```

use alloy_primitives::{Address, U256};
use hex_literal::hex;
use pricefeed_crypto::keccak;
use pricefeed_crypto::secp256k1::ReporterKey;
use pricefeed_oracle::market::{InMemoryMarkets, MarketSnapshot};
use pricefeed_oracle::message::encode_price_message;
use pricefeed_oracle::view::{AnchoredPriceView, ViewParams};
use pricefeed_types::token::{PriceSource, TokenConfig};
use pricefeed_types::{EXP_SCALE, PRICE_SCALE, RESOLUTION};

/// Base timestamp for every scenario.
pub const BASE_TIME: u64 = 1_600_000_000;

/// 10 % anchor tolerance.
pub const TEN_PERCENT: u128 = 100_000_000_000_000_000;

pub const ETH_MARKET: Address = Address::repeat_byte(0xe0);
pub const BTC_MARKET: Address = Address::repeat_byte(0xb0);
pub const DAI_MARKET: Address = Address::repeat_byte(0xd0);

pub const ETH_ASSET: Address = Address::repeat_byte(0x01);
pub const BTC_ASSET: Address = Address::repeat_byte(0x02);
pub const DAI_ASSET: Address = Address::repeat_byte(0x03);
pub const USDT_ASSET: Address = Address::repeat_byte(0x04);
pub const SAI_ASSET: Address = Address::repeat_byte(0x05);

/// SAI is pegged at 0.005 ETH.
pub const SAI_PER_ETH: u128 = 5_000_000_000_000_000;

const REPORTER_SECRET: [u8; 32] =
    hex!("177ee777e72b8c042e05ef41d1db0f17f1fcb0e8150b37cfad6993e4373bdf10");

/// Install a test-writer subscriber honoring `RUST_LOG`. Idempotent.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The reporter every scenario trusts.
pub fn reporter() -> ReporterKey {
    ReporterKey::from_bytes(&REPORTER_SECRET).expect("fixture secret is a valid scalar")
}

/// `$price` with six decimals.
pub fn usd(price: u64) -> u64 {
    price * PRICE_SCALE
}

/// UQ112x112 encoding of an 18-decimal rate, rounded up so that it decodes
/// back to exactly `rate`.
pub fn uq112(rate: U256) -> U256 {
    let exp = U256::from(EXP_SCALE);
    ((rate << RESOLUTION) + exp - U256::from(1u8)) / exp
}

/// 18-decimal rate of one raw token unit in raw native units, for a token
/// worth `token_usd` when the native asset is worth `native_usd`.
pub fn native_rate(token_usd: u64, token_base_unit: U256, native_usd: u64) -> U256 {
    U256::from(token_usd) * U256::from(EXP_SCALE) * U256::from(EXP_SCALE)
        / (U256::from(native_usd) * token_base_unit)
}

pub fn reporter_config(
    symbol: &str,
    asset: Address,
    base_unit: U256,
    market: Address,
    market_reversed: bool,
) -> TokenConfig {
    TokenConfig {
        asset,
        underlying: asset,
        symbol_hash: keccak::symbol_hash(symbol),
        base_unit,
        price_source: PriceSource::Reporter,
        fixed_price: U256::ZERO,
        market: Some(market),
        market_reversed,
    }
}

pub fn fixed_config(
    symbol: &str,
    asset: Address,
    base_unit: U256,
    price_source: PriceSource,
    fixed_price: U256,
) -> TokenConfig {
    TokenConfig {
        asset,
        underlying: asset,
        symbol_hash: keccak::symbol_hash(symbol),
        base_unit,
        price_source,
        fixed_price,
        market: None,
        market_reversed: false,
    }
}

/// ETH, BTC and DAI priced by the reporter; USDT fixed at $1; SAI fixed
/// in ETH.
pub fn standard_configs() -> Vec<TokenConfig> {
    vec![
        reporter_config("ETH", ETH_ASSET, U256::from(EXP_SCALE), ETH_MARKET, true),
        reporter_config("BTC", BTC_ASSET, U256::from(100_000_000u64), BTC_MARKET, false),
        reporter_config("DAI", DAI_ASSET, U256::from(EXP_SCALE), DAI_MARKET, false),
        fixed_config(
            "USDT",
            USDT_ASSET,
            U256::from(PRICE_SCALE),
            PriceSource::FixedUsd,
            U256::from(PRICE_SCALE),
        ),
        fixed_config(
            "SAI",
            SAI_ASSET,
            U256::from(EXP_SCALE),
            PriceSource::FixedEth,
            U256::from(SAI_PER_ETH),
        ),
    ]
}

/// Reference markets for [`standard_configs`], all last touched at `now`.
pub fn standard_markets(now: u64) -> InMemoryMarkets {
    let mut markets = InMemoryMarkets::new();
    for market in [ETH_MARKET, BTC_MARKET, DAI_MARKET] {
        markets.insert(
            market,
            MarketSnapshot {
                last_update: clock(now),
                ..MarketSnapshot::default()
            },
        );
    }
    markets
}

/// A view over the standard token list, trusting [`reporter`].
pub fn standard_view(anchor_period: u64) -> AnchoredPriceView<InMemoryMarkets> {
    let mut params = ViewParams::new(reporter().address(), U256::from(TEN_PERCENT));
    params.anchor_period = anchor_period;
    AnchoredPriceView::new(params, standard_configs(), standard_markets(BASE_TIME), BASE_TIME)
        .expect("standard view")
}

/// Accrue the standard markets up to `now` at constant USD prices.
pub fn trade_at(markets: &mut InMemoryMarkets, now: u64, eth_usd: u64, btc_usd: u64, dai_usd: u64) {
    let now = clock(now);
    // ETH is the second asset of its pair, quoted in 6-decimal units.
    let eth = uq112(U256::from(eth_usd));
    assert!(markets.accrue(&ETH_MARKET, U256::ZERO, eth, now));

    let btc = uq112(native_rate(btc_usd, U256::from(100_000_000u64), eth_usd));
    assert!(markets.accrue(&BTC_MARKET, btc, U256::ZERO, now));

    let dai = uq112(native_rate(dai_usd, U256::from(EXP_SCALE), eth_usd));
    assert!(markets.accrue(&DAI_MARKET, dai, U256::ZERO, now));
}

/// Encode and sign one price report per `(timestamp, symbol, value)`.
pub fn sign_prices(key: &ReporterKey, entries: &[(u64, &str, u64)]) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
    entries
        .iter()
        .map(|(timestamp, symbol, value)| {
            let message = encode_price_message(*timestamp, symbol, *value);
            let signature = key.sign(&message).expect("sign price report");
            (message, signature)
        })
        .unzip()
}

/// The exchange's 32-bit clock.
pub fn clock(now: u64) -> u32 {
    u32::try_from(now & u64::from(u32::MAX)).expect("masked to 32 bits")
}
