use serde::{Deserialize, Deserializer};

use crate::ws::events::TopicEvent;

pub type InstrumentsEvent = TopicEvent<Instrument>;
pub type TickersEvent = TopicEvent<Ticker>;
pub type OpenInterestEvent = TopicEvent<OpenInterest>;
pub type CandlesticksEvent = TopicEvent<Candle>;
pub type TradesEvent = TopicEvent<PublicTrade>;
pub type EstimatedPriceEvent = TopicEvent<EstimatedPrice>;
pub type MarkPriceEvent = TopicEvent<MarkPrice>;
pub type MarkPriceCandlesticksEvent = TopicEvent<PriceCandle>;
pub type PriceLimitEvent = TopicEvent<PriceLimit>;
pub type OrderBookEvent = TopicEvent<OrderBookSnapshot>;
pub type OptionSummaryEvent = TopicEvent<OptionSummary>;
pub type FundingRateEvent = TopicEvent<FundingRate>;
pub type IndexCandlesticksEvent = TopicEvent<PriceCandle>;
pub type IndexTickersEvent = TopicEvent<IndexTicker>;

/// Instrument definition push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instrument {
    pub inst_type: String,
    pub inst_id: String,
    pub uly: Option<String>,
    pub base_ccy: Option<String>,
    pub quote_ccy: Option<String>,
    pub settle_ccy: Option<String>,
    pub ct_val: Option<String>,
    pub lever: Option<String>,
    pub tick_sz: String,
    pub lot_sz: String,
    pub min_sz: String,
    pub state: String,
}

/// Ticker push: last traded price, best bid/ask and 24h volumes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ticker {
    pub inst_type: String,
    pub inst_id: String,
    pub last: String,
    pub last_sz: String,
    pub ask_px: String,
    pub ask_sz: String,
    pub bid_px: String,
    pub bid_sz: String,
    pub open_24h: String,
    pub high_24h: String,
    pub low_24h: String,
    pub vol_ccy_24h: String,
    pub vol_24h: String,
    pub ts: String,
}

/// Open interest push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenInterest {
    pub inst_type: String,
    pub inst_id: String,
    pub oi: String,
    pub oi_ccy: String,
    pub ts: String,
}

/// Candlestick row for trade-price candles
///
/// The venue pushes rows as positional string arrays:
/// [ts, open, high, low, close, vol, volCcy, volCcyQuote, confirm].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candle {
    pub ts: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub vol: Option<String>,
    pub vol_ccy: Option<String>,
    pub vol_ccy_quote: Option<String>,
    pub confirm: Option<String>,
}

impl<'de> Deserialize<'de> for Candle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let row = Vec::<String>::deserialize(deserializer)?;
        if row.len() < 5 {
            return Err(serde::de::Error::invalid_length(
                row.len(),
                &"at least 5 candle columns",
            ));
        }
        let mut cols = row.into_iter();
        Ok(Self {
            ts: cols.next().unwrap_or_default(),
            open: cols.next().unwrap_or_default(),
            high: cols.next().unwrap_or_default(),
            low: cols.next().unwrap_or_default(),
            close: cols.next().unwrap_or_default(),
            vol: cols.next(),
            vol_ccy: cols.next(),
            vol_ccy_quote: cols.next(),
            confirm: cols.next(),
        })
    }
}

/// Candlestick row for mark-price and index candles
///
/// Positional string array: [ts, open, high, low, close, confirm].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceCandle {
    pub ts: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub confirm: Option<String>,
}

impl<'de> Deserialize<'de> for PriceCandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let row = Vec::<String>::deserialize(deserializer)?;
        if row.len() < 5 {
            return Err(serde::de::Error::invalid_length(
                row.len(),
                &"at least 5 candle columns",
            ));
        }
        let mut cols = row.into_iter();
        Ok(Self {
            ts: cols.next().unwrap_or_default(),
            open: cols.next().unwrap_or_default(),
            high: cols.next().unwrap_or_default(),
            low: cols.next().unwrap_or_default(),
            close: cols.next().unwrap_or_default(),
            confirm: cols.next(),
        })
    }
}

/// Public trade push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicTrade {
    pub inst_id: String,
    pub trade_id: String,
    pub px: String,
    pub sz: String,
    pub side: String,
    pub ts: String,
}

/// Estimated delivery/exercise price push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimatedPrice {
    pub inst_type: String,
    pub inst_id: String,
    pub settle_px: String,
    pub ts: String,
}

/// Mark price push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkPrice {
    pub inst_type: String,
    pub inst_id: String,
    pub mark_px: String,
    pub ts: String,
}

/// Price limit push: maximum buy and minimum sell prices
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceLimit {
    pub inst_id: String,
    pub buy_lmt: String,
    pub sell_lmt: String,
    pub ts: String,
}

/// Order book snapshot or incremental update
///
/// Levels are positional string arrays [price, size, liquidated_orders,
/// order_count], kept venue-native.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderBookSnapshot {
    pub asks: Vec<Vec<String>>,
    pub bids: Vec<Vec<String>>,
    pub ts: String,
    pub checksum: Option<i64>,
}

/// Option market summary push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionSummary {
    pub inst_type: String,
    pub inst_id: String,
    pub uly: String,
    pub delta: String,
    pub gamma: String,
    pub theta: String,
    pub vega: String,
    pub mark_vol: String,
    pub ts: String,
}

/// Funding rate push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FundingRate {
    pub inst_type: String,
    pub inst_id: String,
    pub funding_rate: String,
    pub next_funding_rate: Option<String>,
    pub funding_time: String,
}

/// Index ticker push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexTicker {
    pub inst_id: String,
    pub idx_px: String,
    pub open_24h: String,
    pub high_24h: String,
    pub low_24h: String,
    pub sod_utc0: String,
    pub sod_utc8: String,
    pub ts: String,
}
