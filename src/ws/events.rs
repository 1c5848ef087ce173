use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::ws::data::private::{
    AccountEvent, BalanceAndPositionEvent, OrdersEvent, PositionsEvent,
};
use crate::ws::data::public::{
    CandlesticksEvent, EstimatedPriceEvent, FundingRateEvent, IndexCandlesticksEvent,
    IndexTickersEvent, InstrumentsEvent, MarkPriceCandlesticksEvent, MarkPriceEvent,
    OpenInterestEvent, OptionSummaryEvent, OrderBookEvent, PriceLimitEvent, TickersEvent,
    TradesEvent,
};

/// Response codes arrive as a JSON string on acknowledgement frames and as a
/// number on a few error shapes; accept both.
fn de_opt_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Num(i64),
        Str(String),
    }

    match Option::<Code>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Code::Num(n)) => Ok(Some(n)),
        Some(Code::Str(s)) if s.is_empty() => Ok(None),
        Some(Code::Str(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid response code: {}", s))),
    }
}

/// Minimal decode of any inbound frame, used to decide how to fully decode it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub event: Option<String>,
    pub id: Option<String>,
    #[serde(deserialize_with = "de_opt_code")]
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub arg: Option<BTreeMap<String, String>>,
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    /// The channel name recovered from the argument mapping, if any.
    pub fn channel(&self) -> Option<&str> {
        self.arg.as_ref()?.get("channel").map(String::as_str)
    }

    /// A frame with an empty event tag but a non-empty argument mapping and
    /// non-empty payload is a data event.
    pub fn is_data_frame(&self) -> bool {
        let no_event = self.event.as_deref().map_or(true, str::is_empty);
        let has_arg = self.arg.as_ref().map_or(false, |a| !a.is_empty());
        let has_data = self.data.as_ref().map_or(false, |d| match d {
            serde_json::Value::Array(items) => !items.is_empty(),
            serde_json::Value::Null => false,
            _ => true,
        });
        no_event && has_arg && has_data
    }

    /// Venue code, defaulting to success when absent.
    pub fn code_or_zero(&self) -> i64 {
        self.code.unwrap_or(0)
    }
}

/// Channel identification attached to acknowledgements and data pushes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelArg {
    pub channel: String,
    pub inst_id: Option<String>,
    pub inst_type: Option<String>,
    pub inst_family: Option<String>,
    pub uid: Option<String>,
}

/// Venue-reported error event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorEvent {
    pub event: Option<String>,
    pub id: Option<String>,
    #[serde(deserialize_with = "de_opt_code")]
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub conn_id: Option<String>,
}

/// Subscription acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscribeAck {
    pub arg: Option<ChannelArg>,
    pub conn_id: Option<String>,
}

/// Unsubscription acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnsubscribeAck {
    pub arg: Option<ChannelArg>,
    pub conn_id: Option<String>,
}

/// Login acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginAck {
    pub event: Option<String>,
    #[serde(deserialize_with = "de_opt_code")]
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub conn_id: Option<String>,
}

/// Generic success acknowledgement for an id-correlated request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuccessAck {
    pub id: Option<String>,
    pub op: Option<String>,
    #[serde(deserialize_with = "de_opt_code")]
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// One data push for a topic family: the identifying argument plus a batch of
/// typed rows.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicEvent<T> {
    pub arg: ChannelArg,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Every decoded event, regardless of topic, as delivered to the generic
/// structured sink. Venue errors are excluded - they go to the error sink
/// only.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Subscribe(SubscribeAck),
    Unsubscribe(UnsubscribeAck),
    Login(LoginAck),
    Success(SuccessAck),
    Instruments(InstrumentsEvent),
    Tickers(TickersEvent),
    OpenInterest(OpenInterestEvent),
    Candlesticks(CandlesticksEvent),
    Trades(TradesEvent),
    EstimatedPrice(EstimatedPriceEvent),
    MarkPrice(MarkPriceEvent),
    MarkPriceCandlesticks(MarkPriceCandlesticksEvent),
    PriceLimit(PriceLimitEvent),
    OrderBook(OrderBookEvent),
    OptionSummary(OptionSummaryEvent),
    FundingRate(FundingRateEvent),
    IndexCandlesticks(IndexCandlesticksEvent),
    IndexTickers(IndexTickersEvent),
    Account(AccountEvent),
    Positions(PositionsEvent),
    BalanceAndPosition(BalanceAndPositionEvent),
    Orders(OrdersEvent),
}
