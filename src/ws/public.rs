//! Public topic family: routing and per-topic subscribe helpers.
//!
//! https://www.okx.com/docs-v5/en/#websocket-api-public-channels

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::errors::OkxWsError;
use crate::core::types::to_args;
use crate::ws::client::{FrameRouter, OkxWsClient};
use crate::ws::data::public::{
    CandlesticksEvent, EstimatedPriceEvent, FundingRateEvent, IndexCandlesticksEvent,
    IndexTickersEvent, InstrumentsEvent, MarkPriceCandlesticksEvent, MarkPriceEvent,
    OpenInterestEvent, OptionSummaryEvent, OrderBookEvent, PriceLimitEvent, TickersEvent,
    TradesEvent,
};
use crate::ws::events::{Envelope, StreamEvent};
use crate::ws::requests;
use crate::ws::session::SessionClass;

/// Delivery channels for the public topic families. Owned by the facade and
/// swapped only through the subscribe/unsubscribe helpers.
#[derive(Default)]
pub(crate) struct PublicChannels {
    pub instruments: Option<UnboundedSender<InstrumentsEvent>>,
    pub tickers: Option<UnboundedSender<TickersEvent>>,
    pub open_interest: Option<UnboundedSender<OpenInterestEvent>>,
    pub candlesticks: Option<UnboundedSender<CandlesticksEvent>>,
    pub trades: Option<UnboundedSender<TradesEvent>>,
    pub estimated_price: Option<UnboundedSender<EstimatedPriceEvent>>,
    pub mark_price: Option<UnboundedSender<MarkPriceEvent>>,
    pub mark_price_candles: Option<UnboundedSender<MarkPriceCandlesticksEvent>>,
    pub price_limit: Option<UnboundedSender<PriceLimitEvent>>,
    pub order_book: Option<UnboundedSender<OrderBookEvent>>,
    pub option_summary: Option<UnboundedSender<OptionSummaryEvent>>,
    pub funding_rate: Option<UnboundedSender<FundingRateEvent>>,
    pub index_candles: Option<UnboundedSender<IndexCandlesticksEvent>>,
    pub index_tickers: Option<UnboundedSender<IndexTickersEvent>>,
}

/// Claims public data frames by channel name. Templated channels (candle
/// bars, book depth variants) match by substring; the longer prefixes are
/// tried first so "mark-price-candle3m" never lands on the plain candle
/// topic.
pub(crate) struct PublicRouter;

#[async_trait]
impl FrameRouter for PublicRouter {
    async fn route(&self, client: &OkxWsClient, raw: &str, envelope: &Envelope) -> bool {
        if !envelope.is_data_frame() {
            return false;
        }
        let Some(channel) = envelope.channel() else {
            return false;
        };
        let channels = client.inner.public_channels.read().await;
        match channel {
            "instruments" => {
                let tx = channels.instruments.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::Instruments)
                    .await
            }
            "tickers" => {
                let tx = channels.tickers.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::Tickers)
                    .await
            }
            "open-interest" => {
                let tx = channels.open_interest.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::OpenInterest)
                    .await
            }
            "trades" => {
                let tx = channels.trades.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::Trades)
                    .await
            }
            "estimated-price" => {
                let tx = channels.estimated_price.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::EstimatedPrice)
                    .await
            }
            "mark-price" => {
                let tx = channels.mark_price.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::MarkPrice)
                    .await
            }
            "price-limit" => {
                let tx = channels.price_limit.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::PriceLimit)
                    .await
            }
            "opt-summary" => {
                let tx = channels.option_summary.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::OptionSummary)
                    .await
            }
            "funding-rate" => {
                let tx = channels.funding_rate.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::FundingRate)
                    .await
            }
            "index-tickers" => {
                let tx = channels.index_tickers.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::IndexTickers)
                    .await
            }
            templated if templated.contains("mark-price-candle") => {
                let tx = channels.mark_price_candles.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, templated, tx, StreamEvent::MarkPriceCandlesticks)
                    .await
            }
            templated if templated.contains("index-candle") => {
                let tx = channels.index_candles.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, templated, tx, StreamEvent::IndexCandlesticks)
                    .await
            }
            templated if templated.contains("candle") => {
                let tx = channels.candlesticks.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, templated, tx, StreamEvent::Candlesticks)
                    .await
            }
            templated if templated.contains("books") => {
                let tx = channels.order_book.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, templated, tx, StreamEvent::OrderBook)
                    .await
            }
            _ => false,
        }
    }
}

impl OkxWsClient {
    /// Instruments
    /// The full instrument list is pushed after subscription, then again on
    /// any state change (delivery, exercise, new listings, suspensions).
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-instruments-channel
    pub async fn subscribe_instruments(
        &self,
        req: requests::Instruments,
        ch: Option<UnboundedSender<InstrumentsEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.instruments = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["instruments"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_instruments(
        &self,
        req: requests::Instruments,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.instruments = None;
        }
        self.unsubscribe(SessionClass::Public, &["instruments"], to_args(&req)?)
            .await
    }

    /// Tickers
    /// Last traded price, bid/ask and 24h volume, pushed every 100 ms.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-tickers-channel
    pub async fn subscribe_tickers(
        &self,
        req: requests::Tickers,
        ch: Option<UnboundedSender<TickersEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.tickers = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["tickers"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_tickers(
        &self,
        req: requests::Tickers,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.tickers = None;
        }
        self.unsubscribe(SessionClass::Public, &["tickers"], to_args(&req)?)
            .await
    }

    /// Open interest, pushed every 3 seconds.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-open-interest-channel
    pub async fn subscribe_open_interest(
        &self,
        req: requests::OpenInterest,
        ch: Option<UnboundedSender<OpenInterestEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.open_interest = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["open-interest"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_open_interest(
        &self,
        req: requests::OpenInterest,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.open_interest = None;
        }
        self.unsubscribe(SessionClass::Public, &["open-interest"], to_args(&req)?)
            .await
    }

    /// Candlesticks
    /// The bar size is part of the channel name, carried in the request
    /// ("candle1m", "candle3m", ...).
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-candlesticks-channel
    pub async fn subscribe_candlesticks(
        &self,
        req: requests::Candlesticks,
        ch: Option<UnboundedSender<CandlesticksEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.candlesticks = Some(tx);
        }
        self.subscribe(SessionClass::Public, &[], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_candlesticks(
        &self,
        req: requests::Candlesticks,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.candlesticks = None;
        }
        self.unsubscribe(SessionClass::Public, &[], to_args(&req)?)
            .await
    }

    /// Trades, pushed on every fill.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-trades-channel
    pub async fn subscribe_trades(
        &self,
        req: requests::Trades,
        ch: Option<UnboundedSender<TradesEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.trades = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["trades"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_trades(
        &self,
        req: requests::Trades,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.trades = None;
        }
        self.unsubscribe(SessionClass::Public, &["trades"], to_args(&req)?)
            .await
    }

    /// Estimated delivery/exercise price, pushed within an hour of
    /// delivery/exercise on any price change.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-estimated-delivery-exercise-price-channel
    pub async fn subscribe_estimated_price(
        &self,
        req: requests::EstimatedPrice,
        ch: Option<UnboundedSender<EstimatedPriceEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.estimated_price = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["estimated-price"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_estimated_price(
        &self,
        req: requests::EstimatedPrice,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.estimated_price = None;
        }
        self.unsubscribe(SessionClass::Public, &["estimated-price"], to_args(&req)?)
            .await
    }

    /// Mark price, pushed every 200 ms on change, every 10 s otherwise.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-mark-price-channel
    pub async fn subscribe_mark_price(
        &self,
        req: requests::MarkPrice,
        ch: Option<UnboundedSender<MarkPriceEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.mark_price = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["mark-price"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_mark_price(
        &self,
        req: requests::MarkPrice,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.mark_price = None;
        }
        self.unsubscribe(SessionClass::Public, &["mark-price"], to_args(&req)?)
            .await
    }

    /// Mark price candlesticks, pushed every 500 ms. The bar channel in the
    /// request gains the "mark-price-" prefix on the wire.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-mark-price-candlesticks-channel
    pub async fn subscribe_mark_price_candlesticks(
        &self,
        req: requests::MarkPriceCandlesticks,
        ch: Option<UnboundedSender<MarkPriceCandlesticksEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.mark_price_candles = Some(tx);
        }
        let mut args = to_args(&req)?;
        if let Some(bar) = args.remove("channel") {
            args.insert("channel".to_string(), format!("mark-price-{}", bar));
        }
        self.subscribe(SessionClass::Public, &[], &[args]).await
    }

    pub async fn unsubscribe_mark_price_candlesticks(
        &self,
        req: requests::MarkPriceCandlesticks,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.mark_price_candles = None;
        }
        let mut args = to_args(&req)?;
        if let Some(bar) = args.remove("channel") {
            args.insert("channel".to_string(), format!("mark-price-{}", bar));
        }
        self.unsubscribe(SessionClass::Public, &[], args).await
    }

    /// Price limit, pushed every 5 seconds while limits are changing.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-price-limit-channel
    pub async fn subscribe_price_limit(
        &self,
        req: requests::PriceLimit,
        ch: Option<UnboundedSender<PriceLimitEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.price_limit = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["price-limit"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_price_limit(
        &self,
        req: requests::PriceLimit,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.price_limit = None;
        }
        self.unsubscribe(SessionClass::Public, &["price-limit"], to_args(&req)?)
            .await
    }

    /// Order book. The depth variant is the channel name in each request:
    /// "books" (400 levels), "books5", "books50-l2-tbt", "books-l2-tbt".
    /// Multiple books can be subscribed in one frame.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-order-book-channel
    pub async fn subscribe_order_book(
        &self,
        reqs: &[requests::OrderBook],
        ch: Option<UnboundedSender<OrderBookEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.order_book = Some(tx);
        }
        let mut arg_sets = Vec::with_capacity(reqs.len());
        for req in reqs {
            arg_sets.push(to_args(req)?);
        }
        self.subscribe(SessionClass::Public, &[], &arg_sets).await
    }

    pub async fn unsubscribe_order_book(
        &self,
        req: requests::OrderBook,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.order_book = None;
        }
        self.unsubscribe(SessionClass::Public, &[], to_args(&req)?)
            .await
    }

    /// Option summary: pricing details of all options in one family.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-option-summary-channel
    pub async fn subscribe_option_summary(
        &self,
        req: requests::OptionSummary,
        ch: Option<UnboundedSender<OptionSummaryEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.option_summary = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["opt-summary"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_option_summary(
        &self,
        req: requests::OptionSummary,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.option_summary = None;
        }
        self.unsubscribe(SessionClass::Public, &["opt-summary"], to_args(&req)?)
            .await
    }

    /// Funding rate, pushed every minute.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-funding-rate-channel
    pub async fn subscribe_funding_rate(
        &self,
        req: requests::FundingRate,
        ch: Option<UnboundedSender<FundingRateEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.funding_rate = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["funding-rate"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_funding_rate(
        &self,
        req: requests::FundingRate,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.funding_rate = None;
        }
        self.unsubscribe(SessionClass::Public, &["funding-rate"], to_args(&req)?)
            .await
    }

    /// Index candlesticks, pushed every 500 ms. The request carries the full
    /// channel name ("index-candle1m", ...).
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-index-candlesticks-channel
    pub async fn subscribe_index_candlesticks(
        &self,
        req: requests::IndexCandlesticks,
        ch: Option<UnboundedSender<IndexCandlesticksEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.index_candles = Some(tx);
        }
        self.subscribe(SessionClass::Public, &[], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_index_candlesticks(
        &self,
        req: requests::IndexCandlesticks,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.index_candles = None;
        }
        self.unsubscribe(SessionClass::Public, &[], to_args(&req)?)
            .await
    }

    /// Index tickers.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-public-channels-index-tickers-channel
    pub async fn subscribe_index_tickers(
        &self,
        req: requests::IndexTickers,
        ch: Option<UnboundedSender<IndexTickersEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.public_channels.write().await.index_tickers = Some(tx);
        }
        self.subscribe(SessionClass::Public, &["index-tickers"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_index_tickers(
        &self,
        req: requests::IndexTickers,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.public_channels.write().await.index_tickers = None;
        }
        self.unsubscribe(SessionClass::Public, &["index-tickers"], to_args(&req)?)
            .await
    }
}
