//! Private topic family: routing and per-topic subscribe helpers.
//!
//! Every subscription here rides the private session class and therefore
//! blocks until the login flow has completed.
//!
//! https://www.okx.com/docs-v5/en/#websocket-api-private-channel

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::errors::OkxWsError;
use crate::core::types::{to_args, ChannelArgs};
use crate::ws::client::{FrameRouter, OkxWsClient};
use crate::ws::data::private::{
    AccountEvent, BalanceAndPositionEvent, OrdersEvent, PositionsEvent,
};
use crate::ws::events::{Envelope, StreamEvent};
use crate::ws::requests;
use crate::ws::session::SessionClass;

/// Delivery channels for the private topic families.
#[derive(Default)]
pub(crate) struct PrivateChannels {
    pub account: Option<UnboundedSender<AccountEvent>>,
    pub positions: Option<UnboundedSender<PositionsEvent>>,
    pub balance_and_position: Option<UnboundedSender<BalanceAndPositionEvent>>,
    pub orders: Option<UnboundedSender<OrdersEvent>>,
}

/// Claims private data frames by exact channel name. Consulted before the
/// public router so account-data channels can never be shadowed.
pub(crate) struct PrivateRouter;

#[async_trait]
impl FrameRouter for PrivateRouter {
    async fn route(&self, client: &OkxWsClient, raw: &str, envelope: &Envelope) -> bool {
        if !envelope.is_data_frame() {
            return false;
        }
        let Some(channel) = envelope.channel() else {
            return false;
        };
        let channels = client.inner.private_channels.read().await;
        match channel {
            "account" => {
                let tx = channels.account.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::Account)
                    .await
            }
            "positions" => {
                let tx = channels.positions.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::Positions)
                    .await
            }
            "balance_and_position" => {
                let tx = channels.balance_and_position.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::BalanceAndPosition)
                    .await
            }
            "orders" => {
                let tx = channels.orders.clone();
                drop(channels);
                client
                    .dispatch_topic(raw, channel, tx, StreamEvent::Orders)
                    .await
            }
            _ => false,
        }
    }
}

impl OkxWsClient {
    /// Account balance updates, pushed on any balance change and
    /// periodically.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-private-channel-account-channel
    pub async fn subscribe_account(
        &self,
        req: requests::Account,
        ch: Option<UnboundedSender<AccountEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.private_channels.write().await.account = Some(tx);
        }
        self.subscribe(SessionClass::Private, &["account"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_account(
        &self,
        req: requests::Account,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.private_channels.write().await.account = None;
        }
        self.unsubscribe(SessionClass::Private, &["account"], to_args(&req)?)
            .await
    }

    /// Position updates.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-private-channel-positions-channel
    pub async fn subscribe_positions(
        &self,
        req: requests::Positions,
        ch: Option<UnboundedSender<PositionsEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.private_channels.write().await.positions = Some(tx);
        }
        self.subscribe(SessionClass::Private, &["positions"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_positions(
        &self,
        req: requests::Positions,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.private_channels.write().await.positions = None;
        }
        self.unsubscribe(SessionClass::Private, &["positions"], to_args(&req)?)
            .await
    }

    /// Combined balance and position snapshots/updates.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-private-channel-balance-and-position-channel
    pub async fn subscribe_balance_and_position(
        &self,
        ch: Option<UnboundedSender<BalanceAndPositionEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.private_channels.write().await.balance_and_position = Some(tx);
        }
        self.subscribe(
            SessionClass::Private,
            &["balance_and_position"],
            &[ChannelArgs::new()],
        )
        .await
    }

    pub async fn unsubscribe_balance_and_position(
        &self,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.private_channels.write().await.balance_and_position = None;
        }
        self.unsubscribe(
            SessionClass::Private,
            &["balance_and_position"],
            ChannelArgs::new(),
        )
        .await
    }

    /// Order state updates.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-private-channel-order-channel
    pub async fn subscribe_orders(
        &self,
        req: requests::Orders,
        ch: Option<UnboundedSender<OrdersEvent>>,
    ) -> Result<(), OkxWsError> {
        if let Some(tx) = ch {
            self.inner.private_channels.write().await.orders = Some(tx);
        }
        self.subscribe(SessionClass::Private, &["orders"], &[to_args(&req)?])
            .await
    }

    pub async fn unsubscribe_orders(
        &self,
        req: requests::Orders,
        reset: bool,
    ) -> Result<(), OkxWsError> {
        if reset {
            self.inner.private_channels.write().await.orders = None;
        }
        self.unsubscribe(SessionClass::Private, &["orders"], to_args(&req)?)
            .await
    }
}
