//! Order operations over the private socket.
//!
//! Each call is correlated by a generated request id; the venue's reply
//! lands on the success sink (or the error sink on a non-zero code) with the
//! same id.
//!
//! https://www.okx.com/docs-v5/en/#websocket-api-trade

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::core::errors::OkxWsError;
use crate::core::types::{to_args, ChannelArgs, Operation};
use crate::ws::client::OkxWsClient;
use crate::ws::requests;
use crate::ws::session::SessionClass;

const REQUEST_ID_LEN: usize = 16;

fn request_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LEN)
        .map(char::from)
        .collect()
}

impl OkxWsClient {
    /// Place an order. Returns the request id to match against the
    /// acknowledgement.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-trade-place-order
    pub async fn place_order(&self, req: requests::PlaceOrder) -> Result<String, OkxWsError> {
        self.send_trade_op(Operation::Order, to_args(&req)?).await
    }

    /// Cancel an order by order id or client order id.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-trade-cancel-order
    pub async fn cancel_order(&self, req: requests::CancelOrder) -> Result<String, OkxWsError> {
        self.send_trade_op(Operation::CancelOrder, to_args(&req)?)
            .await
    }

    /// Amend a live order's size or price.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-trade-amend-order
    pub async fn amend_order(&self, req: requests::AmendOrder) -> Result<String, OkxWsError> {
        self.send_trade_op(Operation::AmendOrder, to_args(&req)?)
            .await
    }

    async fn send_trade_op(
        &self,
        op: Operation,
        args: ChannelArgs,
    ) -> Result<String, OkxWsError> {
        let id = request_id();
        let mut extras = ChannelArgs::new();
        extras.insert("id".to_string(), id.clone());
        self.send(SessionClass::Private, op, vec![args], Some(extras))
            .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_alphanumeric_and_unique() {
        let a = request_id();
        let b = request_id();
        assert_eq!(a.len(), REQUEST_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
