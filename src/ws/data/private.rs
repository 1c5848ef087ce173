use serde::Deserialize;

use crate::ws::events::TopicEvent;

pub type AccountEvent = TopicEvent<AccountUpdate>;
pub type PositionsEvent = TopicEvent<PositionUpdate>;
pub type BalanceAndPositionEvent = TopicEvent<BalanceAndPosition>;
pub type OrdersEvent = TopicEvent<OrderUpdate>;

/// Account balance push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountUpdate {
    pub u_time: String,
    pub total_eq: String,
    pub iso_eq: Option<String>,
    pub adj_eq: Option<String>,
    pub details: Vec<BalanceDetail>,
}

/// Per-currency balance detail inside an account push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceDetail {
    pub ccy: String,
    pub eq: String,
    pub cash_bal: String,
    pub avail_bal: String,
    pub frozen_bal: String,
    pub u_time: String,
}

/// Position push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionUpdate {
    pub inst_type: String,
    pub inst_id: String,
    pub mgn_mode: String,
    pub pos_side: String,
    pub pos: String,
    pub avg_px: String,
    pub upl: String,
    pub lever: Option<String>,
    pub liq_px: Option<String>,
    pub margin: Option<String>,
    pub c_time: String,
    pub u_time: String,
}

/// Combined balance and position push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceAndPosition {
    pub p_time: String,
    pub event_type: String,
    pub bal_data: Vec<BalanceSnapshot>,
    pub pos_data: Vec<PositionSnapshot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceSnapshot {
    pub ccy: String,
    pub cash_bal: String,
    pub u_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionSnapshot {
    pub inst_id: String,
    pub inst_type: String,
    pub mgn_mode: String,
    pub pos_side: String,
    pub pos: String,
    pub avg_px: String,
    pub u_time: String,
}

/// Order state push
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderUpdate {
    pub inst_type: String,
    pub inst_id: String,
    pub ord_id: String,
    pub cl_ord_id: Option<String>,
    pub px: String,
    pub sz: String,
    pub ord_type: String,
    pub side: String,
    pub pos_side: Option<String>,
    pub td_mode: String,
    pub fill_px: String,
    pub fill_sz: String,
    pub acc_fill_sz: String,
    pub avg_px: String,
    pub state: String,
    pub lever: Option<String>,
    pub fee: String,
    pub fee_ccy: String,
    pub c_time: String,
    pub u_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_event_decodes() {
        let frame = r#"{
            "arg": {"channel": "orders", "instType": "SPOT", "uid": "77777"},
            "data": [{"instType":"SPOT","instId":"BTC-USDT","ordId":"312269865356374016","side":"buy","state":"live","sz":"0.001"}]
        }"#;
        let event: OrdersEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(event.arg.channel, "orders");
        assert_eq!(event.data[0].ord_id, "312269865356374016");
        assert_eq!(event.data[0].state, "live");
    }

    #[test]
    fn balance_and_position_event_decodes() {
        let frame = r#"{
            "arg": {"channel": "balance_and_position", "uid": "77777"},
            "data": [{"pTime":"1700000000000","eventType":"snapshot","balData":[{"ccy":"USDT","cashBal":"100","uTime":"1700000000000"}],"posData":[]}]
        }"#;
        let event: BalanceAndPositionEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(event.data[0].event_type, "snapshot");
        assert_eq!(event.data[0].bal_data[0].ccy, "USDT");
    }
}
