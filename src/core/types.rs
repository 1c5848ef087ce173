use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::errors::OkxWsError;

/// Ordered parameter map identifying one topic instance on the venue.
///
/// The venue treats the argument object as an opaque set of string fields;
/// an ordered map keeps outbound frames byte-stable for a given request.
pub type ChannelArgs = BTreeMap<String, String>;

/// Control-frame operations accepted by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Login,
    Subscribe,
    Unsubscribe,
    Order,
    CancelOrder,
    AmendOrder,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Order => "order",
            Self::CancelOrder => "cancel-order",
            Self::AmendOrder => "amend-order",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialize a request struct into a [`ChannelArgs`] map.
///
/// `None` fields are skipped; non-string scalars are rendered in their JSON
/// form ("true", "3", ...). Nested objects are not supported - subscription
/// arguments are flat string maps on the wire.
pub fn to_args<T: Serialize>(req: &T) -> Result<ChannelArgs, OkxWsError> {
    let value = serde_json::to_value(req)?;
    let mut args = ChannelArgs::new();
    if let serde_json::Value::Object(map) = value {
        for (key, val) in map {
            match val {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    args.insert(key, s);
                }
                other => {
                    args.insert(key, other.to_string());
                }
            }
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Req {
        inst_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        inst_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reduce_only: Option<bool>,
    }

    #[test]
    fn operation_wire_names() {
        assert_eq!(
            serde_json::to_string(&Operation::CancelOrder).unwrap(),
            "\"cancel-order\""
        );
        assert_eq!(Operation::Login.as_str(), "login");
    }

    #[test]
    fn to_args_skips_none_and_stringifies_scalars() {
        let req = Req {
            inst_id: "BTC-USDT".to_string(),
            inst_type: None,
            reduce_only: Some(true),
        };
        let args = to_args(&req).unwrap();
        assert_eq!(args.get("instId").map(String::as_str), Some("BTC-USDT"));
        assert_eq!(args.get("reduceOnly").map(String::as_str), Some("true"));
        assert!(!args.contains_key("instType"));
    }
}
