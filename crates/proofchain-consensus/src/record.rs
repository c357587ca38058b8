//! Ledger records.
//!
//! A record is one application-level entry waiting in the pending pool or
//! embedded in a block. Two shapes are built in; any other flat object is
//! carried as a field map. Records serialize untagged, so the hashed form is
//! exactly the JSON object a client submitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A primitive JSON value carried by a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// An integer above `i64::MAX`.
    Unsigned(u64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Text(String),
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for Primitive {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Unsigned(value), Self::Integer)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A value transfer between two parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transfer {
    /// Sending address.
    pub sender: String,
    /// Receiving address.
    pub recipient: String,
    /// Amount moved.
    pub amount: Primitive,
}

/// A wager placed on an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bet {
    /// Event the wager is placed on.
    pub event: String,
    /// Party placing the wager.
    pub investor: String,
    /// Stake at risk.
    pub risk: Primitive,
    /// Payout on a win.
    pub win: Primitive,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    /// `{sender, recipient, amount}`.
    Transfer(Transfer),
    /// `{event, investor, risk, win}`.
    Bet(Bet),
    /// Any other flat object.
    Fields(BTreeMap<String, Primitive>),
}

impl Record {
    /// Sender address used for newly minted rewards.
    pub const REWARD_SENDER: &'static str = "0";

    /// Creates a transfer record.
    pub fn transfer(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Primitive>,
    ) -> Self {
        Self::Transfer(Transfer {
            sender: sender.into(),
            recipient: recipient.into(),
            amount: amount.into(),
        })
    }

    /// Creates a bet record.
    pub fn bet(
        event: impl Into<String>,
        investor: impl Into<String>,
        risk: impl Into<Primitive>,
        win: impl Into<Primitive>,
    ) -> Self {
        Self::Bet(Bet {
            event: event.into(),
            investor: investor.into(),
            risk: risk.into(),
            win: win.into(),
        })
    }

    /// The reward a node pays itself for mining a block.
    pub fn mining_reward(node_id: impl Into<String>) -> Self {
        Self::transfer(Self::REWARD_SENDER, node_id, 1)
    }

    /// The placeholder bet recorded with every block on a betting ledger.
    pub fn bet_reward() -> Self {
        Self::bet("genevent", "genesis", "0", "0")
    }

    /// Returns a short name for the record shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "transfer",
            Self::Bet(_) => "bet",
            Self::Fields(_) => "fields",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transfer_wire_form() {
        let record = Record::transfer("a", "b", 5);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({ "sender": "a", "recipient": "b", "amount": 5 }));
    }

    #[test]
    fn test_untagged_decoding_picks_shape() {
        let transfer: Record =
            serde_json::from_value(json!({ "sender": "a", "recipient": "b", "amount": 1.5 }))
                .unwrap();
        assert_eq!(transfer.kind(), "transfer");

        let bet: Record = serde_json::from_value(
            json!({ "event": "e", "investor": "i", "risk": "10", "win": 20 }),
        )
        .unwrap();
        assert_eq!(bet, Record::bet("e", "i", "10", 20));

        let other: Record =
            serde_json::from_value(json!({ "sender": "a", "recipient": "b", "amount": 1, "memo": "x" }))
                .unwrap();
        assert_eq!(other.kind(), "fields");
    }

    #[test]
    fn test_primitive_integers_stay_integers() {
        let record: Record = serde_json::from_value(json!({ "n": 5, "big": u64::MAX, "f": 5.0 })).unwrap();
        let Record::Fields(fields) = record else {
            panic!("expected field map");
        };
        assert_eq!(fields["n"], Primitive::Integer(5));
        assert_eq!(fields["big"], Primitive::Unsigned(u64::MAX));
        assert_eq!(fields["f"], Primitive::Float(5.0));
    }

    #[test]
    fn test_nested_values_rejected() {
        let result = serde_json::from_value::<Record>(json!({ "nested": { "a": 1 } }));
        assert!(result.is_err());
    }

    #[test]
    fn test_rewards() {
        assert_eq!(
            Record::mining_reward("node-1"),
            Record::transfer("0", "node-1", 1)
        );
        assert_eq!(Record::bet_reward(), Record::bet("genevent", "genesis", "0", "0"));
    }
}
