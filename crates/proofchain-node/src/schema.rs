//! Application record schemas accepted by `POST /transactions/new`.
//!
//! The consensus core stores any flat record; which fields a submission must
//! carry, and what a miner pays itself, is decided here.

use crate::api::ApiError;
use proofchain_consensus::{Bet, Primitive, Record, Transfer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The record shape a node accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecordSchema {
    /// `{sender, recipient, amount}`; miners earn a transfer from `"0"`.
    #[default]
    Transfer,
    /// `{event, investor, risk, win}`; every block carries the genesis bet.
    Bet,
    /// Any non-empty flat object of primitives; miners earn a transfer.
    Open,
}

impl RecordSchema {
    /// Fields a submission must carry.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Transfer => &["sender", "recipient", "amount"],
            Self::Bet => &["event", "investor", "risk", "win"],
            Self::Open => &[],
        }
    }

    /// Builds a record from a submitted JSON body.
    ///
    /// Fixed schemas keep only their own fields; anything extra is dropped.
    pub fn parse_record(&self, body: Value) -> Result<Record, ApiError> {
        let Value::Object(mut fields) = body else {
            return Err(ApiError::MalformedRequest(
                "request body must be a JSON object".into(),
            ));
        };

        let missing: Vec<&str> = self
            .required_fields()
            .iter()
            .copied()
            .filter(|field| !fields.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::MalformedRequest(format!(
                "missing values: {}",
                missing.join(", ")
            )));
        }

        match self {
            Self::Transfer => project::<Transfer>(&mut fields, self.required_fields())
                .map(Record::Transfer),
            Self::Bet => project::<Bet>(&mut fields, self.required_fields()).map(Record::Bet),
            Self::Open => {
                if fields.is_empty() {
                    return Err(ApiError::MalformedRequest("record has no fields".into()));
                }
                serde_json::from_value::<BTreeMap<String, Primitive>>(Value::Object(fields))
                    .map(Record::Fields)
                    .map_err(|e| ApiError::MalformedRequest(e.to_string()))
            }
        }
    }

    /// The record a miner appends to the block it forges.
    pub fn reward(&self, node_id: &str) -> Record {
        match self {
            Self::Transfer | Self::Open => Record::mining_reward(node_id),
            Self::Bet => Record::bet_reward(),
        }
    }
}

fn project<T: DeserializeOwned>(fields: &mut Map<String, Value>, keep: &[&str]) -> Result<T, ApiError> {
    let projected: Map<String, Value> = keep
        .iter()
        .filter_map(|key| fields.remove(*key).map(|value| (key.to_string(), value)))
        .collect();

    serde_json::from_value(Value::Object(projected))
        .map_err(|e| ApiError::MalformedRequest(e.to_string()))
}
