use crate::core::errors::ExchangeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order types accepted by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
    StopLimit,
    StopMarket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Market => "market",
            Self::StopLimit => "stop_limit",
            Self::StopMarket => "stop_market",
        }
    }

    /// Whether the exchange requires a price for this order type
    pub fn requires_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "limit" => Ok(Self::Limit),
            "market" => Ok(Self::Market),
            "stop_limit" => Ok(Self::StopLimit),
            "stop_market" => Ok(Self::StopMarket),
            other => Err(ExchangeError::InvalidParameters(format!(
                "unknown order type: {}",
                other
            ))),
        }
    }
}

/// Price source used to arm a trigger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    IndexPrice,
    MarkPrice,
    LastPrice,
}

impl FromStr for TriggerType {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index_price" => Ok(Self::IndexPrice),
            "mark_price" => Ok(Self::MarkPrice),
            "last_price" => Ok(Self::LastPrice),
            other => Err(ExchangeError::InvalidParameters(format!(
                "unknown trigger type: {}",
                other
            ))),
        }
    }
}

/// Update cadence tier of a book subscription channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookCadence {
    /// Fixed 100ms snapshots
    Ms100,
    /// Unthrottled updates
    Raw,
    /// Coarser aggregation tier
    Agg2,
}

impl BookCadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ms100 => "100ms",
            Self::Raw => "raw",
            Self::Agg2 => "agg2",
        }
    }

    /// Map a menu selector to a cadence. 1 is 100ms, 2 is raw, anything
    /// else falls back to agg2.
    pub fn from_choice(choice: u32) -> Self {
        match choice {
            1 => Self::Ms100,
            2 => Self::Raw,
            _ => Self::Agg2,
        }
    }

    /// Book channel name for an instrument at this cadence,
    /// e.g. `book.BTC-PERPETUAL.raw`
    pub fn book_channel(&self, instrument: &str) -> String {
        format!("book.{}.{}", instrument, self.as_str())
    }
}

/// Shared quantity rule for order mutations: `amount` and `contracts`
/// describe the same quantity, so when both are given they must agree,
/// and at least one must be given.
pub fn validate_quantity(
    amount: Option<f64>,
    contracts: Option<f64>,
) -> Result<(), ExchangeError> {
    if let (Some(amount), Some(contracts)) = (amount, contracts) {
        if amount != contracts {
            return Err(ExchangeError::InvalidParameters(
                "'amount' and 'contracts' must match when both are provided".to_string(),
            ));
        }
    }
    if amount.is_none() && contracts.is_none() {
        return Err(ExchangeError::InvalidParameters(
            "either 'amount' or 'contracts' must be provided".to_string(),
        ));
    }
    Ok(())
}

/// Parameters for editing an open order. Only populated fields are sent.
#[derive(Debug, Clone, Serialize)]
pub struct ModifyOrder {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<bool>,
}

impl ModifyOrder {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            amount: None,
            contracts: None,
            price: None,
            advanced: None,
            post_only: None,
            reduce_only: None,
        }
    }

    /// Local validation, performed before any network traffic
    pub fn validate(&self) -> Result<(), ExchangeError> {
        validate_quantity(self.amount, self.contracts)
    }
}

/// Parameters for a sell order. Only populated fields are sent.
#[derive(Debug, Clone, Serialize)]
pub struct SellOrder {
    pub instrument_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
}

impl SellOrder {
    pub fn new(instrument_name: impl Into<String>) -> Self {
        Self {
            instrument_name: instrument_name.into(),
            amount: None,
            contracts: None,
            price: None,
            order_type: None,
            trigger: None,
            trigger_price: None,
        }
    }

    /// Same quantity rule as [`ModifyOrder::validate`]
    pub fn validate(&self) -> Result<(), ExchangeError> {
        validate_quantity(self.amount, self.contracts)
    }
}
