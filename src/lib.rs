pub mod core;
pub mod exchanges;

pub use crate::core::config::DeribitConfig;
pub use crate::core::errors::ExchangeError;
pub use crate::exchanges::deribit::{DeribitClient, MarketStream};
