use crate::core::config::DeribitConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
use crate::core::types::{ModifyOrder, OrderType, SellOrder};
use crate::exchanges::deribit::signer::CredentialSigner;
use crate::exchanges::deribit::types::extract_access_token;
use serde_json::{json, Value};
use tracing::info;

/// Authenticated Deribit REST client.
///
/// Thin typed wrapper over [`RestClient`]: one method per trading operation,
/// each a single synchronous call against a fixed endpoint. The exchange
/// expects parameters on the query string even for mutating calls, so every
/// operation is read-style. Responses come back as the raw JSON envelope;
/// exchange-side rejections ride inside it and are the caller's to interpret.
pub struct DeribitClient<R: RestClient = ReqwestRest> {
    rest: R,
    config: DeribitConfig,
}

impl DeribitClient<ReqwestRest> {
    /// Build a client against the environment selected by the config
    pub fn new(config: DeribitConfig) -> Result<Self, ExchangeError> {
        let rest_config = RestClientConfig::new(config.rest_url(), "deribit".to_string());
        let rest = RestClientBuilder::new(rest_config).build()?;
        Ok(Self { rest, config })
    }
}

impl<R: RestClient> DeribitClient<R> {
    /// Build a client over an injected transport (used by tests)
    pub fn with_rest(rest: R, config: DeribitConfig) -> Self {
        Self { rest, config }
    }

    pub fn config(&self) -> &DeribitConfig {
        &self.config
    }

    /// Exchange the credential pair for an access token
    /// (`grant_type=client_credentials`).
    ///
    /// An envelope without `result.access_token` is an authentication
    /// failure; nothing is retried here.
    pub async fn authenticate(&self) -> Result<String, ExchangeError> {
        let payload = json!({
            "grant_type": "client_credentials",
            "client_id": self.config.client_id(),
            "client_secret": self.config.client_secret(),
        });

        let envelope = self.rest.get("/api/v2/public/auth", &payload, None).await?;
        Self::token_from(&envelope)
    }

    /// Authenticate without sending the raw secret
    /// (`grant_type=client_signature`): the secret only signs the request.
    pub async fn authenticate_with_signature(&self) -> Result<String, ExchangeError> {
        let signer = CredentialSigner::new(self.config.client_id(), self.config.client_secret());
        let params = signer.signature_params("")?;

        let payload = json!({
            "grant_type": "client_signature",
            "client_id": signer.client_id(),
            "timestamp": params.timestamp,
            "nonce": params.nonce,
            "data": "",
            "signature": params.signature,
        });

        let envelope = self.rest.get("/api/v2/public/auth", &payload, None).await?;
        Self::token_from(&envelope)
    }

    fn token_from(envelope: &Value) -> Result<String, ExchangeError> {
        extract_access_token(envelope)
            .map(str::to_string)
            .ok_or_else(|| {
                ExchangeError::AuthError(format!("no access token in response: {}", envelope))
            })
    }

    /// Place a buy order.
    ///
    /// `price` is sent only for order types that take one; `label` only when
    /// non-empty.
    pub async fn place_order(
        &self,
        token: &str,
        instrument: &str,
        order_type: OrderType,
        amount: f64,
        price: Option<f64>,
        label: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        let mut payload = json!({
            "instrument_name": instrument,
            "type": order_type.as_str(),
            "amount": amount,
        });

        if order_type.requires_price() {
            let price = price.ok_or_else(|| {
                ExchangeError::InvalidParameters(format!(
                    "order type '{}' requires a price",
                    order_type
                ))
            })?;
            payload["price"] = json!(price);
        }
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            payload["label"] = json!(label);
        }

        info!(instrument, %order_type, amount, "placing order");
        self.rest
            .get("/api/v2/private/buy", &payload, Some(token))
            .await
    }

    /// Edit an open order. Validation runs before any network call.
    pub async fn modify_order(
        &self,
        token: &str,
        order: &ModifyOrder,
    ) -> Result<Value, ExchangeError> {
        order.validate()?;
        let payload = serde_json::to_value(order)?;

        info!(order_id = %order.order_id, "modifying order");
        self.rest
            .get("/api/v2/private/edit", &payload, Some(token))
            .await
    }

    /// Place a sell order. Same quantity validation as modify.
    pub async fn sell_order(
        &self,
        token: &str,
        order: &SellOrder,
    ) -> Result<Value, ExchangeError> {
        order.validate()?;
        let payload = serde_json::to_value(order)?;

        info!(instrument = %order.instrument_name, "placing sell order");
        self.rest
            .get("/api/v2/private/sell", &payload, Some(token))
            .await
    }

    /// Cancel a single order by id
    pub async fn cancel_order(&self, token: &str, order_id: &str) -> Result<Value, ExchangeError> {
        let payload = json!({ "order_id": order_id });
        self.rest
            .get("/api/v2/private/cancel", &payload, Some(token))
            .await
    }

    /// Cancel every open order on the account
    pub async fn cancel_all(&self, token: &str) -> Result<Value, ExchangeError> {
        info!("cancelling all orders");
        self.rest
            .get("/api/v2/private/cancel_all", &json!({}), Some(token))
            .await
    }

    /// All open orders across currencies and instruments
    pub async fn open_orders(&self, token: &str) -> Result<Value, ExchangeError> {
        self.rest
            .get("/api/v2/private/get_open_orders", &json!({}), Some(token))
            .await
    }

    pub async fn open_orders_by_currency(
        &self,
        token: &str,
        currency: &str,
    ) -> Result<Value, ExchangeError> {
        let payload = json!({ "currency": currency });
        self.rest
            .get(
                "/api/v2/private/get_open_orders_by_currency",
                &payload,
                Some(token),
            )
            .await
    }

    pub async fn open_orders_by_instrument(
        &self,
        token: &str,
        instrument: &str,
    ) -> Result<Value, ExchangeError> {
        let payload = json!({ "instrument_name": instrument });
        self.rest
            .get(
                "/api/v2/private/get_open_orders_by_instrument",
                &payload,
                Some(token),
            )
            .await
    }

    /// Current state of one order
    pub async fn order_state(&self, token: &str, order_id: &str) -> Result<Value, ExchangeError> {
        let payload = json!({ "order_id": order_id });
        self.rest
            .get("/api/v2/private/get_order_state", &payload, Some(token))
            .await
    }

    pub async fn order_history_by_currency(
        &self,
        token: &str,
        currency: &str,
    ) -> Result<Value, ExchangeError> {
        let payload = json!({ "currency": currency });
        self.rest
            .get(
                "/api/v2/private/get_order_history_by_currency",
                &payload,
                Some(token),
            )
            .await
    }

    pub async fn order_history_by_instrument(
        &self,
        token: &str,
        instrument: &str,
    ) -> Result<Value, ExchangeError> {
        let payload = json!({ "instrument_name": instrument });
        self.rest
            .get(
                "/api/v2/private/get_order_history_by_instrument",
                &payload,
                Some(token),
            )
            .await
    }

    pub async fn user_trades_by_currency(
        &self,
        token: &str,
        currency: &str,
    ) -> Result<Value, ExchangeError> {
        let payload = json!({ "currency": currency });
        self.rest
            .get(
                "/api/v2/private/get_user_trades_by_currency",
                &payload,
                Some(token),
            )
            .await
    }

    pub async fn user_trades_by_instrument(
        &self,
        token: &str,
        instrument: &str,
    ) -> Result<Value, ExchangeError> {
        let payload = json!({ "instrument_name": instrument });
        self.rest
            .get(
                "/api/v2/private/get_user_trades_by_instrument",
                &payload,
                Some(token),
            )
            .await
    }

    /// Tradable instruments for a currency (public, no token)
    pub async fn instruments(&self, currency: &str) -> Result<Value, ExchangeError> {
        let payload = json!({ "currency": currency });
        self.rest
            .get("/api/v2/public/get_instruments", &payload, None)
            .await
    }

    /// Order book snapshot for an instrument (public, no token)
    pub async fn order_book(&self, instrument: &str) -> Result<Value, ExchangeError> {
        let payload = json!({ "instrument_name": instrument });
        self.rest
            .get("/api/v2/public/get_order_book", &payload, None)
            .await
    }
}
