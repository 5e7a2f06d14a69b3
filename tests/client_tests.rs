use async_trait::async_trait;
use deribitx::core::config::DeribitConfig;
use deribitx::core::errors::ExchangeError;
use deribitx::core::kernel::RestClient;
use deribitx::core::types::{ModifyOrder, OrderType, SellOrder, TriggerType};
use deribitx::exchanges::deribit::DeribitClient;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
struct RecordedCall {
    method: &'static str,
    endpoint: String,
    payload: Value,
    token: Option<String>,
}

/// Transport double that records every call and replays a canned envelope
#[derive(Clone)]
struct RecordingRest {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    response: Value,
}

impl RecordingRest {
    fn with_response(response: Value) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            response,
        }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RestClient for RecordingRest {
    async fn get(
        &self,
        endpoint: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: "GET",
            endpoint: endpoint.to_string(),
            payload: payload.clone(),
            token: token.map(str::to_string),
        });
        Ok(self.response.clone())
    }

    async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: "POST",
            endpoint: endpoint.to_string(),
            payload: body.clone(),
            token: token.map(str::to_string),
        });
        Ok(self.response.clone())
    }
}

fn test_config() -> DeribitConfig {
    DeribitConfig::new("test_client_id".to_string(), "test_client_secret".to_string()).testnet(true)
}

fn client_with(response: Value) -> (DeribitClient<RecordingRest>, RecordingRest) {
    let rest = RecordingRest::with_response(response);
    let client = DeribitClient::with_rest(rest.clone(), test_config());
    (client, rest)
}

#[tokio::test]
async fn authenticate_sends_credentials_and_extracts_token() {
    let (client, rest) = client_with(json!({"result": {"access_token": "T"}}));

    let token = client.authenticate().await.unwrap();
    assert_eq!(token, "T");

    let calls = rest.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint, "/api/v2/public/auth");
    assert_eq!(calls[0].method, "GET");
    assert_eq!(calls[0].token, None);
    assert_eq!(calls[0].payload["grant_type"], "client_credentials");
    assert_eq!(calls[0].payload["client_id"], "test_client_id");
    assert_eq!(calls[0].payload["client_secret"], "test_client_secret");
}

#[tokio::test]
async fn authenticate_without_nested_token_is_an_auth_failure() {
    let (client, _rest) = client_with(json!({"error": {"code": 13004, "message": "invalid"}}));

    let result = client.authenticate().await;
    assert!(matches!(result, Err(ExchangeError::AuthError(_))));
}

#[tokio::test]
async fn signature_grant_sends_digest_instead_of_secret() {
    let (client, rest) = client_with(json!({"result": {"access_token": "T"}}));

    let token = client.authenticate_with_signature().await.unwrap();
    assert_eq!(token, "T");

    let payload = &rest.calls()[0].payload;
    assert_eq!(payload["grant_type"], "client_signature");
    assert_eq!(payload["client_id"], "test_client_id");
    assert!(payload.get("client_secret").is_none());
    let signature = payload["signature"].as_str().unwrap();
    assert_eq!(signature.len(), 64);
    assert_eq!(payload["nonce"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn limit_order_payload_has_price_and_omits_empty_label() {
    let (client, rest) = client_with(json!({"result": {"order": {}}}));

    client
        .place_order(
            "tok",
            "BTC-PERPETUAL",
            OrderType::Limit,
            10.0,
            Some(20000.0),
            Some(""),
        )
        .await
        .unwrap();

    let calls = rest.calls();
    assert_eq!(calls[0].endpoint, "/api/v2/private/buy");
    assert_eq!(calls[0].token.as_deref(), Some("tok"));

    let payload = calls[0].payload.as_object().unwrap();
    assert_eq!(payload.len(), 4);
    assert_eq!(payload["instrument_name"], "BTC-PERPETUAL");
    assert_eq!(payload["type"], "limit");
    assert_eq!(payload["amount"], 10.0);
    assert_eq!(payload["price"], 20000.0);
    assert!(!payload.contains_key("label"));
}

#[tokio::test]
async fn market_order_payload_never_carries_a_price() {
    let (client, rest) = client_with(json!({"result": {"order": {}}}));

    client
        .place_order(
            "tok",
            "BTC-PERPETUAL",
            OrderType::Market,
            10.0,
            Some(20000.0),
            Some("scalp"),
        )
        .await
        .unwrap();

    let payload = rest.calls()[0].payload.as_object().unwrap().clone();
    assert!(!payload.contains_key("price"));
    assert_eq!(payload["label"], "scalp");
}

#[tokio::test]
async fn limit_order_without_price_fails_before_the_network() {
    let (client, rest) = client_with(json!({}));

    let result = client
        .place_order("tok", "BTC-PERPETUAL", OrderType::Limit, 10.0, None, None)
        .await;

    assert!(matches!(result, Err(ExchangeError::InvalidParameters(_))));
    assert!(rest.calls().is_empty());
}

#[tokio::test]
async fn modify_with_mismatched_quantities_fails_without_a_call() {
    let (client, rest) = client_with(json!({}));

    let mut order = ModifyOrder::new("ETH-349280");
    order.amount = Some(10.0);
    order.contracts = Some(20.0);

    let result = client.modify_order("tok", &order).await;
    assert!(matches!(result, Err(ExchangeError::InvalidParameters(_))));
    assert!(rest.calls().is_empty());
}

#[tokio::test]
async fn modify_without_any_quantity_fails_without_a_call() {
    let (client, rest) = client_with(json!({}));

    let order = ModifyOrder::new("ETH-349280");
    let result = client.modify_order("tok", &order).await;
    assert!(matches!(result, Err(ExchangeError::InvalidParameters(_))));
    assert!(rest.calls().is_empty());
}

#[tokio::test]
async fn modify_sends_exactly_the_supplied_fields() {
    let (client, rest) = client_with(json!({"result": {"order": {}}}));

    let mut order = ModifyOrder::new("ETH-349280");
    order.amount = Some(25.0);
    order.post_only = Some(true);

    client.modify_order("tok", &order).await.unwrap();

    let calls = rest.calls();
    assert_eq!(calls[0].endpoint, "/api/v2/private/edit");
    let payload = calls[0].payload.as_object().unwrap();
    assert_eq!(payload.len(), 3);
    assert_eq!(payload["order_id"], "ETH-349280");
    assert_eq!(payload["amount"], 25.0);
    assert_eq!(payload["post_only"], true);
}

#[tokio::test]
async fn matching_quantities_are_accepted() {
    let (client, rest) = client_with(json!({"result": {"order": {}}}));

    let mut order = ModifyOrder::new("ETH-349280");
    order.amount = Some(25.0);
    order.contracts = Some(25.0);

    client.modify_order("tok", &order).await.unwrap();
    let payload = rest.calls()[0].payload.as_object().unwrap().clone();
    assert_eq!(payload["amount"], 25.0);
    assert_eq!(payload["contracts"], 25.0);
}

#[tokio::test]
async fn sell_applies_the_same_quantity_rule() {
    let (client, rest) = client_with(json!({}));

    let order = SellOrder::new("BTC-PERPETUAL");
    let result = client.sell_order("tok", &order).await;
    assert!(matches!(result, Err(ExchangeError::InvalidParameters(_))));
    assert!(rest.calls().is_empty());
}

#[tokio::test]
async fn sell_sends_selective_fields_on_the_sell_endpoint() {
    let (client, rest) = client_with(json!({"result": {"order": {}}}));

    let mut order = SellOrder::new("BTC-PERPETUAL");
    order.amount = Some(40.0);
    order.order_type = Some(OrderType::StopMarket);
    order.trigger = Some(TriggerType::LastPrice);
    order.trigger_price = Some(52000.0);

    client.sell_order("tok", &order).await.unwrap();

    let calls = rest.calls();
    assert_eq!(calls[0].endpoint, "/api/v2/private/sell");
    let payload = calls[0].payload.as_object().unwrap();
    assert_eq!(payload.len(), 5);
    assert_eq!(payload["instrument_name"], "BTC-PERPETUAL");
    assert_eq!(payload["type"], "stop_market");
    assert_eq!(payload["trigger"], "last_price");
    assert_eq!(payload["trigger_price"], 52000.0);
    assert!(!payload.contains_key("price"));
}

#[tokio::test]
async fn cancel_all_sends_an_empty_payload_and_returns_the_envelope() {
    let envelope = json!({"jsonrpc": "2.0", "result": 7});
    let (client, rest) = client_with(envelope.clone());

    let response = client.cancel_all("tok").await.unwrap();
    assert_eq!(response, envelope);

    let calls = rest.calls();
    assert_eq!(calls[0].endpoint, "/api/v2/private/cancel_all");
    assert_eq!(calls[0].payload, json!({}));
    assert_eq!(calls[0].token.as_deref(), Some("tok"));
}

#[tokio::test]
async fn public_queries_carry_no_token() {
    let (client, rest) = client_with(json!({"result": []}));

    client.instruments("BTC").await.unwrap();
    client.order_book("BTC-PERPETUAL").await.unwrap();

    let calls = rest.calls();
    assert_eq!(calls[0].endpoint, "/api/v2/public/get_instruments");
    assert_eq!(calls[0].payload, json!({"currency": "BTC"}));
    assert_eq!(calls[0].token, None);
    assert_eq!(calls[1].endpoint, "/api/v2/public/get_order_book");
    assert_eq!(calls[1].payload, json!({"instrument_name": "BTC-PERPETUAL"}));
    assert_eq!(calls[1].token, None);
}

#[tokio::test]
async fn private_queries_carry_the_token_and_their_filter_field() {
    let (client, rest) = client_with(json!({"result": []}));

    client.open_orders("tok").await.unwrap();
    client.open_orders_by_currency("tok", "BTC").await.unwrap();
    client
        .open_orders_by_instrument("tok", "BTC-PERPETUAL")
        .await
        .unwrap();
    client.order_state("tok", "ETH-349280").await.unwrap();
    client.order_history_by_currency("tok", "ETH").await.unwrap();
    client
        .user_trades_by_instrument("tok", "BTC-PERPETUAL")
        .await
        .unwrap();

    let calls = rest.calls();
    assert!(calls.iter().all(|c| c.token.as_deref() == Some("tok")));
    assert_eq!(calls[0].endpoint, "/api/v2/private/get_open_orders");
    assert_eq!(calls[0].payload, json!({}));
    assert_eq!(
        calls[1].endpoint,
        "/api/v2/private/get_open_orders_by_currency"
    );
    assert_eq!(calls[1].payload, json!({"currency": "BTC"}));
    assert_eq!(
        calls[2].endpoint,
        "/api/v2/private/get_open_orders_by_instrument"
    );
    assert_eq!(calls[3].endpoint, "/api/v2/private/get_order_state");
    assert_eq!(calls[3].payload, json!({"order_id": "ETH-349280"}));
    assert_eq!(
        calls[4].endpoint,
        "/api/v2/private/get_order_history_by_currency"
    );
    assert_eq!(
        calls[5].endpoint,
        "/api/v2/private/get_user_trades_by_instrument"
    );
}
