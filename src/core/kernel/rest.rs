use crate::core::errors::ExchangeError;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use tracing::{instrument, trace};
use url::form_urlencoded;

/// REST client trait for making HTTP requests
///
/// Read-style calls carry their payload as URL query parameters; write-style
/// calls serialize it into a JSON body. Either way the decoded response
/// envelope comes back as a raw JSON value and every invocation is exactly
/// one attempt - no retries happen at this layer.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request with the payload's fields encoded on the query string
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `payload` - JSON object whose fields become query parameters
    /// * `token` - Bearer token for privileged endpoints, if any
    async fn get(
        &self,
        endpoint: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError>;

    /// Make a POST request with the payload serialized as the JSON body
    async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError>;
}

/// Serialize a JSON object into query-string text.
///
/// Pairs are `key=value` joined by `&` with no trailing separator. String
/// values are taken verbatim, everything else uses its JSON text form; values
/// are URL-escaped.
pub fn query_string(payload: &Value) -> String {
    let Some(map) = payload.as_object() else {
        return String::new();
    };

    map.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let escaped: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
            format!("{}={}", key, escaped)
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            user_agent: "deribitx/0.1".to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::Other(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
        })
    }
}

/// Implementation of `RestClient` using reqwest.
///
/// The inner `reqwest::Client` owns a pooled connection handle and is cheap
/// to clone; each clone shares the pool safely across tasks.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn new(base_url: String, exchange_name: String) -> Result<Self, ExchangeError> {
        RestClientBuilder::new(RestClientConfig::new(base_url, exchange_name)).build()
    }

    /// Authorization header value, present iff a non-empty token was supplied
    pub fn bearer_header(token: Option<&str>) -> Option<String> {
        token
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {}", t))
    }

    fn build_url(&self, endpoint: &str, payload: &Value) -> String {
        let query = query_string(payload);
        if query.is_empty() {
            format!("{}{}", self.config.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.config.base_url, endpoint, query)
        }
    }

    /// Decode the response body as the JSON envelope.
    ///
    /// Exchange-level rejections arrive as well-formed JSON and are returned
    /// untouched for the caller to interpret; only a body that is not valid
    /// JSON becomes an error here.
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ExchangeError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(ExchangeError::ApiError {
                code: i32::from(status.as_u16()),
                message: response_text,
            }),
            Err(e) => Err(ExchangeError::DeserializationError(format!(
                "Failed to parse JSON response: {}",
                e
            ))),
        }
    }

    #[instrument(skip(self, payload), fields(exchange = %self.config.exchange_name, method = %method, endpoint = %endpoint))]
    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        let url = if method == Method::GET {
            self.build_url(endpoint, payload)
        } else {
            format!("{}{}", self.config.base_url, endpoint)
        };

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");

        if let Some(value) = Self::bearer_header(token) {
            request = request.header("Authorization", value);
        }

        if method != Method::GET && !payload.is_null() {
            let body = serde_json::to_vec(payload).map_err(|e| {
                ExchangeError::SerializationError(format!(
                    "Failed to serialize request body: {}",
                    e
                ))
            })?;
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get(
        &self,
        endpoint: &str,
        payload: &Value,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        self.execute(Method::GET, endpoint, payload, token).await
    }

    async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<Value, ExchangeError> {
        self.execute(Method::POST, endpoint, body, token).await
    }
}
