use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use sdlc_store::Row;
use tracing::debug;

use super::{Query, RecordStore, StoreError, StoreResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept on a failed response.
const ERROR_BODY_LIMIT: usize = 500;

/// Supabase/PostgREST gateway authenticated with a service role key.
#[derive(Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    rest_url: String,
}

impl PostgrestStore {
    /// Builds a gateway for `base_url` (the project URL, without `/rest/v1`).
    ///
    /// # Errors
    /// Returns `StoreError::Config` when the URL or key is blank or the key is
    /// not a valid header value.
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> StoreResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(StoreError::Config("store URL is empty".to_string()));
        }
        let service_key = service_key.trim();
        if service_key.is_empty() {
            return Err(StoreError::Config("service role key is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(service_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {service_key}"))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            rest_url: format!("{base_url}/rest/v1"),
        })
    }

    #[must_use]
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// Query string parameters for `query`, in the order PostgREST receives them.
    #[must_use]
    pub fn query_params(query: &Query) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), query.select.clone())];
        params.extend(
            query
                .filters
                .iter()
                .map(|(column, value)| (column.clone(), format!("eq.{value}"))),
        );
        if let Some(order) = &query.order {
            params.push(("order".to_string(), order.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Row>> {
        let url = format!("{}/{}", self.rest_url, query.table);
        debug!(table = %query.table, select = %query.select, "querying store");

        let response = self
            .client
            .get(&url)
            .query(&Self::query_params(query))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        serde_json::from_str::<Vec<Row>>(&body).map_err(|err| {
            StoreError::Decode(sdlc_store::DecodeError {
                table: "response",
                message: err.to_string(),
            })
        })
    }
}

fn header_value(value: &str) -> StoreResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| StoreError::Config(format!("invalid header value: {err}")))
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Order;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn encodes_filters_order_and_limit() {
        let query = Query::table("project_screens")
            .select("id,name")
            .eq("project_id", "p-1")
            .order(Order::asc("display_order").nulls_first())
            .limit(5);

        let params = PostgrestStore::query_params(&query);
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "id,name".to_string()),
                ("project_id".to_string(), "eq.p-1".to_string()),
                ("order".to_string(), "display_order.asc.nullsfirst".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_blank_settings() {
        assert!(matches!(
            PostgrestStore::new("  ", "key", DEFAULT_TIMEOUT),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            PostgrestStore::new("https://x.supabase.co", "", DEFAULT_TIMEOUT),
            Err(StoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn sends_service_key_and_decodes_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/projects"))
            .and(header("apikey", "secret"))
            .and(header("authorization", "Bearer secret"))
            .and(query_param("status", "eq.ACTIVE"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "p-1", "name": "Acme"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&format!("{}/", server.uri()), "secret", DEFAULT_TIMEOUT)
            .expect("store builds");
        let rows = store
            .query(
                &Query::table("projects")
                    .eq("status", "ACTIVE")
                    .order(Order::desc("created_at")),
            )
            .await
            .expect("query succeeds");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("Acme")));
    }

    #[tokio::test]
    async fn query_single_limits_to_one_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/projects"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "secret", DEFAULT_TIMEOUT)
            .expect("store builds");
        let row = store
            .query_single(&Query::table("projects").eq("id", "missing"))
            .await
            .expect("query succeeds");
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "wrong", DEFAULT_TIMEOUT)
            .expect("store builds");
        let err = store
            .query(&Query::table("projects"))
            .await
            .expect_err("401 should fail");
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("invalid api key"));
    }
}
