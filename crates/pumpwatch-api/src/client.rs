// Async HTTP client for the station monitoring backend.
//
// Base path: /api/
// Auth: optional `Authorization: Bearer <token>` header

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    AttendantDto, FuelingTransactionDto, NozzleStatusDto, PresetWithTagRequest, ProductPriceDto,
    TransactionQuery, VisualizationDto,
};
use crate::transport::TransportConfig;

// ── Error response shape ─────────────────────────────────────────────

/// The backend wraps some failures in `{ isSuccess: false, error: "..." }`.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    is_success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the monitoring, pump and fueling REST endpoints.
#[derive(Debug, Clone)]
pub struct StationClient {
    http: reqwest::Client,
    base_url: Url,
}

impl StationClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a backend URL and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with a slash so relative joins keep its path.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Resolve an attendant photo path against the backend base URL.
    ///
    /// Absolute URLs pass through untouched; blank values yield `None`.
    pub fn resolve_asset_url(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.base_url
            .join(raw.trim_start_matches('/'))
            .ok()
            .map(String::from)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post_no_response<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    /// Success statuses may still carry `{ isSuccess: false }`.
    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(self.parse_error(status, resp).await);
        }
        let raw = resp.text().await?;
        match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse {
                is_success: Some(false),
                error,
                message,
            }) => Err(Error::Api {
                status: status.as_u16(),
                message: error.or(message).unwrap_or_else(|| "request rejected".into()),
            }),
            _ => Ok(()),
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: format!("backend returned {status}"),
            };
        }

        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.error.or(e.message))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Monitoring ───────────────────────────────────────────────────

    /// Authoritative snapshot of every nozzle's hardware status.
    pub async fn nozzle_statuses(&self) -> Result<Vec<NozzleStatusDto>, Error> {
        self.get("api/Monitoring/status").await
    }

    /// Running totals and tags for nozzles the backend has readings for.
    pub async fn visualizations(&self) -> Result<Vec<VisualizationDto>, Error> {
        self.get("api/Monitoring/visualization").await
    }

    // ── Attendants ───────────────────────────────────────────────────

    /// Attendant directory; `only_active` filters server-side.
    pub async fn attendants(&self, only_active: bool) -> Result<Vec<AttendantDto>, Error> {
        self.get_with_params("api/attendants", &[("onlyActive", only_active.to_string())])
            .await
    }

    /// Single attendant lookup by RFID tag. `Ok(None)` when unknown.
    ///
    /// Reaches attendants the cached directory does not hold yet.
    pub async fn attendant_by_tag(&self, tag_id: &str) -> Result<Option<AttendantDto>, Error> {
        match self.get(&format!("api/attendants/by-tag/{tag_id}")).await {
            Ok(attendant) => Ok(Some(attendant)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Prices ───────────────────────────────────────────────────────

    /// Current unit price per product.
    pub async fn current_prices(&self) -> Result<Vec<ProductPriceDto>, Error> {
        self.get("api/prices/current").await
    }

    // ── Pump control ─────────────────────────────────────────────────

    /// Authorize a nozzle for one fueling under an attendant's tag.
    pub async fn preset_with_tag(&self, request: &PresetWithTagRequest) -> Result<(), Error> {
        self.post_no_response("api/Pump/preset-with-tag", request).await
    }

    // ── Fueling history ──────────────────────────────────────────────

    /// Completed fuelings within the query's bounds.
    pub async fn fueling_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<FuelingTransactionDto>, Error> {
        self.get_with_params("api/Fueling/transactions", &query.params()).await
    }
}
