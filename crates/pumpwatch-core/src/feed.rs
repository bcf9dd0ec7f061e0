// ── Upstream feed abstraction ──
//
// The monitor pulls its four inputs and sends operator requests through
// this trait so tests can drive it with canned data. `StationClient` is
// the production impl.

use std::future::Future;

use pumpwatch_api::{
    AttendantDto, FuelingTransactionDto, NozzleStatusDto, PresetWithTagRequest, ProductPriceDto,
    StationClient, TransactionQuery, VisualizationDto,
};

use crate::error::CoreError;

/// Pull-side sources consumed by the engine.
pub trait StationFeed: Send + Sync + 'static {
    /// Authoritative status snapshot of every nozzle.
    fn nozzle_statuses(&self) -> impl Future<Output = Result<Vec<NozzleStatusDto>, CoreError>> + Send;

    /// Running totals and tags.
    fn visualizations(&self) -> impl Future<Output = Result<Vec<VisualizationDto>, CoreError>> + Send;

    /// Active attendant directory.
    fn attendants(&self) -> impl Future<Output = Result<Vec<AttendantDto>, CoreError>> + Send;

    /// Current unit prices.
    fn prices(&self) -> impl Future<Output = Result<Vec<ProductPriceDto>, CoreError>> + Send;

    /// Single attendant by tag, for tags the cached directory lacks.
    fn attendant_by_tag(
        &self,
        tag: &str,
    ) -> impl Future<Output = Result<Option<AttendantDto>, CoreError>> + Send;

    /// Authorize a nozzle under an attendant's tag.
    fn preset_with_tag(
        &self,
        request: &PresetWithTagRequest,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Completed fuelings matching `query`.
    fn fueling_transactions(
        &self,
        query: &TransactionQuery,
    ) -> impl Future<Output = Result<Vec<FuelingTransactionDto>, CoreError>> + Send;

    /// Turn a possibly relative asset path into a URL presentation can load.
    fn resolve_asset_url(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    }
}

impl StationFeed for StationClient {
    async fn nozzle_statuses(&self) -> Result<Vec<NozzleStatusDto>, CoreError> {
        Ok(StationClient::nozzle_statuses(self).await?)
    }

    async fn visualizations(&self) -> Result<Vec<VisualizationDto>, CoreError> {
        Ok(StationClient::visualizations(self).await?)
    }

    async fn attendants(&self) -> Result<Vec<AttendantDto>, CoreError> {
        Ok(StationClient::attendants(self, true).await?)
    }

    async fn prices(&self) -> Result<Vec<ProductPriceDto>, CoreError> {
        Ok(StationClient::current_prices(self).await?)
    }

    async fn attendant_by_tag(&self, tag: &str) -> Result<Option<AttendantDto>, CoreError> {
        Ok(StationClient::attendant_by_tag(self, tag).await?)
    }

    async fn preset_with_tag(&self, request: &PresetWithTagRequest) -> Result<(), CoreError> {
        Ok(StationClient::preset_with_tag(self, request).await?)
    }

    async fn fueling_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<FuelingTransactionDto>, CoreError> {
        Ok(StationClient::fueling_transactions(self, query).await?)
    }

    fn resolve_asset_url(&self, raw: &str) -> Option<String> {
        StationClient::resolve_asset_url(self, raw)
    }
}
