// ── Cached catalog ──
//
// The attendant directory and price table change slowly. Each is held
// as an immutable index behind an `ArcSwap` and replaced wholesale when
// its window expires. A failed refresh keeps the previous index.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::index::{AttendantIndex, PriceIndex};
use crate::convert;
use crate::error::CoreError;
use crate::feed::StationFeed;
use crate::model::{AttendantIdentity, TagId};

/// One cached index plus when it was fetched.
struct Timed<T> {
    value: Arc<T>,
    fetched_at: Option<Instant>,
}

impl<T: Default> Timed<T> {
    fn empty() -> Self {
        Self {
            value: Arc::new(T::default()),
            fetched_at: None,
        }
    }

    fn is_stale(&self, window: Duration, now: Instant) -> bool {
        self.fetched_at
            .is_none_or(|at| now.duration_since(at) >= window)
    }
}

/// Consistent view of both catalogs for one recomputation.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub attendants: Arc<AttendantIndex>,
    pub prices: Arc<PriceIndex>,
}

/// Outcome of a refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogRefresh {
    pub attendants_updated: bool,
    pub prices_updated: bool,
}

impl CatalogRefresh {
    pub fn any(self) -> bool {
        self.attendants_updated || self.prices_updated
    }
}

pub struct CachedCatalog {
    attendants: ArcSwap<Timed<AttendantIndex>>,
    prices: ArcSwap<Timed<PriceIndex>>,
    attendant_window: Duration,
    price_window: Duration,
}

impl CachedCatalog {
    pub fn new(attendant_window: Duration, price_window: Duration) -> Self {
        Self {
            attendants: ArcSwap::from_pointee(Timed::empty()),
            prices: ArcSwap::from_pointee(Timed::empty()),
            attendant_window,
            price_window,
        }
    }

    /// Cheap snapshot of the current indexes.
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            attendants: Arc::clone(&self.attendants.load().value),
            prices: Arc::clone(&self.prices.load().value),
        }
    }

    /// Install a freshly built attendant index.
    pub fn store_attendants(&self, index: AttendantIndex) {
        self.attendants.store(Arc::new(Timed {
            value: Arc::new(index),
            fetched_at: Some(Instant::now()),
        }));
    }

    /// Install a freshly built price index.
    pub fn store_prices(&self, index: PriceIndex) {
        self.prices.store(Arc::new(Timed {
            value: Arc::new(index),
            fetched_at: Some(Instant::now()),
        }));
    }

    /// Refetch whichever catalogs are past their window (all, if `force`).
    ///
    /// Fetch errors are logged and the previous index stays in place, so
    /// a flaky backend degrades enrichment instead of blanking it.
    pub async fn refresh<F: StationFeed>(&self, feed: &F, force: bool) -> CatalogRefresh {
        let now = Instant::now();
        let mut outcome = CatalogRefresh::default();

        if force || self.attendants.load().is_stale(self.attendant_window, now) {
            match feed.attendants().await {
                Ok(dtos) => {
                    let records = convert::attendant_identities(dtos, |raw| feed.resolve_asset_url(raw));
                    let index = AttendantIndex::from_records(records);
                    debug!(count = index.len(), "attendant directory refreshed");
                    self.store_attendants(index);
                    outcome.attendants_updated = true;
                }
                Err(e) => warn!(error = %e, "attendant refresh failed, keeping previous directory"),
            }
        }

        if force || self.prices.load().is_stale(self.price_window, now) {
            match feed.prices().await {
                Ok(dtos) => {
                    let index = PriceIndex::from_records(convert::product_prices(dtos));
                    debug!(count = index.len(), "price table refreshed");
                    self.store_prices(index);
                    outcome.prices_updated = true;
                }
                Err(e) => warn!(error = %e, "price refresh failed, keeping previous prices"),
            }
        }

        outcome
    }

    /// Resolve `tag` to an active attendant.
    ///
    /// Looks in the (refreshed if stale) directory first, then asks the
    /// backend directly for tags enrolled since the last fetch.
    pub async fn resolve_attendant<F: StationFeed>(
        &self,
        feed: &F,
        tag: &TagId,
    ) -> Result<Option<AttendantIdentity>, CoreError> {
        self.refresh(feed, false).await;
        if let Some(found) = self.snapshot().attendants.lookup(tag) {
            return Ok(Some(found.clone()));
        }

        debug!(%tag, "tag not in cached directory, asking backend");
        let Some(dto) = feed.attendant_by_tag(tag.as_str()).await? else {
            return Ok(None);
        };
        Ok(
            convert::attendant_identities(vec![dto], |raw| feed.resolve_asset_url(raw))
                .into_iter()
                .find(|a| a.active && a.tag.as_ref() == Some(tag)),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pumpwatch_api::{
        AttendantDto, FuelingTransactionDto, NozzleStatusDto, PresetWithTagRequest,
        ProductPriceDto, TransactionQuery, VisualizationDto,
    };

    use super::*;
    use crate::error::CoreError;
    use crate::model::TagId;

    #[derive(Default)]
    struct CatalogFeed {
        price: Mutex<Option<f64>>,
        price_calls: AtomicUsize,
        attendant_calls: AtomicUsize,
        /// Attendants known to the backend but not yet in the directory.
        enrolled: Mutex<Vec<AttendantDto>>,
    }

    impl StationFeed for CatalogFeed {
        async fn nozzle_statuses(&self) -> Result<Vec<NozzleStatusDto>, CoreError> {
            Ok(Vec::new())
        }

        async fn visualizations(&self) -> Result<Vec<VisualizationDto>, CoreError> {
            Ok(Vec::new())
        }

        async fn attendants(&self) -> Result<Vec<AttendantDto>, CoreError> {
            self.attendant_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![AttendantDto {
                id: None,
                code: None,
                full_name: "Juan Perez".into(),
                tag_id: Some("0A1B2C3D4E5F6789".into()),
                is_active: true,
                photo_url: None,
            }])
        }

        async fn prices(&self) -> Result<Vec<ProductPriceDto>, CoreError> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            match *self.price.lock().unwrap() {
                Some(price) => Ok(vec![ProductPriceDto {
                    product_id: None,
                    product_code: None,
                    product_name: "Super".into(),
                    current_price: Some(price),
                    price_decimals: None,
                    is_active: true,
                }]),
                None => Err(CoreError::Timeout),
            }
        }

        async fn attendant_by_tag(&self, tag: &str) -> Result<Option<AttendantDto>, CoreError> {
            Ok(self
                .enrolled
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.tag_id.as_deref() == Some(tag))
                .cloned())
        }

        async fn preset_with_tag(&self, _request: &PresetWithTagRequest) -> Result<(), CoreError> {
            Ok(())
        }

        async fn fueling_transactions(
            &self,
            _query: &TransactionQuery,
        ) -> Result<Vec<FuelingTransactionDto>, CoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_respects_windows() {
        let feed = CatalogFeed::default();
        *feed.price.lock().unwrap() = Some(500.0);
        let catalog = CachedCatalog::new(Duration::from_secs(30), Duration::from_secs(60));

        assert!(catalog.refresh(&feed, false).await.any());
        assert_eq!(catalog.snapshot().prices.unit_price("super"), Some(500.0));
        let tag = TagId::parse("0a1b2c3d4e5f6789").unwrap();
        assert!(catalog.snapshot().attendants.lookup(&tag).is_some());

        // Inside both windows: nothing refetched.
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!catalog.refresh(&feed, false).await.any());

        // Attendant window expired, price window not.
        tokio::time::advance(Duration::from_secs(25)).await;
        let outcome = catalog.refresh(&feed, false).await;
        assert!(outcome.attendants_updated);
        assert!(!outcome.prices_updated);
        assert_eq!(feed.attendant_calls.load(Ordering::SeqCst), 2);
        assert_eq!(feed.price_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_snapshot() {
        let feed = CatalogFeed::default();
        *feed.price.lock().unwrap() = Some(500.0);
        let catalog = CachedCatalog::new(Duration::from_secs(30), Duration::from_secs(60));
        catalog.refresh(&feed, true).await;

        *feed.price.lock().unwrap() = None;
        let outcome = catalog.refresh(&feed, true).await;
        assert!(!outcome.prices_updated);
        assert_eq!(catalog.snapshot().prices.unit_price("Super"), Some(500.0));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_tag_falls_back_to_backend_lookup() {
        let feed = CatalogFeed::default();
        *feed.price.lock().unwrap() = Some(500.0);
        feed.enrolled.lock().unwrap().extend([
            AttendantDto {
                id: None,
                code: Some("A-9".into()),
                full_name: "Ana Mora".into(),
                tag_id: Some("FEDCBA9876543210".into()),
                is_active: true,
                photo_url: None,
            },
            AttendantDto {
                id: None,
                code: None,
                full_name: "Retired".into(),
                tag_id: Some("1111222233334444".into()),
                is_active: false,
                photo_url: None,
            },
        ]);
        let catalog = CachedCatalog::new(Duration::from_secs(30), Duration::from_secs(60));

        let known = TagId::parse("0a1b2c3d4e5f6789").unwrap();
        let found = catalog.resolve_attendant(&feed, &known).await.unwrap();
        assert_eq!(found.unwrap().name, "Juan Perez");

        let enrolled = TagId::parse("fedcba9876543210").unwrap();
        let found = catalog.resolve_attendant(&feed, &enrolled).await.unwrap();
        assert_eq!(found.unwrap().code.as_deref(), Some("A-9"));

        let inactive = TagId::parse("1111222233334444").unwrap();
        assert!(catalog.resolve_attendant(&feed, &inactive).await.unwrap().is_none());

        let unknown = TagId::parse("9999999999999999").unwrap();
        assert!(catalog.resolve_attendant(&feed, &unknown).await.unwrap().is_none());
        assert_eq!(feed.attendant_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_catalog_snapshot() {
        let catalog = CachedCatalog::new(Duration::from_secs(30), Duration::from_secs(60));
        let snap = catalog.snapshot();
        assert!(snap.attendants.is_empty());
        assert!(snap.prices.is_empty());
    }
}
