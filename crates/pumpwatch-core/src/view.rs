// ── View assembly ──
//
// Pure composition of aggregation and enrichment into the records
// presentation consumes. No logic beyond null propagation lives here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::DispenserAggregator;
use crate::catalog::CatalogSnapshot;
use crate::enrich::EnrichmentResolver;
use crate::layout::StationLayout;
use crate::model::{ActiveFueling, DispenserView, NozzleReading, NozzleStatus, NozzleView};
use crate::store::RawReadingStore;

/// Everything presentation needs for one refresh of the monitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationView {
    pub dispensers: Vec<DispenserView>,
    pub nozzles: Vec<NozzleView>,
    pub fuelings: Vec<ActiveFueling>,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ViewAssembler {
    aggregator: DispenserAggregator,
    resolver: EnrichmentResolver,
    cash_scale: f64,
}

impl ViewAssembler {
    pub fn new(layout: Arc<StationLayout>, cash_scale: f64) -> Self {
        Self {
            aggregator: DispenserAggregator::new(layout, cash_scale),
            resolver: EnrichmentResolver::new(cash_scale),
            cash_scale,
        }
    }

    pub fn layout(&self) -> &StationLayout {
        self.aggregator.layout()
    }

    /// One enriched record per dispenser.
    pub fn dispensers(
        &self,
        statuses: &[NozzleReading],
        store: &RawReadingStore,
        catalog: &CatalogSnapshot,
    ) -> Vec<DispenserView> {
        self.aggregator
            .group(statuses, store)
            .into_iter()
            .map(|group| {
                let enrichment =
                    self.resolver
                        .enrich(&group, store, &catalog.attendants, &catalog.prices);
                DispenserView {
                    dispenser_number: group.number,
                    nozzle_codes: group.nozzle_codes(),
                    status: group.status,
                    active_nozzle: group.active_nozzle,
                    display_liters: group.display_liters,
                    attendant_name: enrichment.attendant_name,
                    attendant_photo_url: enrichment.attendant_photo_url,
                    calculated_liters: enrichment.calculated_liters,
                }
            })
            .collect()
    }

    /// One record per nozzle in the snapshot, ordered by code.
    pub fn nozzles(
        &self,
        statuses: &[NozzleReading],
        store: &RawReadingStore,
        catalog: &CatalogSnapshot,
    ) -> Vec<NozzleView> {
        let mut views: Vec<NozzleView> = statuses
            .iter()
            .map(|nozzle| {
                let reading = store.get(nozzle.code);
                let tag = reading.as_ref().and_then(|r| r.tag.clone());
                NozzleView {
                    code: nozzle.code,
                    dispenser: self.layout().dispenser_of(nozzle.code).unwrap_or_default(),
                    product: nozzle.product.clone(),
                    status: nozzle.status,
                    cash: reading.as_ref().map(|r| r.cash * self.cash_scale),
                    attendant_name: tag
                        .as_ref()
                        .and_then(|t| catalog.attendants.lookup(t))
                        .map(|a| a.name.clone()),
                    tag,
                }
            })
            .collect();
        views.sort_by_key(|v| v.code);
        views.dedup_by_key(|v| v.code);
        views
    }

    /// Nozzles currently fueling, ordered by code.
    pub fn fuelings(
        &self,
        statuses: &[NozzleReading],
        store: &RawReadingStore,
        catalog: &CatalogSnapshot,
    ) -> Vec<ActiveFueling> {
        self.nozzles(statuses, store, catalog)
            .into_iter()
            .filter(|n| n.status == NozzleStatus::Fueling)
            .map(|n| {
                let raw_cash = store.get(n.code).map(|r| r.cash);
                let liters = raw_cash.zip(catalog.prices.unit_price(&n.product)).and_then(
                    |(cash, price)| self.resolver.liters(cash, price),
                );
                ActiveFueling {
                    code: n.code,
                    dispenser: n.dispenser,
                    product: n.product,
                    cash: n.cash,
                    attendant_name: n.attendant_name,
                    liters,
                }
            })
            .collect()
    }

    /// Full view for one recomputation.
    pub fn assemble(
        &self,
        statuses: &[NozzleReading],
        store: &RawReadingStore,
        catalog: &CatalogSnapshot,
    ) -> StationView {
        StationView {
            dispensers: self.dispensers(statuses, store, catalog),
            nozzles: self.nozzles(statuses, store, catalog),
            fuelings: self.fuelings(statuses, store, catalog),
            generated_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::{AttendantIndex, PriceIndex};
    use crate::model::{AttendantIdentity, NozzleCode, ProductPrice, ReadingUpdate, TagId};

    fn code(n: u8) -> NozzleCode {
        NozzleCode::new(n).unwrap()
    }

    fn snapshot(overrides: &[(u8, NozzleStatus)]) -> Vec<NozzleReading> {
        let layout = StationLayout::standard();
        layout
            .codes()
            .map(|c| NozzleReading {
                code: c,
                status: overrides
                    .iter()
                    .find(|(n, _)| *n == c.number())
                    .map_or(NozzleStatus::Available, |(_, s)| *s),
                product: layout.product(c).to_owned(),
            })
            .collect()
    }

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot {
            attendants: Arc::new(AttendantIndex::from_records([AttendantIdentity {
                tag: TagId::parse("0A1B2C3D4E5F6789"),
                name: "Juan Perez".into(),
                photo_url: None,
                code: None,
                active: true,
            }])),
            prices: Arc::new(PriceIndex::from_records([
                ProductPrice {
                    product_name: "Super".into(),
                    unit_price: 500.0,
                },
                ProductPrice {
                    product_name: "Diesel".into(),
                    unit_price: 400.0,
                },
            ])),
        }
    }

    fn assembler() -> ViewAssembler {
        ViewAssembler::new(Arc::new(StationLayout::standard()), 1.0)
    }

    #[test]
    fn ten_dispensers_from_thirty_nozzles() {
        let view = assembler().assemble(&snapshot(&[]), &RawReadingStore::new(), &catalog());
        assert_eq!(view.dispensers.len(), 10);
        assert_eq!(view.nozzles.len(), 30);
        assert!(view.fuelings.is_empty());
        assert!(view.generated_at.is_some());
    }

    #[test]
    fn idle_dispenser_is_all_nulls() {
        let dispensers =
            assembler().dispensers(&snapshot(&[]), &RawReadingStore::new(), &catalog());
        let first = &dispensers[0];
        assert_eq!(first.status, NozzleStatus::Available);
        assert!(first.active_nozzle.is_none());
        assert!(first.display_liters.is_none());
        assert!(first.attendant_name.is_none());
        assert!(first.calculated_liters.is_none());
    }

    #[test]
    fn fueling_dispenser_is_fully_enriched() {
        let store = RawReadingStore::new();
        store.merge(ReadingUpdate::new(code(4), 1500.0, TagId::parse("0a1b2c3d4e5f6789")));
        let dispensers = assembler().dispensers(&snapshot(&[(4, NozzleStatus::Fueling)]), &store, &catalog());

        let second = &dispensers[1];
        assert_eq!(second.dispenser_number, 2);
        assert_eq!(second.nozzle_codes, vec![code(4), code(5), code(6)]);
        assert_eq!(second.status, NozzleStatus::Fueling);
        assert_eq!(second.active_nozzle.as_ref().unwrap().code, code(4));
        assert_eq!(second.display_liters, Some(1500.0));
        assert_eq!(second.attendant_name.as_deref(), Some("Juan Perez"));
        assert_eq!(second.calculated_liters, Some(3.0));
    }

    #[test]
    fn active_fuelings_list() {
        let store = RawReadingStore::new();
        store.merge(ReadingUpdate::new(code(3), 800.0, None));
        let fuelings = assembler().fuelings(
            &snapshot(&[(3, NozzleStatus::Fueling), (19, NozzleStatus::Fueling)]),
            &store,
            &catalog(),
        );
        assert_eq!(fuelings.len(), 2);
        assert_eq!(fuelings[0].code, code(3));
        assert_eq!(fuelings[0].dispenser, 1);
        assert_eq!(fuelings[0].product, "Diesel");
        assert_eq!(fuelings[0].cash, Some(800.0));
        assert_eq!(fuelings[0].liters, Some(2.0));
        // No reading yet: no data, not zero dispensed.
        assert_eq!(fuelings[1].dispenser, 7);
        assert!(fuelings[1].cash.is_none());
        assert!(fuelings[1].liters.is_none());
    }

    #[test]
    fn nozzle_views_are_scaled_and_ordered() {
        let store = RawReadingStore::new();
        store.merge(ReadingUpdate::new(code(2), 12.5, TagId::parse("0a1b2c3d4e5f6789")));
        let mut statuses = snapshot(&[]);
        statuses.reverse();

        let views = ViewAssembler::new(Arc::new(StationLayout::standard()), 100.0)
            .nozzles(&statuses, &store, &catalog());
        assert_eq!(views[0].code, code(1));
        assert_eq!(views[1].cash, Some(1250.0));
        assert_eq!(views[1].attendant_name.as_deref(), Some("Juan Perez"));
        assert!(views[0].cash.is_none());
    }
}
