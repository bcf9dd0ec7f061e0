// ── Dispenser aggregation ──
//
// Folds the per-nozzle status snapshot into one group per dispenser,
// picking a representative status by fixed precedence and deciding
// whether a single member deserves to be called out as active.

use std::collections::HashMap;
use std::sync::Arc;

use crate::layout::StationLayout;
use crate::model::{ActiveNozzle, DispenserGroup, NozzleCode, NozzleReading, NozzleStatus};
use crate::store::RawReadingStore;

#[derive(Debug, Clone)]
pub struct DispenserAggregator {
    layout: Arc<StationLayout>,
    cash_scale: f64,
}

impl DispenserAggregator {
    pub fn new(layout: Arc<StationLayout>, cash_scale: f64) -> Self {
        Self { layout, cash_scale }
    }

    pub fn layout(&self) -> &StationLayout {
        &self.layout
    }

    /// Group a status snapshot into dispensers, in dispenser order.
    ///
    /// Membership comes from the layout, so input order does not matter.
    /// Members absent from the snapshot are left out of their group and
    /// groups with no members at all are skipped.
    pub fn group(&self, statuses: &[NozzleReading], store: &RawReadingStore) -> Vec<DispenserGroup> {
        let mut by_code: HashMap<NozzleCode, &NozzleReading> = HashMap::with_capacity(statuses.len());
        for reading in statuses {
            by_code.entry(reading.code).or_insert(reading);
        }

        (1..=self.layout.dispensers())
            .filter_map(|number| {
                let members: Vec<NozzleReading> = self
                    .layout
                    .members(number)
                    .into_iter()
                    .filter_map(|code| by_code.get(&code).map(|r| (*r).clone()))
                    .collect();
                self.fold(number, members, store)
            })
            .collect()
    }

    /// Classify one dispenser. `None` when it has no members.
    pub fn fold(
        &self,
        number: u8,
        members: Vec<NozzleReading>,
        store: &RawReadingStore,
    ) -> Option<DispenserGroup> {
        let first = members.first()?;
        let priority = self.layout.priority();

        // Single left-to-right scan; first seen wins ties.
        let mut status = first.status;
        let mut active_index = 0;
        for (index, member) in members.iter().enumerate().skip(1) {
            if priority.outranks(member.status, status) {
                status = member.status;
                active_index = index;
            }
        }

        let all_same = members.iter().all(|m| m.status == status);
        let active_nozzle = (!all_same || status == NozzleStatus::Fueling)
            .then(|| members.get(active_index))
            .flatten()
            .map(|m| ActiveNozzle {
                code: m.code,
                product: m.product.clone(),
            });

        let display_liters = members
            .iter()
            .filter_map(|m| store.get(m.code)?.scaled_cash(self.cash_scale))
            .fold(None, |sum: Option<f64>, cash| Some(sum.unwrap_or(0.0) + cash));

        Some(DispenserGroup {
            number,
            members,
            status,
            active_nozzle,
            display_liters,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::model::ReadingUpdate;
    use strum::IntoEnumIterator;

    fn code(n: u8) -> NozzleCode {
        NozzleCode::new(n).unwrap()
    }

    fn aggregator() -> DispenserAggregator {
        DispenserAggregator::new(Arc::new(StationLayout::standard()), 1.0)
    }

    fn reading(n: u8, status: NozzleStatus) -> NozzleReading {
        let layout = StationLayout::standard();
        NozzleReading {
            code: code(n),
            status,
            product: layout.product(code(n)).to_owned(),
        }
    }

    fn all(status: NozzleStatus) -> Vec<NozzleReading> {
        (1..=30).map(|n| reading(n, status)).collect()
    }

    fn triple(statuses: [NozzleStatus; 3]) -> Vec<NozzleReading> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| reading(u8::try_from(i).unwrap() + 1, *s))
            .collect()
    }

    #[test]
    fn thirty_nozzles_make_ten_groups() {
        let groups = aggregator().group(&all(NozzleStatus::Available), &RawReadingStore::new());
        assert_eq!(groups.len(), 10);
        for (i, group) in groups.iter().enumerate() {
            let n = u8::try_from(i).unwrap() + 1;
            assert_eq!(group.number, n);
            assert_eq!(
                group.nozzle_codes(),
                vec![code(3 * n - 2), code(3 * n - 1), code(3 * n)]
            );
        }
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut statuses = all(NozzleStatus::Available);
        statuses.reverse();
        let groups = aggregator().group(&statuses, &RawReadingStore::new());
        assert_eq!(groups[0].nozzle_codes(), vec![code(1), code(2), code(3)]);
    }

    #[test]
    fn fueling_member_wins_and_is_active() {
        let store = RawReadingStore::new();
        let group = aggregator()
            .fold(
                1,
                triple([NozzleStatus::Available, NozzleStatus::Available, NozzleStatus::Fueling]),
                &store,
            )
            .unwrap();
        assert_eq!(group.status, NozzleStatus::Fueling);
        let active = group.active_nozzle.unwrap();
        assert_eq!(active.code.to_string(), "03");
        assert_eq!(active.product, "Diesel");
    }

    #[test]
    fn any_fueling_member_makes_group_fueling() {
        let store = RawReadingStore::new();
        for other in NozzleStatus::iter() {
            for position in 0..3 {
                let mut statuses = [other; 3];
                statuses[position] = NozzleStatus::Fueling;
                let group = aggregator().fold(1, triple(statuses), &store).unwrap();
                assert_eq!(group.status, NozzleStatus::Fueling, "{statuses:?}");
                assert!(group.active_nozzle.is_some());
            }
        }
    }

    #[test]
    fn all_same_non_fueling_has_no_active_nozzle() {
        let store = RawReadingStore::new();
        for status in NozzleStatus::iter() {
            let group = aggregator().fold(1, triple([status; 3]), &store).unwrap();
            assert_eq!(group.status, status);
            assert_eq!(
                group.active_nozzle.is_some(),
                status == NozzleStatus::Fueling,
                "{status}"
            );
        }
    }

    #[test]
    fn all_fueling_points_at_first_member() {
        let group = aggregator()
            .fold(1, triple([NozzleStatus::Fueling; 3]), &RawReadingStore::new())
            .unwrap();
        assert_eq!(group.active_nozzle.unwrap().code, code(1));
    }

    #[test]
    fn ties_keep_first_seen() {
        let group = aggregator()
            .fold(
                1,
                triple([NozzleStatus::Available, NozzleStatus::Ready, NozzleStatus::Ready]),
                &RawReadingStore::new(),
            )
            .unwrap();
        assert_eq!(group.status, NozzleStatus::Ready);
        assert_eq!(group.active_nozzle.unwrap().code, code(2));
    }

    #[test]
    fn mixed_statuses_expose_representative_member() {
        let group = aggregator()
            .fold(
                1,
                triple([NozzleStatus::Failure, NozzleStatus::Error, NozzleStatus::NotConfigured]),
                &RawReadingStore::new(),
            )
            .unwrap();
        assert_eq!(group.status, NozzleStatus::Error);
        assert_eq!(group.active_nozzle.unwrap().code, code(2));
    }

    #[test]
    fn idle_dispenser_without_readings_has_no_liters() {
        let group = aggregator()
            .fold(1, triple([NozzleStatus::Available; 3]), &RawReadingStore::new())
            .unwrap();
        assert!(group.active_nozzle.is_none());
        assert!(group.display_liters.is_none());
    }

    #[test]
    fn display_liters_sums_positive_cash_only() {
        let store = RawReadingStore::new();
        store.merge(ReadingUpdate::new(code(1), 0.0, None));
        store.merge(ReadingUpdate::new(code(2), 12.5, None));
        store.merge(ReadingUpdate::new(code(3), 7.5, None));

        let group = aggregator()
            .fold(1, triple([NozzleStatus::Available; 3]), &store)
            .unwrap();
        assert_eq!(group.display_liters, Some(20.0));
    }

    #[test]
    fn zero_cash_everywhere_is_none_not_zero() {
        let store = RawReadingStore::new();
        for n in 1..=3 {
            store.merge(ReadingUpdate::new(code(n), 0.0, None));
        }
        let group = aggregator()
            .fold(1, triple([NozzleStatus::Available; 3]), &store)
            .unwrap();
        assert!(group.display_liters.is_none());
    }

    #[test]
    fn cash_scale_applies_to_display_liters() {
        let store = RawReadingStore::new();
        store.merge(ReadingUpdate::new(code(1), 15.0, None));
        let scaled = DispenserAggregator::new(Arc::new(StationLayout::standard()), 100.0);
        let group = scaled
            .fold(1, triple([NozzleStatus::Fueling; 3]), &store)
            .unwrap();
        assert_eq!(group.display_liters, Some(1500.0));
    }

    #[test]
    fn missing_members_are_skipped_and_empty_groups_dropped() {
        let statuses: Vec<_> = (1..=30)
            .filter(|n| *n != 2 && !(4..=6).contains(n))
            .map(|n| reading(n, NozzleStatus::Available))
            .collect();
        let groups = aggregator().group(&statuses, &RawReadingStore::new());
        assert_eq!(groups.len(), 9);
        assert_eq!(groups[0].nozzle_codes(), vec![code(1), code(3)]);
        assert_eq!(groups[1].number, 3);
    }

    #[test]
    fn empty_member_list_yields_nothing() {
        assert!(aggregator().fold(1, Vec::new(), &RawReadingStore::new()).is_none());
    }
}
