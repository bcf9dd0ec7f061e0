// ── Backend DTO → domain conversion ──
//
// Every record the backend sends passes through here. Malformed records
// (missing or invalid code, out-of-range status, missing cash) are
// dropped and logged; nothing here fails.

use chrono::{DateTime, NaiveDateTime};
use pumpwatch_api::{
    AttendantDto, FuelingTransactionDto, NozzleStatusDto, PresetWithTagRequest, ProductPriceDto,
    TransactionQuery, VisualizationDto,
};
use tracing::debug;

use crate::layout::StationLayout;
use crate::model::{
    AttendantIdentity, FuelingTransaction, HISTORY_TIME_FORMAT, HistoryQuery, NozzleCode,
    NozzleReading, NozzleStatus, PresetLimit, PresetOrder, ProductPrice, ReadingUpdate, TagId,
};

fn parse_code(raw: Option<&str>) -> Option<NozzleCode> {
    let Some(raw) = raw else {
        debug!("dropping record without nozzle code");
        return None;
    };
    match raw.parse() {
        Ok(code) => Some(code),
        Err(e) => {
            debug!(error = %e, "dropping record with invalid nozzle code");
            None
        }
    }
}

// ── Status snapshot ──────────────────────────────────────────────────

/// Convert a status snapshot, keeping only nozzles the layout knows.
pub fn nozzle_readings(dtos: Vec<NozzleStatusDto>, layout: &StationLayout) -> Vec<NozzleReading> {
    dtos.into_iter()
        .filter_map(|dto| nozzle_reading(&dto, layout))
        .collect()
}

pub fn nozzle_reading(dto: &NozzleStatusDto, layout: &StationLayout) -> Option<NozzleReading> {
    let code = parse_code(dto.nozzle_code.as_deref())?;
    if !layout.contains(code) {
        debug!(nozzle = %code, "dropping status for nozzle outside the layout");
        return None;
    }
    let Some(raw) = dto.status else {
        debug!(nozzle = %code, "dropping status record without status");
        return None;
    };
    let status = match NozzleStatus::try_from(raw) {
        Ok(status) => status,
        Err(e) => {
            debug!(nozzle = %code, error = %e, "dropping status record");
            return None;
        }
    };
    Some(NozzleReading {
        code,
        status,
        product: layout.product(code).to_owned(),
    })
}

// ── Readings ─────────────────────────────────────────────────────────

pub fn reading_updates(dtos: Vec<VisualizationDto>) -> Vec<ReadingUpdate> {
    dtos.iter().filter_map(reading_update).collect()
}

pub fn reading_update(dto: &VisualizationDto) -> Option<ReadingUpdate> {
    let code = parse_code(dto.nozzle_code.as_deref())?;
    let Some(cash) = dto.current_cash.filter(|c| c.is_finite()) else {
        debug!(nozzle = %code, "dropping reading without usable cash value");
        return None;
    };
    Some(ReadingUpdate::new(
        code,
        cash,
        dto.tag_id.as_deref().and_then(TagId::parse),
    ))
}

// ── Directory and prices ─────────────────────────────────────────────

pub fn attendant_identities(
    dtos: Vec<AttendantDto>,
    resolve_url: impl Fn(&str) -> Option<String>,
) -> Vec<AttendantIdentity> {
    dtos.into_iter()
        .map(|dto| AttendantIdentity {
            tag: dto.tag_id.as_deref().and_then(TagId::parse),
            photo_url: dto.photo_url.as_deref().and_then(&resolve_url),
            name: dto.full_name.trim().to_owned(),
            code: dto.code,
            active: dto.is_active,
        })
        .collect()
}

pub fn product_prices(dtos: Vec<ProductPriceDto>) -> Vec<ProductPrice> {
    dtos.into_iter()
        .filter_map(|dto| {
            let Some(unit_price) = dto.current_price else {
                debug!(product = %dto.product_name, "dropping price row without price");
                return None;
            };
            Some(ProductPrice {
                product_name: dto.product_name,
                unit_price,
            })
        })
        .collect()
}

// ── Pump control ─────────────────────────────────────────────────────

pub fn preset_request(order: &PresetOrder) -> PresetWithTagRequest {
    let (preset_type, preset_value) = match order.limit {
        PresetLimit::Amount(value) => (0, value),
        PresetLimit::Volume(value) => (1, value),
        PresetLimit::FullTank => (0, 0.0),
    };
    PresetWithTagRequest {
        nozzle_code: order.nozzle.to_string(),
        tag_id: order.tag.to_string(),
        identifier_type: order.identifier.code(),
        authorize: true,
        preset_value,
        // Validation caps the timeout at 99 s.
        timeout_seconds: u8::try_from(order.timeout.as_secs()).unwrap_or(u8::MAX),
        preset_type,
        price_level: order.price_level.code(),
    }
}

// ── Fueling history ──────────────────────────────────────────────────

pub fn transaction_query(query: &HistoryQuery) -> TransactionQuery {
    TransactionQuery {
        from: query.from.map(|t| t.format(HISTORY_TIME_FORMAT).to_string()),
        to: query.to.map(|t| t.format(HISTORY_TIME_FORMAT).to_string()),
        nozzle_id: query.nozzle.map(NozzleCode::number),
    }
}

/// Backend-local timestamp, with or without fraction or offset.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|t| t.naive_local()))
}

pub fn fueling_transactions(dtos: Vec<FuelingTransactionDto>) -> Vec<FuelingTransaction> {
    dtos.into_iter().map(fueling_transaction).collect()
}

pub fn fueling_transaction(dto: FuelingTransactionDto) -> FuelingTransaction {
    let nozzle = dto
        .nozzle_code
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .or_else(|| {
            dto.nozzle_number
                .and_then(|n| u8::try_from(n).ok())
                .and_then(NozzleCode::new)
        });
    let recorded_at = dto.transaction_date.as_deref().and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            debug!(raw, "unparseable transaction date");
        }
        parsed
    });
    FuelingTransaction {
        id: dto.id,
        recorded_at,
        nozzle,
        product: dto.product_name,
        cash: dto.total_cash,
        liters: dto.total_liters,
        unit_price: dto.unit_price,
        tag: [dto.tag1, dto.tag2]
            .into_iter()
            .flatten()
            .find_map(|raw| TagId::parse(&raw)),
        attendant_name: dto.attendant_name.filter(|n| !n.trim().is_empty()),
        attendant_code: dto.attendant_code,
        verified: dto.integrity_ok == Some(true) && dto.checksum_ok == Some(true),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn status(code: Option<&str>, status: Option<i64>) -> NozzleStatusDto {
        NozzleStatusDto {
            nozzle_code: code.map(String::from),
            status,
            status_name: None,
        }
    }

    #[test]
    fn malformed_status_records_are_dropped() {
        let layout = StationLayout::standard();
        let readings = nozzle_readings(
            vec![
                status(Some("01"), Some(1)),
                status(None, Some(1)),
                status(Some("xx"), Some(1)),
                status(Some("02"), Some(12)),
                status(Some("03"), None),
                status(Some("31"), Some(1)),
                status(Some("4"), Some(3)),
            ],
            &layout,
        );
        let codes: Vec<_> = readings.iter().map(|r| r.code.to_string()).collect();
        assert_eq!(codes, vec!["01", "04"]);
        assert_eq!(readings[1].status, NozzleStatus::Fueling);
        assert_eq!(readings[1].product, "Super");
    }

    #[test]
    fn reading_update_normalizes_tag() {
        let dto = VisualizationDto {
            nozzle_code: Some("05".into()),
            current_cash: Some(12.0),
            tag_id: Some(" ab12 ".into()),
            ..VisualizationDto::default()
        };
        let update = reading_update(&dto).unwrap();
        assert_eq!(update.code.number(), 5);
        assert_eq!(update.tag.unwrap().as_str(), "AB12");
    }

    #[test]
    fn reading_without_code_or_cash_is_dropped() {
        let no_code = VisualizationDto {
            current_cash: Some(1.0),
            ..VisualizationDto::default()
        };
        let no_cash = VisualizationDto {
            nozzle_code: Some("01".into()),
            ..VisualizationDto::default()
        };
        let nan = VisualizationDto {
            nozzle_code: Some("01".into()),
            current_cash: Some(f64::NAN),
            ..VisualizationDto::default()
        };
        assert!(reading_updates(vec![no_code, no_cash, nan]).is_empty());
    }

    #[test]
    fn blank_tag_is_absent() {
        let dto = VisualizationDto {
            nozzle_code: Some("01".into()),
            current_cash: Some(0.0),
            tag_id: Some("   ".into()),
            ..VisualizationDto::default()
        };
        assert!(reading_update(&dto).unwrap().tag.is_none());
    }

    #[test]
    fn attendant_photo_is_resolved() {
        let dto = AttendantDto {
            id: None,
            code: Some("007".into()),
            full_name: " Juan Perez ".into(),
            tag_id: Some("0a1b".into()),
            is_active: true,
            photo_url: Some("/uploads/7.jpg".into()),
        };
        let identities =
            attendant_identities(vec![dto], |p| Some(format!("http://backend{p}")));
        assert_eq!(identities[0].name, "Juan Perez");
        assert_eq!(identities[0].tag.as_ref().unwrap().as_str(), "0A1B");
        assert_eq!(
            identities[0].photo_url.as_deref(),
            Some("http://backend/uploads/7.jpg")
        );
    }

    #[test]
    fn price_rows_without_price_are_dropped() {
        let rows = vec![
            ProductPriceDto {
                product_id: None,
                product_code: None,
                product_name: "Super".into(),
                current_price: Some(500.0),
                price_decimals: None,
                is_active: true,
            },
            ProductPriceDto {
                product_id: None,
                product_code: None,
                product_name: "Diesel".into(),
                current_price: None,
                price_decimals: None,
                is_active: true,
            },
        ];
        let prices = product_prices(rows);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].unit_price, 500.0);
    }

    #[test]
    fn full_tank_preset_sends_zero_amount() {
        let mut order = PresetOrder::new(
            NozzleCode::new(7).unwrap(),
            TagId::parse("0a1b2c3d4e5f6789").unwrap(),
            PresetLimit::FullTank,
        );
        order.price_level = crate::model::PriceLevel::Credit;
        let request = preset_request(&order);
        assert_eq!(request.nozzle_code, "07");
        assert_eq!(request.tag_id, "0A1B2C3D4E5F6789");
        assert_eq!((request.preset_type, request.preset_value), (0, 0.0));
        assert_eq!(request.timeout_seconds, 30);
        assert_eq!(request.price_level, 1);
        assert!(request.authorize);

        order.limit = PresetLimit::Volume(25.0);
        let request = preset_request(&order);
        assert_eq!((request.preset_type, request.preset_value), (1, 25.0));
    }

    #[test]
    fn history_bounds_use_backend_format() {
        let day = chrono::NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let query = transaction_query(&HistoryQuery {
            from: day.and_hms_opt(0, 0, 0),
            to: day.and_hms_opt(23, 59, 59),
            nozzle: NozzleCode::new(4),
        });
        assert_eq!(query.from.as_deref(), Some("2026-10-16T00:00:00"));
        assert_eq!(query.to.as_deref(), Some("2026-10-16T23:59:59"));
        assert_eq!(query.nozzle_id, Some(4));
    }

    #[test]
    fn transaction_falls_back_to_nozzle_number_and_second_tag() {
        let dto = FuelingTransactionDto {
            total_cash: Some(1500.0),
            transaction_date: Some("2026-10-16T08:30:00.123".into()),
            nozzle_number: Some(4),
            tag1: Some("  ".into()),
            tag2: Some("0a1b2c3d4e5f6789".into()),
            attendant_name: Some(String::new()),
            integrity_ok: Some(true),
            checksum_ok: Some(false),
            ..FuelingTransactionDto::default()
        };
        let transaction = fueling_transaction(dto);
        assert_eq!(transaction.nozzle, NozzleCode::new(4));
        assert_eq!(transaction.tag, TagId::parse("0A1B2C3D4E5F6789"));
        assert!(transaction.attendant_name.is_none());
        assert!(!transaction.verified);
        assert_eq!(
            transaction.recorded_at.unwrap().format(HISTORY_TIME_FORMAT).to_string(),
            "2026-10-16T08:30:00"
        );
    }

    #[test]
    fn transaction_date_with_offset_keeps_local_time() {
        let dto = FuelingTransactionDto {
            transaction_date: Some("2026-10-16T08:30:00-06:00".into()),
            ..FuelingTransactionDto::default()
        };
        let recorded = fueling_transaction(dto).recorded_at.unwrap();
        assert_eq!(recorded.format(HISTORY_TIME_FORMAT).to_string(), "2026-10-16T08:30:00");
    }
}
