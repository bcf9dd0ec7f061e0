// Monitoring backend response types
//
// Field presence varies across backend builds: nozzle codes arrive as
// `"07"` or `7`, the running total is named `currentCash` or
// `currentLiters`, and the tag is often missing. Everything beyond the
// identifying code is therefore optional and `#[serde(default)]`.

use serde::{Deserialize, Deserializer, Serialize};

// ── Lenient field helpers ────────────────────────────────────────────

/// Accept a string or a JSON number and keep it as a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        },
    )
}

/// Accept a number or a numeric string (`"12.5"`).
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        },
    )
}

// ── Status ───────────────────────────────────────────────────────────

/// One entry of `GET /api/Monitoring/status`.
///
/// `status` is kept as a raw integer; range validation happens in core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NozzleStatusDto {
    #[serde(default, deserialize_with = "string_or_number")]
    pub nozzle_code: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
    /// Operator label the backend attaches ("Libre", "Abasteciendo", ...).
    #[serde(default)]
    pub status_name: Option<String>,
}

// ── Visualization ────────────────────────────────────────────────────

/// One entry of `GET /api/Monitoring/visualization`, also the shape of
/// object payloads pushed through `VisualizationUpdated`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationDto {
    #[serde(default, alias = "nozzleNumber", deserialize_with = "string_or_number")]
    pub nozzle_code: Option<String>,
    #[serde(
        default,
        alias = "currentLiters",
        alias = "currentValue",
        deserialize_with = "number_or_string"
    )]
    pub current_cash: Option<f64>,
    #[serde(default)]
    pub tag_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
}

// ── Attendants ───────────────────────────────────────────────────────

/// Attendant record from `GET /api/attendants`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendantDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub tag_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// May be relative to the backend base URL.
    #[serde(default)]
    pub photo_url: Option<String>,
}

// ── Prices ───────────────────────────────────────────────────────────

/// Current price row from `GET /api/prices/current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPriceDto {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
    pub product_name: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_decimals: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

// ── Pump control ─────────────────────────────────────────────────────

/// Body of `POST /api/Pump/preset-with-tag`.
///
/// The numeric fields carry the backend's codes: `identifier_type`
/// 0 attendant / 1 customer, `preset_type` 0 amount / 1 volume,
/// `price_level` 0 cash / 1 credit / 2 debit. A `preset_value` of 0
/// means fill the tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetWithTagRequest {
    pub nozzle_code: String,
    pub tag_id: String,
    pub identifier_type: u8,
    pub authorize: bool,
    pub preset_value: f64,
    pub timeout_seconds: u8,
    pub preset_type: u8,
    pub price_level: u8,
}

// ── Fueling history ──────────────────────────────────────────────────

/// Filter for `GET /api/Fueling/transactions`.
///
/// Bounds are backend-local timestamps (`2026-10-16T00:00:00`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub nozzle_id: Option<u8>,
}

impl TransactionQuery {
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref from) = self.from {
            params.push(("from", from.clone()));
        }
        if let Some(ref to) = self.to {
            params.push(("to", to.clone()));
        }
        if let Some(nozzle) = self.nozzle_id {
            params.push(("nozzleId", nozzle.to_string()));
        }
        params
    }
}

/// One completed fueling as recorded by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelingTransactionDto {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_cash: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_liters: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub register_number: Option<i64>,
    #[serde(default)]
    pub integrity_ok: Option<bool>,
    #[serde(default)]
    pub checksum_ok: Option<bool>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub nozzle_code: Option<String>,
    #[serde(default)]
    pub nozzle_number: Option<i64>,
    #[serde(default)]
    pub tag1: Option<String>,
    #[serde(default)]
    pub tag2: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub attendant_name: Option<String>,
    #[serde(default)]
    pub attendant_code: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_numeric_code() {
        let dto: NozzleStatusDto =
            serde_json::from_str(r#"{"nozzleCode": 7, "status": 3, "statusName": "Abasteciendo"}"#)
                .unwrap();
        assert_eq!(dto.nozzle_code.as_deref(), Some("7"));
        assert_eq!(dto.status, Some(3));
    }

    #[test]
    fn status_missing_code_is_none() {
        let dto: NozzleStatusDto = serde_json::from_str(r#"{"status": 1}"#).unwrap();
        assert!(dto.nozzle_code.is_none());
    }

    #[test]
    fn visualization_accepts_current_liters_alias() {
        let dto: VisualizationDto = serde_json::from_str(
            r#"{"nozzleCode": "03", "currentLiters": 12.5, "productName": "Diesel", "status": 3}"#,
        )
        .unwrap();
        assert_eq!(dto.nozzle_code.as_deref(), Some("03"));
        assert_eq!(dto.current_cash, Some(12.5));
        assert!(dto.tag_id.is_none());
    }

    #[test]
    fn visualization_with_tag_and_string_cash() {
        let dto: VisualizationDto = serde_json::from_str(
            r#"{"nozzleCode": "01", "currentCash": "1500", "tagId": "0a1b2c3d4e5f6789"}"#,
        )
        .unwrap();
        assert_eq!(dto.current_cash, Some(1500.0));
        assert_eq!(dto.tag_id.as_deref(), Some("0a1b2c3d4e5f6789"));
    }

    #[test]
    fn attendant_defaults_to_active() {
        let dto: AttendantDto =
            serde_json::from_str(r#"{"fullName": "Juan Perez", "tagId": "AB"}"#).unwrap();
        assert!(dto.is_active);
        assert!(dto.photo_url.is_none());
    }

    #[test]
    fn preset_request_uses_backend_field_names() {
        let request = PresetWithTagRequest {
            nozzle_code: "04".into(),
            tag_id: "0A1B2C3D4E5F6789".into(),
            identifier_type: 0,
            authorize: true,
            preset_value: 5000.0,
            timeout_seconds: 30,
            preset_type: 0,
            price_level: 2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["nozzleCode"], "04");
        assert_eq!(json["tagId"], "0A1B2C3D4E5F6789");
        assert_eq!(json["timeoutSeconds"], 30);
        assert_eq!(json["priceLevel"], 2);
        assert_eq!(json["authorize"], true);
    }

    #[test]
    fn transaction_query_skips_unset_bounds() {
        let query = TransactionQuery {
            from: Some("2026-10-16T00:00:00".into()),
            to: None,
            nozzle_id: Some(4),
        };
        assert_eq!(
            query.params(),
            vec![
                ("from", "2026-10-16T00:00:00".to_owned()),
                ("nozzleId", "4".to_owned()),
            ]
        );
        assert!(TransactionQuery::default().params().is_empty());
    }

    #[test]
    fn transaction_tolerates_nulls() {
        let dto: FuelingTransactionDto = serde_json::from_str(
            r#"{"id": "t-1", "totalCash": 1500, "totalLiters": 3.0, "unitPrice": 500,
                "transactionDate": "2026-10-16T08:30:00", "nozzleCode": null,
                "nozzleNumber": 4, "tag1": "0a1b2c3d4e5f6789", "tag2": null,
                "attendantName": null, "integrityOk": true, "checksumOk": true}"#,
        )
        .unwrap();
        assert_eq!(dto.total_cash, Some(1500.0));
        assert_eq!(dto.nozzle_number, Some(4));
        assert!(dto.nozzle_code.is_none());
        assert!(dto.attendant_name.is_none());
    }

    #[test]
    fn price_row_parses() {
        let dto: ProductPriceDto = serde_json::from_str(
            r#"{"productId": "p1", "productCode": "SUP", "productName": "Super",
                "currentPrice": 500, "priceDecimals": 0, "isActive": true}"#,
        )
        .unwrap();
        assert_eq!(dto.product_name, "Super");
        assert_eq!(dto.current_price, Some(500.0));
    }
}
