// src/aggregator.rs
//
// Turns the per-API result sets into one record per address.
//
// | API      | amount location                          | scaling             |
// |----------|------------------------------------------|---------------------|
// | PUFFER   | `[0].amount`                             | x 1e-18, 3 dp       |
// | ETHERFI  | `.amount`                                | x 1e-18, 3 dp       |
// | EIGEN_S2 | `.season2.data.pipelines.tokenQualified` | none                |
// | RENZO    | `[0].awardAmount`                        | x 1e-18, 3 dp       |

use crate::api_spec::ApiKind;
use crate::batch_runner::PerApiResultSet;
use crate::fetcher::FetchResult;
use crate::metrics;
use crate::report::{CombinedRecord, Report};
use indexmap::IndexMap;
use log::{debug, error};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places kept for wei-denominated amounts.
const TOKEN_DECIMALS_SHOWN: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("{api}: amount `{raw}` is not a finite number")]
    NotRepresentable { api: ApiKind, raw: String },
}

/// A parsed raw amount, before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawAmount {
    Exact(Decimal),
    /// Finite value outside what [`Decimal`] can hold.
    Float(f64),
}

/// Locates the raw amount for `kind` inside its payload.
pub fn extract_amount(kind: ApiKind, payload: &Value) -> Option<&Value> {
    match kind {
        ApiKind::Puffer => payload.as_array()?.first()?.get("amount"),
        ApiKind::Etherfi => payload.as_object()?.get("amount"),
        ApiKind::EigenS2 => payload.pointer("/season2/data/pipelines/tokenQualified"),
        ApiKind::Renzo => payload.as_array()?.first()?.get("awardAmount"),
    }
}

fn scales_from_wei(kind: ApiKind) -> bool {
    !matches!(kind, ApiKind::EigenS2)
}

/// Parses a JSON number or numeric string.
///
/// Returns `Ok(None)` for anything that is not a number at all, and an error
/// for NaN or infinite values.
pub fn parse_amount(
    kind: ApiKind,
    value: &Value,
) -> Result<Option<RawAmount>, AggregationError> {
    let not_finite = || AggregationError::NotRepresentable {
        api: kind,
        raw: value.to_string(),
    };
    let from_float = |f: f64| {
        if !f.is_finite() {
            return Err(not_finite());
        }
        Ok(Some(match Decimal::from_f64(f) {
            Some(d) => RawAmount::Exact(d),
            None => RawAmount::Float(f),
        }))
    };

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(RawAmount::Exact(Decimal::from(i))))
            } else if let Some(u) = n.as_u64() {
                Ok(Some(RawAmount::Exact(Decimal::from(u))))
            } else {
                from_float(n.as_f64().ok_or_else(not_finite)?)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(d) = Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)) {
                return Ok(Some(RawAmount::Exact(d)));
            }
            match s.parse::<f64>() {
                Ok(f) => from_float(f),
                Err(_) => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

/// Applies the per-API scaling and converts to the reported float.
pub fn normalize(kind: ApiKind, amount: RawAmount) -> Result<f64, AggregationError> {
    let not_finite = |raw: String| AggregationError::NotRepresentable { api: kind, raw };

    let exact = match amount {
        RawAmount::Exact(d) if scales_from_wei(kind) => d.checked_mul(Decimal::new(1, 18)),
        RawAmount::Exact(d) => Some(d),
        RawAmount::Float(_) => None,
    };
    if let Some(scaled) = exact {
        let scaled = if scales_from_wei(kind) {
            scaled.round_dp(TOKEN_DECIMALS_SHOWN)
        } else {
            scaled
        };
        return scaled
            .to_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| not_finite(scaled.to_string()));
    }

    let raw = match amount {
        RawAmount::Exact(d) => d.to_f64().ok_or_else(|| not_finite(d.to_string()))?,
        RawAmount::Float(f) => f,
    };
    let value = if scales_from_wei(kind) {
        round_float(raw * 1e-18)
    } else {
        raw
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(not_finite(raw.to_string()))
    }
}

/// Half-to-even rounding of a scaled float, in `Decimal` when it fits.
fn round_float(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(TOKEN_DECIMALS_SHOWN))
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| (value * 1000.0).round() / 1000.0)
}

/// Amount contributed by one API for one address; 0 when there is no data.
pub fn amount_for(kind: ApiKind, result: Option<&FetchResult>) -> Result<f64, AggregationError> {
    let Some(raw) = result
        .and_then(FetchResult::payload)
        .and_then(|payload| extract_amount(kind, payload))
    else {
        return Ok(0.0);
    };

    match parse_amount(kind, raw)? {
        Some(amount) => normalize(kind, amount),
        None => {
            debug!("[AGGREGATE] {}: ignoring non-numeric amount {}", kind, raw);
            Ok(0.0)
        }
    }
}

/// Builds the record for one address, or `None` when nothing is claimable.
pub fn process_address(
    address: &str,
    per_api: &HashMap<ApiKind, PerApiResultSet>,
    apis_to_use: &[ApiKind],
) -> Result<Option<CombinedRecord>, AggregationError> {
    let mut amounts = IndexMap::new();
    for &kind in apis_to_use {
        let result = per_api.get(&kind).and_then(|set| set.get(address));
        let amount = amount_for(kind, result)?;
        if amount > 0.0 {
            amounts.insert(kind, amount);
        }
    }

    if amounts.is_empty() {
        return Ok(None);
    }
    Ok(Some(CombinedRecord {
        address: address.to_string(),
        amounts,
    }))
}

/// Merges every API's results into the final report, in input address order.
///
/// An address whose data cannot be processed is logged together with its raw
/// payloads and left out; the others are unaffected.
pub fn combine(
    per_api: &HashMap<ApiKind, PerApiResultSet>,
    addresses: &[String],
    apis_to_use: &[ApiKind],
) -> Report {
    let mut seen = std::collections::HashSet::new();
    let mut records = Vec::new();

    for address in addresses.iter().filter(|a| seen.insert(a.as_str())) {
        match process_address(address, per_api, apis_to_use) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                let raw: IndexMap<&str, Option<&FetchResult>> = apis_to_use
                    .iter()
                    .map(|kind| {
                        let result = per_api.get(kind).and_then(|set| set.get(address));
                        (kind.key(), result)
                    })
                    .collect();
                error!(
                    "[AGGREGATE] error processing address {}: {}. Combined data: {:?}",
                    address, e, raw
                );
                metrics::increment_aggregation_errors();
            }
        }
    }

    Report::new(records)
}
