//! The reconciliation engine
//!
//! `reconcile` is the only adjudication path: it walks both legs'
//! fields in a fixed, deterministic order, applies the configured
//! comparator per field, and short-circuits on the first mismatch.
//! It never touches the outside world; callers own the idempotency
//! guards that keep it from running twice for a finalized pair.

use crate::rules::{Comparator, MatchRules};
use crate::types::{Side, Trade, TradeDetails, Verdict};
use serde_json::Value;
use std::collections::BTreeSet;

/// Compare two independently submitted legs of one logical trade.
///
/// Returns `Confirmed` naming the trade id when every field agrees under
/// its comparator, otherwise `Rejected` naming the first offending field
/// and both values. Pure and order-independent: which leg arrives as `a`
/// does not change the verdict.
pub fn reconcile(a: &Trade, b: &Trade, rules: &MatchRules) -> Verdict {
    match first_mismatch(a, b, rules) {
        Some(reason) => Verdict::Rejected(reason),
        None => Verdict::Confirmed(format!(
            "Trade with ID \"{}\" confirmed",
            a.trade_details.trade_id
        )),
    }
}

fn first_mismatch(a: &Trade, b: &Trade, rules: &MatchRules) -> Option<String> {
    let da = &a.trade_details;
    let db = &b.trade_details;

    // Typed fields first, in declaration order
    for field in ["trade_id", "timestamp", "side", "counterparty"] {
        let mismatch = match (field, rules.comparator_for(field)) {
            ("timestamp", Comparator::TimestampWithin(tolerance_ms)) => {
                compare_timestamps("timestamp", da.timestamp, db.timestamp, tolerance_ms)
            }
            ("side", Comparator::InvertedSide) => compare_sides(da.side, db.side),
            ("counterparty", Comparator::CrossReference) => cross_reference(a, b),
            // A deployment may reconfigure a typed field back to Exact
            (_, _) => compare_exact(field, &typed_value(da, field), &typed_value(db, field)),
        };
        if mismatch.is_some() {
            return mismatch;
        }
    }

    // Extension fields in sorted order; the union of both legs' keys so a
    // field present on only one side still counts as a mismatch
    let keys: BTreeSet<&String> = da.extra.keys().chain(db.extra.keys()).collect();
    for key in keys {
        let va = da.extra.get(key.as_str()).cloned().unwrap_or(Value::Null);
        let vb = db.extra.get(key.as_str()).cloned().unwrap_or(Value::Null);
        let mismatch = match rules.comparator_for(key) {
            Comparator::TimestampWithin(tolerance_ms) => compare_timestamps(
                key,
                va.as_i64().unwrap_or(i64::MIN),
                vb.as_i64().unwrap_or(i64::MAX),
                tolerance_ms,
            ),
            _ => compare_exact(key, &va, &vb),
        };
        if mismatch.is_some() {
            return mismatch;
        }
    }

    None
}

fn compare_timestamps(field: &str, ta: i64, tb: i64, tolerance_ms: i64) -> Option<String> {
    if ta.abs_diff(tb) > tolerance_ms.unsigned_abs() {
        Some(format!(
            "{field} outside matching tolerance. A: {ta}, B: {tb}"
        ))
    } else {
        None
    }
}

fn compare_sides(sa: Side, sb: Side) -> Option<String> {
    if sb != sa.inverted() {
        Some(format!("order side does not match. A: {sa}, B: {sb}"))
    } else {
        None
    }
}

/// A's reference must name B's own identity and symmetrically
fn cross_reference(a: &Trade, b: &Trade) -> Option<String> {
    let matches =
        a.trade_details.counterparty == b.bank && b.trade_details.counterparty == a.bank;
    if matches {
        None
    } else {
        Some(format!(
            "counterparties do not match. A: {}, B: {}",
            a.trade_details.counterparty, b.trade_details.counterparty
        ))
    }
}

fn compare_exact(field: &str, va: &Value, vb: &Value) -> Option<String> {
    if va != vb {
        Some(format!(
            "trade data with key \"{field}\" does not match. A: {}, B: {}",
            fmt_value(va),
            fmt_value(vb)
        ))
    } else {
        None
    }
}

fn typed_value(details: &TradeDetails, field: &str) -> Value {
    match field {
        "trade_id" => Value::String(details.trade_id.clone()),
        "timestamp" => Value::from(details.timestamp),
        "side" => Value::String(details.side.to_string()),
        "counterparty" => Value::String(details.counterparty.clone()),
        _ => Value::Null,
    }
}

/// Strings without JSON quoting, everything else as JSON
fn fmt_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
