//! # Availability Math
//!
//! Pure ATS / ATP calculations. The storage layer reads the inputs in one
//! snapshot and hands them here.
//!
//! ```text
//! ATS(unit, loc)  = max(0, onHand - reservedOnHand - safetyStock)
//! ATP(unit, date) = Σ ATS(unit, *)
//!                 + Σ (qty - receivedQty)  over open lines with eta ≤ date
//!                 - Σ reservedIncoming(unit, *)
//! ```
//!
//! ATP is deliberately not floored: a negative figure means more forward
//! orders were accepted than supply due by that date.

use chrono::NaiveDate;

use crate::stock::StockRecord;
use crate::types::{AvailableToPromise, LocationAvailability, SupplyLine};

/// ATS for every record, one entry per location.
pub fn ats_by_location(records: &[StockRecord]) -> Vec<LocationAvailability> {
    records
        .iter()
        .map(|r| LocationAvailability {
            location_id: r.location_id.clone(),
            ats: r.ats(),
        })
        .collect()
}

/// Unreceived quantity on lines due on or before `date`.
///
/// Callers pass open lines only; fully received lines contribute nothing
/// either way.
pub fn incoming_by_date(lines: &[SupplyLine], date: NaiveDate) -> i64 {
    lines
        .iter()
        .filter(|line| line.eta <= date)
        .map(|line| line.remaining().max(0))
        .sum()
}

/// Computes ATP for `unit_id` from every stock record of the unit and its
/// open supply lines.
pub fn available_to_promise(
    unit_id: &str,
    date: NaiveDate,
    records: &[StockRecord],
    open_lines: &[SupplyLine],
) -> AvailableToPromise {
    let ats_now: i64 = records.iter().map(StockRecord::ats).sum();
    let reserved_incoming: i64 = records.iter().map(|r| r.reserved_incoming).sum();
    let incoming = incoming_by_date(open_lines, date);

    AvailableToPromise {
        unit_id: unit_id.to_string(),
        date,
        ats_now,
        incoming_by_date: incoming,
        reserved_incoming,
        atp: ats_now + incoming - reserved_incoming,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(location: &str, on_hand: i64, reserved: i64, safety: i64, reserved_incoming: i64) -> StockRecord {
        let mut rec = StockRecord::empty("SIZE-M", location, Utc::now());
        rec.on_hand = on_hand;
        rec.reserved_on_hand = reserved;
        rec.safety_stock = safety;
        rec.incoming = reserved_incoming.max(200);
        rec.reserved_incoming = reserved_incoming;
        rec
    }

    fn line(qty: i64, received: i64, eta: NaiveDate) -> SupplyLine {
        let now = Utc::now();
        SupplyLine {
            id: format!("line-{eta}"),
            purchase_order_id: "po-1".to_string(),
            unit_id: "SIZE-M".to_string(),
            location_id: "WH".to_string(),
            qty,
            eta,
            received_qty: received,
            created_at: now,
            updated_at: now,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    #[test]
    fn test_ats_by_location() {
        let records = vec![record("WH", 100, 50, 10, 0), record("STORE", 3, 0, 5, 0)];
        let ats = ats_by_location(&records);
        assert_eq!(ats.len(), 2);
        assert_eq!(ats[0].ats, 40);
        assert_eq!(ats[1].ats, 0);
    }

    #[test]
    fn test_incoming_by_date_respects_eta() {
        let lines = vec![line(200, 50, day(5)), line(100, 0, day(20))];
        assert_eq!(incoming_by_date(&lines, day(4)), 0);
        assert_eq!(incoming_by_date(&lines, day(5)), 150);
        assert_eq!(incoming_by_date(&lines, day(30)), 250);
    }

    #[test]
    fn test_atp_combines_stock_and_supply() {
        let records = vec![record("WH", 100, 0, 10, 150), record("STORE", 20, 5, 0, 0)];
        let lines = vec![line(200, 0, day(5))];
        let atp = available_to_promise("SIZE-M", day(10), &records, &lines);
        assert_eq!(atp.ats_now, 90 + 15);
        assert_eq!(atp.incoming_by_date, 200);
        assert_eq!(atp.reserved_incoming, 150);
        assert_eq!(atp.atp, 105 + 200 - 150);
    }

    #[test]
    fn test_atp_can_go_negative() {
        let records = vec![record("WH", 0, 0, 0, 150)];
        let lines = vec![line(200, 0, day(20))];
        let atp = available_to_promise("SIZE-M", day(10), &records, &lines);
        assert_eq!(atp.atp, -150);
    }
}
