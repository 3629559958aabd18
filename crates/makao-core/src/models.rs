use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Currency {
    Kes,
    Usd,
    Gbp,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Currency::Kes => "KES",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Debit,
    Credit,
}

/// A single debit or credit against an occupation's running balance.
///
/// Entries are append-only: the engine never mutates or deletes one once it
/// has been stored. The entry with the highest `sequence` for an occupation
/// carries the authoritative balance in `total_amount_carried_forward`
/// (positive = tenant owes, negative = tenant in credit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    /// Monotonic position assigned by the store on append. Disambiguates
    /// entries created within the same timestamp tick.
    pub sequence: i64,
    pub entry_type: EntryType,
    pub occupation_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub receipt_id: Option<Uuid>,
    /// The amount invoiced by this entry's period, not cumulative. Zero on
    /// credits.
    pub total_amount_owed: Decimal,
    /// The amount paid by this entry. Only set on credits.
    pub total_amount_paid: Option<Decimal>,
    /// Signed running balance as of this entry.
    pub total_amount_carried_forward: Decimal,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    Rent,
    RentAdvance,
    Penalty,
    Utilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub invoice_type: InvoiceType,
    pub occupation_id: Uuid,
    pub currency: Currency,
    /// Billing period bounds, inclusive. Set for period-based types.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rent_amount: Decimal,
    pub security_amount: Decimal,
    pub garbage_amount: Decimal,
    pub other_amounts: HashMap<String, Decimal>,
    pub created_on: DateTime<Utc>,
}

impl Invoice {
    /// Rent invoice covering the calendar month that contains `date`.
    pub fn rent_for_month(
        occupation: &Occupation,
        unit: &Unit,
        date: NaiveDate,
        previous: Option<&Invoice>,
    ) -> Self {
        let (start, end) = billing_month(date);
        Self {
            id: Uuid::new_v4(),
            number: next_document_number("INV", previous.map(|i| i.number.as_str()), &occupation.number),
            invoice_type: InvoiceType::Rent,
            occupation_id: occupation.id,
            currency: unit.currency,
            start_date: Some(start),
            end_date: Some(end),
            rent_amount: unit.rent_per_month,
            security_amount: unit.security_per_month,
            garbage_amount: unit.garbage_per_month,
            other_amounts: unit.other_amounts_per_month.clone(),
            created_on: Utc::now(),
        }
    }

    /// Period amount: rent + security + garbage + every named other amount.
    pub fn total(&self) -> Decimal {
        self.rent_amount
            + self.security_amount
            + self.garbage_amount
            + self.other_amounts.values().copied().sum::<Decimal>()
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub number: String,
    pub occupation_id: Uuid,
    pub payment_id: Uuid,
    pub created_on: DateTime<Utc>,
}

impl Receipt {
    pub fn for_payment(occupation: &Occupation, payment_id: Uuid, previous: Option<&Receipt>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: next_document_number("RCT", previous.map(|r| r.number.as_str()), &occupation.number),
            occupation_id: occupation.id,
            payment_id,
            created_on: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unclaimed,
    Claimed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub status: PaymentStatus,
    /// Account the payer addressed, expected to match an occupation number.
    pub occupation_number: String,
    /// Provider transaction reference, the fallback matching key.
    pub reference_number: String,
    pub currency: Currency,
    pub amount: Decimal,
    pub created_on: DateTime<Utc>,
}

impl Payment {
    pub fn unclaimed(
        occupation_number: impl Into<String>,
        reference_number: impl Into<String>,
        currency: Currency,
        amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: PaymentStatus::Unclaimed,
            occupation_number: occupation_number.into(),
            reference_number: reference_number.into(),
            currency,
            amount,
            created_on: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupationStatus {
    Booked,
    PendingOccupation,
    Current,
    PendingVacating,
    Vacated,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occupation {
    pub id: Uuid,
    pub status: OccupationStatus,
    /// Human-facing account number, the payment matching key.
    pub number: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Vacant,
    Occupied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub status: UnitStatus,
    pub account_number: String,
    pub currency: Currency,
    pub rent_per_month: Decimal,
    pub security_per_month: Decimal,
    pub garbage_per_month: Decimal,
    pub other_amounts_per_month: HashMap<String, Decimal>,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub is_active: bool,
    pub occupation_id: Uuid,
    pub notified_on: NaiveDate,
    pub vacating_on: NaiveDate,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Email,
    Sms,
}

/// Outbound message record. The jobs enqueue these exactly once per
/// triggering event; delivery is the dispatch job's problem and never feeds
/// back into the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub status: NotificationStatus,
    pub channel: NotificationChannel,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
    pub created_on: DateTime<Utc>,
}

impl Notification {
    pub fn pending(
        channel: NotificationChannel,
        recipient: impl Into<String>,
        subject: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: NotificationStatus::Pending,
            channel,
            recipient: recipient.into(),
            subject,
            message: message.into(),
            created_on: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    PendingRevision,
}

/// Deposit refund raised when a notice runs out, pending manual revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: Uuid,
    pub status: RefundStatus,
    pub occupation_id: Uuid,
    pub invoice_id: Uuid,
    pub currency: Currency,
    pub rent: Decimal,
    pub security: Decimal,
    pub garbage: Decimal,
    pub other_amounts: HashMap<String, Decimal>,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub mobile_number: String,
    pub created_on: DateTime<Utc>,
}

/// Inclusive bounds of the calendar month containing `date`.
pub fn billing_month(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    (first, last)
}

/// Document numbers embed a sequence between a three-letter prefix and the
/// occupation number, e.g. `INV100001OAB12C`. The sequence continues from
/// the previous document and starts at 100000; it is not fixed-width, so
/// everything between prefix and suffix is the sequence.
fn next_document_number(prefix: &str, previous: Option<&str>, occupation_number: &str) -> String {
    let next = previous
        .and_then(|number| number.strip_suffix(occupation_number))
        .and_then(|head| head.get(3..))
        .and_then(|digits| digits.parse::<i64>().ok())
        .map_or(100_000, |sequence| sequence + 1);
    format!("{prefix}{next}{occupation_number}")
}
