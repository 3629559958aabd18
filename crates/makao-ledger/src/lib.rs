//! Carried-forward balance engine.
//!
//! Every financial event lands here as an append-only [`LedgerEntry`]. The
//! entry's `total_amount_carried_forward` is computed from the occupation's
//! most recent entry, so the read-then-append pair must never interleave for
//! the same occupation. [`LedgerService`] guarantees that with a per
//! occupation async lock; unrelated occupations post in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;
use uuid::Uuid;

use makao_core::models::{EntryType, Invoice, LedgerEntry, Payment};
use makao_core::storage::LedgerEntryStore;
use makao_core::{Error, Result};

/// Hands out one async mutex per occupation id. Lock handles are owned so
/// they can be held across awaits while the registry itself stays unlocked.
#[derive(Default)]
pub struct KeyedLock {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLock {
    pub async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

pub struct LedgerService {
    entries: Arc<dyn LedgerEntryStore>,
    occupation_locks: KeyedLock,
}

impl LedgerService {
    pub fn new(entries: Arc<dyn LedgerEntryStore>) -> Self {
        Self {
            entries,
            occupation_locks: KeyedLock::default(),
        }
    }

    /// Record a new obligation from `invoice`.
    ///
    /// The entry's `total_amount_owed` is the invoice's period amount, not a
    /// running total; the running total lives in the carried-forward column.
    pub async fn post_debit(&self, invoice: &Invoice) -> Result<LedgerEntry> {
        let amount = invoice.total();
        if amount < Decimal::ZERO {
            return Err(Error::Integrity(format!(
                "invoice {} has negative period amount {amount}",
                invoice.number
            )));
        }

        let _guard = self.occupation_locks.acquire(invoice.occupation_id).await;
        let brought_forward = self.balance_unlocked(invoice.occupation_id).await?;

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            sequence: 0,
            entry_type: EntryType::Debit,
            occupation_id: invoice.occupation_id,
            invoice_id: Some(invoice.id),
            receipt_id: None,
            total_amount_owed: amount,
            total_amount_paid: None,
            total_amount_carried_forward: brought_forward + amount,
            created_on: Utc::now(),
        };
        let entry = self.entries.append(entry).await?;
        info!(
            "posted debit of {amount} against occupation {}, balance {}",
            invoice.occupation_id, entry.total_amount_carried_forward
        );
        Ok(entry)
    }

    /// Record a received payment against `occupation_id`.
    ///
    /// Posting is idempotent per receipt: a credit already recorded for
    /// `receipt_id` is returned as is, so an interrupted claim can be
    /// finished without doubling the entry.
    pub async fn post_credit(
        &self,
        occupation_id: Uuid,
        receipt_id: Uuid,
        payment: &Payment,
    ) -> Result<LedgerEntry> {
        if payment.amount <= Decimal::ZERO {
            return Err(Error::Integrity(format!(
                "payment {} has non-positive amount {}",
                payment.reference_number, payment.amount
            )));
        }

        let _guard = self.occupation_locks.acquire(occupation_id).await;
        if let Some(existing) = self.find_credit(occupation_id, receipt_id).await? {
            info!(
                "credit for receipt {receipt_id} already posted as entry {}, reusing it",
                existing.id
            );
            return Ok(existing);
        }
        let brought_forward = self.balance_unlocked(occupation_id).await?;

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            sequence: 0,
            entry_type: EntryType::Credit,
            occupation_id,
            invoice_id: None,
            receipt_id: Some(receipt_id),
            total_amount_owed: Decimal::ZERO,
            total_amount_paid: Some(payment.amount),
            total_amount_carried_forward: brought_forward - payment.amount,
            created_on: Utc::now(),
        };
        let entry = self.entries.append(entry).await?;
        info!(
            "posted credit of {} against occupation {occupation_id}, balance {}",
            payment.amount, entry.total_amount_carried_forward
        );
        Ok(entry)
    }

    /// Current balance: the latest entry's carried-forward amount, zero for
    /// an occupation with no ledger history.
    pub async fn current_balance(&self, occupation_id: Uuid) -> Result<Decimal> {
        let _guard = self.occupation_locks.acquire(occupation_id).await;
        self.balance_unlocked(occupation_id).await
    }

    async fn find_credit(
        &self,
        occupation_id: Uuid,
        receipt_id: Uuid,
    ) -> Result<Option<LedgerEntry>> {
        Ok(self
            .entries
            .find_by_occupation(occupation_id)
            .await?
            .into_iter()
            .find(|entry| entry.receipt_id == Some(receipt_id)))
    }

    async fn balance_unlocked(&self, occupation_id: Uuid) -> Result<Decimal> {
        Ok(self
            .entries
            .latest_for_occupation(occupation_id)
            .await?
            .map(|entry| entry.total_amount_carried_forward)
            .unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use makao_core::models::{Currency, InvoiceType, PaymentStatus};
    use makao_core::storage::LedgerEntryStore;
    use makao_store::InMemoryLedgerEntryStore;

    use super::*;

    fn invoice(occupation_id: Uuid, rent: i64, security: i64, garbage: i64) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            number: "INV100000OAB12C".to_string(),
            invoice_type: InvoiceType::Rent,
            occupation_id,
            currency: Currency::Kes,
            start_date: NaiveDate::from_ymd_opt(2026, 8, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 31),
            rent_amount: Decimal::from(rent),
            security_amount: Decimal::from(security),
            garbage_amount: Decimal::from(garbage),
            other_amounts: HashMap::new(),
            created_on: Utc::now(),
        }
    }

    fn payment(amount: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            status: PaymentStatus::Unclaimed,
            occupation_number: "OAB12C".to_string(),
            reference_number: "QWE123".to_string(),
            currency: Currency::Kes,
            amount: Decimal::from(amount),
            created_on: Utc::now(),
        }
    }

    fn service() -> LedgerService {
        LedgerService::new(Arc::new(InMemoryLedgerEntryStore::default()))
    }

    #[tokio::test]
    async fn first_debit_starts_from_zero() {
        let ledger = service();
        let occupation_id = Uuid::new_v4();

        let entry = ledger
            .post_debit(&invoice(occupation_id, 27_000, 500, 300))
            .await
            .unwrap();

        assert_eq!(entry.total_amount_owed, Decimal::from(27_800));
        assert_eq!(entry.total_amount_carried_forward, Decimal::from(27_800));
        assert_eq!(entry.total_amount_paid, None);
    }

    #[tokio::test]
    async fn debit_adds_onto_brought_forward() {
        let ledger = service();
        let occupation_id = Uuid::new_v4();

        ledger.post_debit(&invoice(occupation_id, 5_000, 0, 0)).await.unwrap();
        let entry = ledger
            .post_debit(&invoice(occupation_id, 27_800, 0, 0))
            .await
            .unwrap();

        assert_eq!(entry.total_amount_owed, Decimal::from(27_800));
        assert_eq!(entry.total_amount_carried_forward, Decimal::from(32_800));
    }

    #[tokio::test]
    async fn credit_subtracts_from_brought_forward() {
        let ledger = service();
        let occupation_id = Uuid::new_v4();

        ledger.post_debit(&invoice(occupation_id, 5_000, 0, 0)).await.unwrap();
        let entry = ledger
            .post_credit(occupation_id, Uuid::new_v4(), &payment(20_000))
            .await
            .unwrap();

        assert_eq!(entry.total_amount_paid, Some(Decimal::from(20_000)));
        assert_eq!(entry.total_amount_carried_forward, Decimal::from(-15_000));
        assert_eq!(entry.total_amount_owed, Decimal::ZERO);
    }

    #[tokio::test]
    async fn reposting_a_credit_for_the_same_receipt_returns_the_existing_entry() {
        let ledger = service();
        let occupation_id = Uuid::new_v4();
        let receipt_id = Uuid::new_v4();

        ledger.post_debit(&invoice(occupation_id, 30_000, 0, 0)).await.unwrap();
        let first = ledger
            .post_credit(occupation_id, receipt_id, &payment(20_000))
            .await
            .unwrap();
        let second = ledger
            .post_credit(occupation_id, receipt_id, &payment(20_000))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(
            ledger.current_balance(occupation_id).await.unwrap(),
            Decimal::from(10_000)
        );
    }

    #[tokio::test]
    async fn non_positive_payment_is_an_integrity_error() {
        let ledger = service();
        let err = ledger
            .post_credit(Uuid::new_v4(), Uuid::new_v4(), &payment(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[tokio::test]
    async fn concurrent_debits_for_one_occupation_serialize() {
        let entries: Arc<dyn LedgerEntryStore> = Arc::new(InMemoryLedgerEntryStore::default());
        let ledger = Arc::new(LedgerService::new(Arc::clone(&entries)));
        let occupation_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.post_debit(&invoice(occupation_id, 1_000, 0, 0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(
            ledger.current_balance(occupation_id).await.unwrap(),
            Decimal::from(20_000)
        );

        // Carried-forward amounts must form a strict +1000 staircase in
        // sequence order; any interleaving would repeat a value.
        let trail = entries.find_by_occupation(occupation_id).await.unwrap();
        for (index, entry) in trail.iter().enumerate() {
            assert_eq!(
                entry.total_amount_carried_forward,
                Decimal::from(1_000 * (index as i64 + 1))
            );
        }
    }
}
