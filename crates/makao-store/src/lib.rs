//! In-memory document stores.
//!
//! Each collection lives behind a `tokio::sync::RwLock`, keyed by record id.
//! The ledger store additionally hands out a monotonic sequence on append so
//! "latest entry" is well defined even when two entries share a timestamp.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use makao_core::models::{
    Invoice, InvoiceType, LedgerEntry, Notice, Notification, NotificationStatus, Occupation,
    OccupationStatus, Payment, PaymentStatus, Receipt, Refund, Tenant, Unit,
};
use makao_core::storage::{
    InvoiceStore, LedgerEntryStore, NoticeStore, NotificationStore, OccupationStore, PaymentStore,
    ReceiptStore, RefundStore, TenantStore, UnitStore,
};
use makao_core::{Error, Result};

#[derive(Default)]
pub struct InMemoryLedgerEntryStore {
    entries: RwLock<Vec<LedgerEntry>>,
    sequence: RwLock<i64>,
}

#[async_trait]
impl LedgerEntryStore for InMemoryLedgerEntryStore {
    async fn append(&self, mut entry: LedgerEntry) -> Result<LedgerEntry> {
        let mut sequence_guard = self.sequence.write().await;
        *sequence_guard += 1;
        entry.sequence = *sequence_guard;

        let mut entries = self.entries.write().await;
        if entries.iter().any(|existing| existing.id == entry.id) {
            return Err(Error::Integrity(format!(
                "ledger entry {} already exists; entries are append-only",
                entry.id
            )));
        }
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn latest_for_occupation(&self, occupation_id: Uuid) -> Result<Option<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|entry| entry.occupation_id == occupation_id)
            .max_by_key(|entry| entry.sequence)
            .cloned())
    }

    async fn find_by_occupation(&self, occupation_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        let mut found: Vec<LedgerEntry> = entries
            .iter()
            .filter(|entry| entry.occupation_id == occupation_id)
            .cloned()
            .collect();
        found.sort_by_key(|entry| entry.sequence);
        Ok(found)
    }

    async fn delete_all(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOccupationStore {
    records: RwLock<HashMap<Uuid, Occupation>>,
}

#[async_trait]
impl OccupationStore for InMemoryOccupationStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Occupation>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Occupation>> {
        let records = self.records.read().await;
        Ok(records.values().find(|o| o.number == number).cloned())
    }

    async fn find_by_status(&self, status: OccupationStatus) -> Result<Vec<Occupation>> {
        let records = self.records.read().await;
        Ok(records.values().filter(|o| o.status == status).cloned().collect())
    }

    async fn find_starting_by(
        &self,
        status: OccupationStatus,
        date: NaiveDate,
    ) -> Result<Vec<Occupation>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|o| o.status == status && o.start_date <= date)
            .cloned()
            .collect())
    }

    async fn save(&self, occupation: Occupation) -> Result<Occupation> {
        self.records.write().await.insert(occupation.id, occupation.clone());
        Ok(occupation)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUnitStore {
    records: RwLock<HashMap<Uuid, Unit>>,
}

#[async_trait]
impl UnitStore for InMemoryUnitStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Unit>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn save(&self, unit: Unit) -> Result<Unit> {
        self.records.write().await.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceStore {
    records: RwLock<HashMap<Uuid, Invoice>>,
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn latest_for_occupation(&self, occupation_id: Uuid) -> Result<Option<Invoice>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|invoice| invoice.occupation_id == occupation_id)
            .max_by_key(|invoice| invoice.created_on)
            .cloned())
    }

    async fn find_rent_for_period(
        &self,
        occupation_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Invoice>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|invoice| {
                invoice.occupation_id == occupation_id
                    && invoice.invoice_type == InvoiceType::Rent
                    && invoice.covers(date)
            })
            .cloned())
    }

    async fn find_by_type_for_occupation(
        &self,
        occupation_id: Uuid,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|invoice| {
                invoice.occupation_id == occupation_id && invoice.invoice_type == invoice_type
            })
            .max_by_key(|invoice| invoice.created_on)
            .cloned())
    }

    async fn save(&self, invoice: Invoice) -> Result<Invoice> {
        self.records.write().await.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReceiptStore {
    records: RwLock<HashMap<Uuid, Receipt>>,
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn latest_for_occupation(&self, occupation_id: Uuid) -> Result<Option<Receipt>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|receipt| receipt.occupation_id == occupation_id)
            .max_by_key(|receipt| receipt.created_on)
            .cloned())
    }

    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Receipt>> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.payment_id == payment_id).cloned())
    }

    async fn save(&self, receipt: Receipt) -> Result<Receipt> {
        self.records.write().await.insert(receipt.id, receipt.clone());
        Ok(receipt)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPaymentStore {
    records: RwLock<HashMap<Uuid, Payment>>,
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>> {
        let records = self.records.read().await;
        Ok(records.values().filter(|p| p.status == status).cloned().collect())
    }

    async fn save(&self, payment: Payment) -> Result<Payment> {
        self.records.write().await.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNoticeStore {
    records: RwLock<HashMap<Uuid, Notice>>,
}

#[async_trait]
impl NoticeStore for InMemoryNoticeStore {
    async fn find_active_expired(&self, date: NaiveDate) -> Result<Vec<Notice>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|notice| notice.is_active && notice.vacating_on < date)
            .cloned()
            .collect())
    }

    async fn save(&self, notice: Notice) -> Result<Notice> {
        self.records.write().await.insert(notice.id, notice.clone());
        Ok(notice)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: RwLock<HashMap<Uuid, Notification>>,
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn find_pending(&self) -> Result<Vec<Notification>> {
        let records = self.records.read().await;
        let mut pending: Vec<Notification> = records
            .values()
            .filter(|n| n.status == NotificationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|n| n.created_on);
        Ok(pending)
    }

    async fn save(&self, notification: Notification) -> Result<Notification> {
        self.records.write().await.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRefundStore {
    records: RwLock<HashMap<Uuid, Refund>>,
}

#[async_trait]
impl RefundStore for InMemoryRefundStore {
    async fn find_by_occupation(&self, occupation_id: Uuid) -> Result<Vec<Refund>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|refund| refund.occupation_id == occupation_id)
            .cloned()
            .collect())
    }

    async fn save(&self, refund: Refund) -> Result<Refund> {
        self.records.write().await.insert(refund.id, refund.clone());
        Ok(refund)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTenantStore {
    records: RwLock<HashMap<Uuid, Tenant>>,
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn save(&self, tenant: Tenant) -> Result<Tenant> {
        self.records.write().await.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn delete_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use makao_core::models::EntryType;

    use super::*;

    fn entry(occupation_id: Uuid, carried: i64) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            sequence: 0,
            entry_type: EntryType::Debit,
            occupation_id,
            invoice_id: None,
            receipt_id: None,
            total_amount_owed: Decimal::from(carried),
            total_amount_paid: None,
            total_amount_carried_forward: Decimal::from(carried),
            created_on: Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_assigns_strictly_increasing_sequences() {
        let store = InMemoryLedgerEntryStore::default();
        let occupation_id = Uuid::new_v4();

        let first = store.append(entry(occupation_id, 100)).await.unwrap();
        let second = store.append(entry(occupation_id, 200)).await.unwrap();

        assert!(second.sequence > first.sequence);
        let latest = store.latest_for_occupation(occupation_id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn re_appending_the_same_entry_is_rejected() {
        let store = InMemoryLedgerEntryStore::default();
        let one = entry(Uuid::new_v4(), 100);

        store.append(one.clone()).await.unwrap();
        let err = store.append(one).await.unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[tokio::test]
    async fn latest_is_scoped_per_occupation() {
        let store = InMemoryLedgerEntryStore::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.append(entry(a, 100)).await.unwrap();
        store.append(entry(b, 999)).await.unwrap();

        let latest_a = store.latest_for_occupation(a).await.unwrap().unwrap();
        assert_eq!(latest_a.total_amount_carried_forward, Decimal::from(100));
        assert!(store.find_by_occupation(a).await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn pending_notifications_come_back_in_creation_order() {
        let store = InMemoryNotificationStore::default();
        for index in 0..3 {
            let mut notification = makao_core::models::Notification::pending(
                makao_core::models::NotificationChannel::Email,
                format!("tenant{index}@example.com"),
                None,
                "rent due",
            );
            notification.created_on = Utc::now() + chrono::Duration::seconds(index);
            store.save(notification).await.unwrap();
        }

        let pending = store.find_pending().await.unwrap();
        let recipients: Vec<_> = pending.iter().map(|n| n.recipient.as_str()).collect();
        assert_eq!(
            recipients,
            vec!["tenant0@example.com", "tenant1@example.com", "tenant2@example.com"]
        );
    }
}
