use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::Result;
use crate::models::{
    Invoice, InvoiceType, LedgerEntry, Notice, Notification, Occupation, OccupationStatus,
    Payment, PaymentStatus, Receipt, Refund, Tenant, Unit,
};

/// Append-only store for ledger entries. The store assigns each appended
/// entry its monotonic `sequence`; callers must not rely on wall-clock
/// ordering across entries.
#[async_trait]
pub trait LedgerEntryStore: Send + Sync {
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry>;
    async fn latest_for_occupation(&self, occupation_id: Uuid) -> Result<Option<LedgerEntry>>;
    async fn find_by_occupation(&self, occupation_id: Uuid) -> Result<Vec<LedgerEntry>>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait OccupationStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Occupation>>;
    async fn find_by_number(&self, number: &str) -> Result<Option<Occupation>>;
    async fn find_by_status(&self, status: OccupationStatus) -> Result<Vec<Occupation>>;
    /// Occupations in `status` whose start date is on or before `date`.
    async fn find_starting_by(
        &self,
        status: OccupationStatus,
        date: NaiveDate,
    ) -> Result<Vec<Occupation>>;
    async fn save(&self, occupation: Occupation) -> Result<Occupation>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Unit>>;
    async fn save(&self, unit: Unit) -> Result<Unit>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Most recently created invoice for the occupation, used to continue
    /// the invoice number sequence.
    async fn latest_for_occupation(&self, occupation_id: Uuid) -> Result<Option<Invoice>>;
    /// Rent invoice whose billing period contains `date`, if any. This is
    /// the idempotency probe for the invoice generation job.
    async fn find_rent_for_period(
        &self,
        occupation_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Invoice>>;
    async fn find_by_type_for_occupation(
        &self,
        occupation_id: Uuid,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>>;
    async fn save(&self, invoice: Invoice) -> Result<Invoice>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn latest_for_occupation(&self, occupation_id: Uuid) -> Result<Option<Receipt>>;
    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Receipt>>;
    async fn save(&self, receipt: Receipt) -> Result<Receipt>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>>;
    async fn save(&self, payment: Payment) -> Result<Payment>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait NoticeStore: Send + Sync {
    /// Active notices whose vacating date is strictly before `date`.
    async fn find_active_expired(&self, date: NaiveDate) -> Result<Vec<Notice>>;
    async fn save(&self, notice: Notice) -> Result<Notice>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Pending notifications in creation order.
    async fn find_pending(&self) -> Result<Vec<Notification>>;
    async fn save(&self, notification: Notification) -> Result<Notification>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait RefundStore: Send + Sync {
    async fn find_by_occupation(&self, occupation_id: Uuid) -> Result<Vec<Refund>>;
    async fn save(&self, refund: Refund) -> Result<Refund>;
    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>>;
    async fn save(&self, tenant: Tenant) -> Result<Tenant>;
    async fn delete_all(&self) -> Result<()>;
}

/// Delivery collaborator. Returns `Ok(true)` when the message went out,
/// `Ok(false)` when the provider rejected it. The verdict only ever touches
/// the notification's own status.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<bool>;
}
