pub mod error;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
pub use models::{
    Currency, EntryType, Invoice, InvoiceType, LedgerEntry, Notice, Notification,
    NotificationChannel, NotificationStatus, Occupation, OccupationStatus, Payment, PaymentStatus,
    Receipt, Refund, RefundStatus, Tenant, Unit, UnitStatus, billing_month,
};
pub use storage::{
    InvoiceStore, LedgerEntryStore, NoticeStore, NotificationDispatcher, NotificationStore,
    OccupationStore, PaymentStore, ReceiptStore, RefundStore, TenantStore, UnitStore,
};
