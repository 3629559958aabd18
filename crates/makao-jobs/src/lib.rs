//! Batch jobs of the reconciliation engine.
//!
//! Each job exposes one externally invokable entry point returning the
//! records it touched; the scheduler is a thin caller. Candidates within a
//! run fan out concurrently, but a failure in one candidate only logs and
//! skips that candidate; the batch always finishes.

pub mod config;
pub mod invoice;
pub mod notice;
pub mod notification;
pub mod occupation;
pub mod payment;

pub use config::{JobsConfig, RefundTiers};
pub use invoice::InvoiceJob;
pub use notice::NoticeJob;
pub use notification::NotificationJob;
pub use occupation::OccupationJob;
pub use payment::PaymentJob;

/// Upper bound on concurrently processed candidates per run. Ledger writes
/// for a single occupation still serialize inside the ledger service.
pub(crate) const MAX_IN_FLIGHT: usize = 8;
