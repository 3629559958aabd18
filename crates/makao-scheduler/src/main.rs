use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use makao_core::models::Notification;
use makao_core::storage::{
    InvoiceStore, LedgerEntryStore, NoticeStore, NotificationDispatcher, NotificationStore,
    OccupationStore, PaymentStore, ReceiptStore, RefundStore, TenantStore, UnitStore,
};
use makao_jobs::{
    InvoiceJob, JobsConfig, NoticeJob, NotificationJob, OccupationJob, PaymentJob,
};
use makao_ledger::LedgerService;
use makao_store::{
    InMemoryInvoiceStore, InMemoryLedgerEntryStore, InMemoryNoticeStore,
    InMemoryNotificationStore, InMemoryOccupationStore, InMemoryPaymentStore,
    InMemoryReceiptStore, InMemoryRefundStore, InMemoryTenantStore, InMemoryUnitStore,
};

/// Stand-in delivery collaborator: logs the message and reports success.
/// Real email/SMS transports live outside this service.
struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: &Notification) -> makao_core::Result<bool> {
        info!(
            "dispatching {:?} notification to {}: {}",
            notification.channel, notification.recipient, notification.message
        );
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "makao=info".to_string()))
        .init();

    let config = JobsConfig::from_env()?;

    let entries: Arc<dyn LedgerEntryStore> = Arc::new(InMemoryLedgerEntryStore::default());
    let occupations: Arc<dyn OccupationStore> = Arc::new(InMemoryOccupationStore::default());
    let units: Arc<dyn UnitStore> = Arc::new(InMemoryUnitStore::default());
    let invoices: Arc<dyn InvoiceStore> = Arc::new(InMemoryInvoiceStore::default());
    let receipts: Arc<dyn ReceiptStore> = Arc::new(InMemoryReceiptStore::default());
    let payments: Arc<dyn PaymentStore> = Arc::new(InMemoryPaymentStore::default());
    let notices: Arc<dyn NoticeStore> = Arc::new(InMemoryNoticeStore::default());
    let notifications: Arc<dyn NotificationStore> = Arc::new(InMemoryNotificationStore::default());
    let refunds: Arc<dyn RefundStore> = Arc::new(InMemoryRefundStore::default());
    let tenants: Arc<dyn TenantStore> = Arc::new(InMemoryTenantStore::default());

    let ledger = Arc::new(LedgerService::new(Arc::clone(&entries)));

    let invoice_job = Arc::new(InvoiceJob::new(
        Arc::clone(&occupations),
        Arc::clone(&units),
        Arc::clone(&invoices),
        Arc::clone(&tenants),
        Arc::clone(&notifications),
        Arc::clone(&ledger),
    ));
    let payment_job = Arc::new(PaymentJob::new(
        Arc::clone(&payments),
        Arc::clone(&occupations),
        Arc::clone(&receipts),
        Arc::clone(&tenants),
        Arc::clone(&notifications),
        Arc::clone(&ledger),
    ));
    let occupation_job = Arc::new(OccupationJob::new(
        Arc::clone(&occupations),
        Arc::clone(&units),
        Arc::clone(&tenants),
        Arc::clone(&notifications),
    ));
    let notice_job = Arc::new(NoticeJob::new(
        Arc::clone(&notices),
        Arc::clone(&occupations),
        Arc::clone(&units),
        Arc::clone(&invoices),
        Arc::clone(&refunds),
        config.refund_tiers.clone(),
    ));

    {
        let job = Arc::clone(&occupation_job);
        spawn_on_cadence("occupation activation", config.occupation_cadence, move || {
            let job = Arc::clone(&job);
            async move { job.activate_pending().await.map(|touched| touched.len()) }
        });
    }
    {
        let job = Arc::clone(&invoice_job);
        spawn_on_cadence("invoice generation", config.invoice_cadence, move || {
            let job = Arc::clone(&job);
            async move { job.create_invoices().await.map(|touched| touched.len()) }
        });
    }
    {
        let job = Arc::clone(&payment_job);
        spawn_on_cadence("payment reconciliation", config.payment_cadence, move || {
            let job = Arc::clone(&job);
            async move { job.process_payments().await.map(|touched| touched.len()) }
        });
    }
    {
        let job = Arc::clone(&notice_job);
        spawn_on_cadence("notice expiry", config.notice_cadence, move || {
            let job = Arc::clone(&job);
            async move { job.expire_notices().await.map(|touched| touched.len()) }
        });
    }

    if config.send_notifications {
        let job = Arc::new(NotificationJob::new(
            Arc::clone(&notifications),
            Arc::new(LogDispatcher),
        ));
        spawn_on_cadence("notification dispatch", config.notification_cadence, move || {
            let job = Arc::clone(&job);
            async move { job.send_pending().await.map(|touched| touched.len()) }
        });
    } else {
        info!("notification dispatch disabled by configuration");
    }

    info!("makao scheduler running");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}

fn spawn_on_cadence<F, Fut>(name: &'static str, cadence: Duration, run: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = makao_core::Result<usize>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cadence);
        loop {
            interval.tick().await;
            match run().await {
                Ok(touched) => info!("{name} run touched {touched} records"),
                Err(err) => error!("{name} run failed: {err}"),
            }
        }
    });
}
