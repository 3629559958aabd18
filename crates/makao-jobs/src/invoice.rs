use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use makao_core::models::{
    Invoice, Notification, NotificationChannel, Occupation, OccupationStatus,
};
use makao_core::storage::{
    InvoiceStore, NotificationStore, OccupationStore, TenantStore, UnitStore,
};
use makao_core::{Error, Result};
use makao_ledger::LedgerService;

use crate::MAX_IN_FLIGHT;

/// Raises the rent obligation for every current occupation once per billing
/// month: one Rent invoice plus one debit ledger entry, then an invoice
/// notification. Re-runs within the month are no-ops because the period
/// probe finds the existing invoice.
pub struct InvoiceJob {
    occupations: Arc<dyn OccupationStore>,
    units: Arc<dyn UnitStore>,
    invoices: Arc<dyn InvoiceStore>,
    tenants: Arc<dyn TenantStore>,
    notifications: Arc<dyn NotificationStore>,
    ledger: Arc<LedgerService>,
}

impl InvoiceJob {
    pub fn new(
        occupations: Arc<dyn OccupationStore>,
        units: Arc<dyn UnitStore>,
        invoices: Arc<dyn InvoiceStore>,
        tenants: Arc<dyn TenantStore>,
        notifications: Arc<dyn NotificationStore>,
        ledger: Arc<LedgerService>,
    ) -> Self {
        Self {
            occupations,
            units,
            invoices,
            tenants,
            notifications,
            ledger,
        }
    }

    pub async fn create_invoices(&self) -> Result<Vec<Invoice>> {
        let candidates = self
            .occupations
            .find_by_status(OccupationStatus::Current)
            .await?;
        info!("invoice run over {} current occupations", candidates.len());

        let created = Mutex::new(Vec::new());
        stream::iter(candidates)
            .for_each_concurrent(MAX_IN_FLIGHT, |occupation| {
                let created = &created;
                async move {
                    match self.invoice_occupation(&occupation).await {
                        Ok(Some(invoice)) => {
                            info!(
                                "created invoice {} for occupation {}",
                                invoice.number, occupation.number
                            );
                            created.lock().await.push(invoice);
                        }
                        Ok(None) => debug!(
                            "occupation {} already invoiced for this period",
                            occupation.number
                        ),
                        Err(err) => error!(
                            "invoicing occupation {} failed: {err}",
                            occupation.number
                        ),
                    }
                }
            })
            .await;
        Ok(created.into_inner())
    }

    async fn invoice_occupation(&self, occupation: &Occupation) -> Result<Option<Invoice>> {
        let today = Utc::now().date_naive();
        if self
            .invoices
            .find_rent_for_period(occupation.id, today)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let unit = self
            .units
            .find_by_id(occupation.unit_id)
            .await?
            .ok_or_else(|| Error::not_found("unit", occupation.unit_id))?;
        let previous = self.invoices.latest_for_occupation(occupation.id).await?;
        let invoice = self
            .invoices
            .save(Invoice::rent_for_month(occupation, &unit, today, previous.as_ref()))
            .await?;
        self.ledger.post_debit(&invoice).await?;

        // The obligation is final once the debit is committed; a missed
        // notification is logged, never unwound.
        if let Err(err) = self.enqueue_notification(occupation, &invoice).await {
            warn!(
                "invoice {} posted but notification was not enqueued: {err}",
                invoice.number
            );
        }
        Ok(Some(invoice))
    }

    async fn enqueue_notification(
        &self,
        occupation: &Occupation,
        invoice: &Invoice,
    ) -> Result<()> {
        let tenant = self
            .tenants
            .find_by_id(occupation.tenant_id)
            .await?
            .ok_or_else(|| Error::not_found("tenant", occupation.tenant_id))?;
        let message = format!(
            "Rent invoice {} of {} {} has been raised for account {}.",
            invoice.number,
            invoice.currency,
            invoice.total(),
            occupation.number
        );
        self.notifications
            .save(Notification::pending(
                NotificationChannel::Email,
                tenant.email,
                Some(format!("Invoice {}", invoice.number)),
                message,
            ))
            .await?;
        Ok(())
    }
}
