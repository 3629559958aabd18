use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use makao_core::models::{
    Notification, NotificationChannel, Occupation, Payment, PaymentStatus, Receipt,
};
use makao_core::storage::{
    NotificationStore, OccupationStore, PaymentStore, ReceiptStore, TenantStore,
};
use makao_core::{Error, Result};
use makao_ledger::{KeyedLock, LedgerService};

use crate::MAX_IN_FLIGHT;

/// Attributes unclaimed payments to occupations. A matched payment gets a
/// receipt, a credit ledger entry, the CLAIMED flip and a confirmation
/// notification; an unmatched one stays UNCLAIMED and is retried on the next
/// run. The status field is the only duplicate-prevention mechanism, so the
/// flip happens after the dependent writes.
pub struct PaymentJob {
    payments: Arc<dyn PaymentStore>,
    occupations: Arc<dyn OccupationStore>,
    receipts: Arc<dyn ReceiptStore>,
    tenants: Arc<dyn TenantStore>,
    notifications: Arc<dyn NotificationStore>,
    ledger: Arc<LedgerService>,
    /// Serializes whole claims per occupation so two payments for the same
    /// account cannot race the receipt number sequence.
    claims: KeyedLock,
}

impl PaymentJob {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        occupations: Arc<dyn OccupationStore>,
        receipts: Arc<dyn ReceiptStore>,
        tenants: Arc<dyn TenantStore>,
        notifications: Arc<dyn NotificationStore>,
        ledger: Arc<LedgerService>,
    ) -> Self {
        Self {
            payments,
            occupations,
            receipts,
            tenants,
            notifications,
            ledger,
            claims: KeyedLock::default(),
        }
    }

    pub async fn process_payments(&self) -> Result<Vec<Payment>> {
        let unclaimed = self
            .payments
            .find_by_status(PaymentStatus::Unclaimed)
            .await?;
        info!("payment run over {} unclaimed payments", unclaimed.len());

        let claimed = Mutex::new(Vec::new());
        stream::iter(unclaimed)
            .for_each_concurrent(MAX_IN_FLIGHT, |payment| {
                let claimed = &claimed;
                async move {
                    match self.claim(&payment).await {
                        Ok(Some(payment)) => {
                            info!(
                                "claimed payment {} for account {}",
                                payment.reference_number, payment.occupation_number
                            );
                            claimed.lock().await.push(payment);
                        }
                        Ok(None) => debug!(
                            "payment {} matches no occupation, leaving unclaimed",
                            payment.reference_number
                        ),
                        Err(err) => error!(
                            "claiming payment {} failed: {err}",
                            payment.reference_number
                        ),
                    }
                }
            })
            .await;
        Ok(claimed.into_inner())
    }

    async fn claim(&self, payment: &Payment) -> Result<Option<Payment>> {
        let Some(occupation) = self.resolve_occupation(payment).await? else {
            return Ok(None);
        };

        let _guard = self.claims.acquire(occupation.id).await;
        // A crash after the receipt or credit write leaves the payment
        // unclaimed; the rerun must finish the claim, never repeat it.
        let receipt = match self.receipts.find_by_payment(payment.id).await? {
            Some(receipt) => {
                warn!(
                    "payment {} already receipted as {}, finishing claim",
                    payment.reference_number, receipt.number
                );
                receipt
            }
            None => {
                let previous = self.receipts.latest_for_occupation(occupation.id).await?;
                self.receipts
                    .save(Receipt::for_payment(&occupation, payment.id, previous.as_ref()))
                    .await?
            }
        };
        self.ledger
            .post_credit(occupation.id, receipt.id, payment)
            .await?;

        let mut claimed = payment.clone();
        claimed.status = PaymentStatus::Claimed;
        let claimed = self.payments.save(claimed).await?;

        if let Err(err) = self.enqueue_notification(&occupation, payment).await {
            warn!(
                "payment {} claimed but notification was not enqueued: {err}",
                payment.reference_number
            );
        }
        Ok(Some(claimed))
    }

    /// Match on the account number the payer addressed, falling back to the
    /// provider reference for payments keyed the other way round.
    async fn resolve_occupation(&self, payment: &Payment) -> Result<Option<Occupation>> {
        if let Some(occupation) = self
            .occupations
            .find_by_number(&payment.occupation_number)
            .await?
        {
            return Ok(Some(occupation));
        }
        self.occupations
            .find_by_number(&payment.reference_number)
            .await
    }

    async fn enqueue_notification(
        &self,
        occupation: &Occupation,
        payment: &Payment,
    ) -> Result<()> {
        let tenant = self
            .tenants
            .find_by_id(occupation.tenant_id)
            .await?
            .ok_or_else(|| Error::not_found("tenant", occupation.tenant_id))?;
        let message = format!(
            "{} {} received for account {}, reference {}.",
            payment.currency, payment.amount, occupation.number, payment.reference_number
        );
        self.notifications
            .save(Notification::pending(
                NotificationChannel::Sms,
                tenant.mobile_number,
                None,
                message,
            ))
            .await?;
        Ok(())
    }
}
