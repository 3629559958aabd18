use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use makao_core::models::{
    Invoice, InvoiceType, Notice, Occupation, OccupationStatus, Refund, RefundStatus, UnitStatus,
};
use makao_core::storage::{
    InvoiceStore, NoticeStore, OccupationStore, RefundStore, UnitStore,
};
use makao_core::Result;

use crate::MAX_IN_FLIGHT;
use crate::config::RefundTiers;

/// Retires notices whose vacating date has passed. The notice flag flip is
/// the core transition; when the occupation is still pending vacating the
/// job also raises the deposit refund from the rent-advance invoice,
/// releases the unit and closes the occupation. The flag flip comes last so
/// an interrupted candidate is re-picked whole on the next run.
pub struct NoticeJob {
    notices: Arc<dyn NoticeStore>,
    occupations: Arc<dyn OccupationStore>,
    units: Arc<dyn UnitStore>,
    invoices: Arc<dyn InvoiceStore>,
    refunds: Arc<dyn RefundStore>,
    tiers: RefundTiers,
}

impl NoticeJob {
    pub fn new(
        notices: Arc<dyn NoticeStore>,
        occupations: Arc<dyn OccupationStore>,
        units: Arc<dyn UnitStore>,
        invoices: Arc<dyn InvoiceStore>,
        refunds: Arc<dyn RefundStore>,
        tiers: RefundTiers,
    ) -> Self {
        Self {
            notices,
            occupations,
            units,
            invoices,
            refunds,
            tiers,
        }
    }

    pub async fn expire_notices(&self) -> Result<Vec<Notice>> {
        let today = Utc::now().date_naive();
        let expired = self.notices.find_active_expired(today).await?;
        info!("notice run over {} expired notices", expired.len());

        let retired = Mutex::new(Vec::new());
        stream::iter(expired)
            .for_each_concurrent(MAX_IN_FLIGHT, |notice| {
                let retired = &retired;
                async move {
                    match self.expire(&notice).await {
                        Ok(notice) => {
                            info!("retired notice {} ", notice.id);
                            retired.lock().await.push(notice);
                        }
                        Err(err) => error!("retiring notice {} failed: {err}", notice.id),
                    }
                }
            })
            .await;
        Ok(retired.into_inner())
    }

    async fn expire(&self, notice: &Notice) -> Result<Notice> {
        self.release_occupation(notice).await?;

        let mut retired = notice.clone();
        retired.is_active = false;
        self.notices.save(retired).await
    }

    async fn release_occupation(&self, notice: &Notice) -> Result<()> {
        let Some(occupation) = self.occupations.find_by_id(notice.occupation_id).await? else {
            debug!(
                "notice {} references no live occupation, deactivating only",
                notice.id
            );
            return Ok(());
        };
        if occupation.status != OccupationStatus::PendingVacating {
            return Ok(());
        }

        match self
            .invoices
            .find_by_type_for_occupation(occupation.id, InvoiceType::RentAdvance)
            .await?
        {
            Some(advance) => {
                // A crash after the refund write leaves the occupation
                // pending vacating; the rerun must not raise a second one.
                if self.refunds.find_by_occupation(occupation.id).await?.is_empty() {
                    let refund = self.build_refund(notice, &occupation, &advance);
                    self.refunds.save(refund).await?;
                } else {
                    debug!(
                        "occupation {} already has a refund on file",
                        occupation.number
                    );
                }
            }
            None => debug!(
                "occupation {} has no rent-advance invoice, nothing to refund",
                occupation.number
            ),
        }

        if let Some(mut unit) = self.units.find_by_id(occupation.unit_id).await? {
            if unit.status == UnitStatus::Occupied {
                unit.status = UnitStatus::Vacant;
                self.units.save(unit).await?;
            }
        }

        let mut vacated = occupation;
        vacated.status = OccupationStatus::Vacated;
        vacated.end_date = Some(notice.vacating_on);
        self.occupations.save(vacated).await?;
        Ok(())
    }

    fn build_refund(
        &self,
        notice: &Notice,
        occupation: &Occupation,
        advance: &Invoice,
    ) -> Refund {
        let notice_days = (notice.vacating_on - notice.notified_on).num_days().abs() + 1;
        let portion = self.tiers.portion(notice_days);
        Refund {
            id: Uuid::new_v4(),
            status: RefundStatus::PendingRevision,
            occupation_id: occupation.id,
            invoice_id: advance.id,
            currency: advance.currency,
            rent: advance.rent_amount * portion,
            security: advance.security_amount * portion,
            garbage: advance.garbage_amount * portion,
            other_amounts: advance
                .other_amounts
                .iter()
                .map(|(name, amount)| (name.clone(), *amount * portion))
                .collect(),
            created_on: Utc::now(),
        }
    }
}
