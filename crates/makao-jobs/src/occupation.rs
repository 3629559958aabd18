use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use makao_core::models::{
    Notification, NotificationChannel, Occupation, OccupationStatus, UnitStatus,
};
use makao_core::storage::{NotificationStore, OccupationStore, TenantStore, UnitStore};
use makao_core::{Error, Result};

use crate::MAX_IN_FLIGHT;

/// Promotes occupations whose start date has arrived: the occupation goes
/// CURRENT, its unit goes OCCUPIED, the tenant gets a welcome message. Once
/// CURRENT the occupation drops out of the candidate query, which is the
/// whole idempotency story.
pub struct OccupationJob {
    occupations: Arc<dyn OccupationStore>,
    units: Arc<dyn UnitStore>,
    tenants: Arc<dyn TenantStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl OccupationJob {
    pub fn new(
        occupations: Arc<dyn OccupationStore>,
        units: Arc<dyn UnitStore>,
        tenants: Arc<dyn TenantStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            occupations,
            units,
            tenants,
            notifications,
        }
    }

    pub async fn activate_pending(&self) -> Result<Vec<Occupation>> {
        let today = Utc::now().date_naive();
        let due = self
            .occupations
            .find_starting_by(OccupationStatus::PendingOccupation, today)
            .await?;
        info!("activation run over {} pending occupations", due.len());

        let activated = Mutex::new(Vec::new());
        stream::iter(due)
            .for_each_concurrent(MAX_IN_FLIGHT, |occupation| {
                let activated = &activated;
                async move {
                    match self.activate(&occupation).await {
                        Ok(occupation) => {
                            info!("activated occupation {}", occupation.number);
                            activated.lock().await.push(occupation);
                        }
                        Err(err) => error!(
                            "activating occupation {} failed: {err}",
                            occupation.number
                        ),
                    }
                }
            })
            .await;
        Ok(activated.into_inner())
    }

    async fn activate(&self, occupation: &Occupation) -> Result<Occupation> {
        let mut unit = self
            .units
            .find_by_id(occupation.unit_id)
            .await?
            .ok_or_else(|| Error::not_found("unit", occupation.unit_id))?;

        match unit.status {
            UnitStatus::Vacant => {
                unit.status = UnitStatus::Occupied;
                self.units.save(unit).await?;
            }
            // A crash between the unit flip and the occupation flip leaves
            // the unit occupied with the occupation still pending; the rerun
            // must finish the transition rather than fail it.
            UnitStatus::Occupied => warn!(
                "unit {} already occupied, finishing activation of occupation {}",
                unit.account_number, occupation.number
            ),
        }

        let mut activated = occupation.clone();
        activated.status = OccupationStatus::Current;
        let activated = self.occupations.save(activated).await?;

        if let Err(err) = self.enqueue_notification(&activated).await {
            warn!(
                "occupation {} activated but notification was not enqueued: {err}",
                activated.number
            );
        }
        Ok(activated)
    }

    async fn enqueue_notification(&self, occupation: &Occupation) -> Result<()> {
        let tenant = self
            .tenants
            .find_by_id(occupation.tenant_id)
            .await?
            .ok_or_else(|| Error::not_found("tenant", occupation.tenant_id))?;
        let message = format!(
            "Dear {}, your tenancy for account {} is now active as of {}.",
            tenant.first_name, occupation.number, occupation.start_date
        );
        self.notifications
            .save(Notification::pending(
                NotificationChannel::Email,
                tenant.email,
                Some("Welcome to your new home".to_string()),
                message,
            ))
            .await?;
        Ok(())
    }
}
