use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

/// Portion of the rent-advance invoice refunded when a notice runs out,
/// keyed to how much warning the tenant gave. Longer notice, larger refund.
#[derive(Clone, Debug)]
pub struct RefundTiers {
    pub four_weeks: Decimal,
    pub three_weeks: Decimal,
    pub two_weeks: Decimal,
    pub one_week: Decimal,
    pub short_notice: Decimal,
}

impl RefundTiers {
    pub fn portion(&self, notice_days: i64) -> Decimal {
        if notice_days >= 28 {
            self.four_weeks
        } else if notice_days >= 21 {
            self.three_weeks
        } else if notice_days >= 14 {
            self.two_weeks
        } else if notice_days >= 7 {
            self.one_week
        } else {
            self.short_notice
        }
    }
}

impl Default for RefundTiers {
    fn default() -> Self {
        Self {
            four_weeks: Decimal::new(90, 2),
            three_weeks: Decimal::new(75, 2),
            two_weeks: Decimal::new(50, 2),
            one_week: Decimal::new(25, 2),
            short_notice: Decimal::new(10, 2),
        }
    }
}

#[derive(Clone, Debug)]
pub struct JobsConfig {
    pub invoice_cadence: Duration,
    pub payment_cadence: Duration,
    pub occupation_cadence: Duration,
    pub notice_cadence: Duration,
    pub notification_cadence: Duration,
    pub send_notifications: bool,
    pub refund_tiers: RefundTiers,
}

impl JobsConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            invoice_cadence: duration_var("INVOICE_CADENCE_SECS", 86_400)?,
            payment_cadence: duration_var("PAYMENT_CADENCE_SECS", 600)?,
            occupation_cadence: duration_var("OCCUPATION_CADENCE_SECS", 86_400)?,
            notice_cadence: duration_var("NOTICE_CADENCE_SECS", 86_400)?,
            notification_cadence: duration_var("NOTIFICATION_CADENCE_SECS", 300)?,
            send_notifications: bool_var("SEND_NOTIFICATIONS", true)?,
            refund_tiers: RefundTiers {
                four_weeks: decimal_var("REFUND_FOUR_WEEKS", "0.90")?,
                three_weeks: decimal_var("REFUND_THREE_WEEKS", "0.75")?,
                two_weeks: decimal_var("REFUND_TWO_WEEKS", "0.50")?,
                one_week: decimal_var("REFUND_ONE_WEEK", "0.25")?,
                short_notice: decimal_var("REFUND_SHORT_NOTICE", "0.10")?,
            },
        })
    }
}

fn duration_var(name: &str, default_secs: u64) -> Result<Duration> {
    match std::env::var(name) {
        Ok(value) => {
            let secs: u64 = value
                .parse()
                .with_context(|| format!("{name} must be a whole number of seconds"))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

fn bool_var(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{name} must be true or false")),
        Err(_) => Ok(default),
    }
}

fn decimal_var(name: &str, default: &str) -> Result<Decimal> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{name} must be a decimal fraction"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_portion_tiers_by_notice_length() {
        let tiers = RefundTiers::default();
        assert_eq!(tiers.portion(30), Decimal::new(90, 2));
        assert_eq!(tiers.portion(28), Decimal::new(90, 2));
        assert_eq!(tiers.portion(21), Decimal::new(75, 2));
        assert_eq!(tiers.portion(14), Decimal::new(50, 2));
        assert_eq!(tiers.portion(7), Decimal::new(25, 2));
        assert_eq!(tiers.portion(3), Decimal::new(10, 2));
    }
}
