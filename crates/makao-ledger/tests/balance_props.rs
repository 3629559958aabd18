//! Property-based checks for the carried-forward balance.
//!
//! For any sequence of debits and credits against one occupation, the most
//! recent entry's carried-forward amount must equal the sum of all debit
//! amounts minus the sum of all credit amounts, in posting order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use proptest::collection::vec;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use makao_core::models::{Currency, EntryType, Invoice, InvoiceType, Payment, PaymentStatus};
use makao_core::storage::LedgerEntryStore;
use makao_ledger::LedgerService;
use makao_store::InMemoryLedgerEntryStore;

#[derive(Debug, Clone, Copy)]
enum Event {
    Invoice(i64),
    Payment(i64),
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0i64..200_000).prop_map(Event::Invoice),
        (1i64..200_000).prop_map(Event::Payment),
    ]
}

fn rent_invoice(occupation_id: Uuid, amount: i64) -> Invoice {
    Invoice {
        id: Uuid::new_v4(),
        number: "INV100000OAB12C".to_string(),
        invoice_type: InvoiceType::Rent,
        occupation_id,
        currency: Currency::Kes,
        start_date: NaiveDate::from_ymd_opt(2026, 8, 1),
        end_date: NaiveDate::from_ymd_opt(2026, 8, 31),
        rent_amount: Decimal::from(amount),
        security_amount: Decimal::ZERO,
        garbage_amount: Decimal::ZERO,
        other_amounts: HashMap::new(),
        created_on: Utc::now(),
    }
}

fn received_payment(amount: i64) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        status: PaymentStatus::Unclaimed,
        occupation_number: "OAB12C".to_string(),
        reference_number: "REF001".to_string(),
        currency: Currency::Kes,
        amount: Decimal::from(amount),
        created_on: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn carried_forward_equals_debits_minus_credits(events in vec(event(), 1..40)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let entries: Arc<dyn LedgerEntryStore> =
                Arc::new(InMemoryLedgerEntryStore::default());
            let ledger = LedgerService::new(Arc::clone(&entries));
            let occupation_id = Uuid::new_v4();

            let mut expected = Decimal::ZERO;
            for event in &events {
                match event {
                    Event::Invoice(amount) => {
                        ledger
                            .post_debit(&rent_invoice(occupation_id, *amount))
                            .await
                            .unwrap();
                        expected += Decimal::from(*amount);
                    }
                    Event::Payment(amount) => {
                        ledger
                            .post_credit(occupation_id, Uuid::new_v4(), &received_payment(*amount))
                            .await
                            .unwrap();
                        expected -= Decimal::from(*amount);
                    }
                }
            }

            prop_assert_eq!(ledger.current_balance(occupation_id).await.unwrap(), expected);

            // The full trail replays to the same balance entry by entry.
            let trail = entries.find_by_occupation(occupation_id).await.unwrap();
            prop_assert_eq!(trail.len(), events.len());
            let mut running = Decimal::ZERO;
            for entry in &trail {
                match entry.entry_type {
                    EntryType::Debit => running += entry.total_amount_owed,
                    EntryType::Credit => {
                        running -= entry.total_amount_paid.unwrap_or(Decimal::ZERO);
                    }
                }
                prop_assert_eq!(entry.total_amount_carried_forward, running);
            }
            Ok(())
        })?;
    }
}
