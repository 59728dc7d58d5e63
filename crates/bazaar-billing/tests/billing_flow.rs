//! End-to-end billing flows against an in-memory SQLite database:
//! bill building, stock reservation, payment settlement and the
//! consistency invariants that must hold after every operation.

use bazaar_billing::{Billing, BillingError, Tender};
use bazaar_core::PaymentMethod;
use bazaar_db::{Database, DbConfig};

async fn setup() -> Billing {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .try_init()
        .ok();

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Billing::new(db)
}

async fn register_customer(billing: &Billing) -> String {
    billing
        .customers()
        .register("Priya", "priya@example.com", "9876543210", "12 Bazaar St")
        .await
        .unwrap()
        .id
}

/// Asserts the totals invariant: the bill's running totals equal the sums
/// recomputed over its current lines, no line is non-positive, and no two
/// lines share a product.
async fn assert_totals_consistent(billing: &Billing, bill_id: &str, customer_id: &str) {
    let view = billing
        .ledger()
        .get_bill_view(bill_id, customer_id)
        .await
        .unwrap();

    let quantity_sum: i64 = view.lines.iter().map(|l| l.quantity).sum();
    let amount_sum: i64 = view
        .lines
        .iter()
        .map(|l| l.quantity * l.unit_rate_cents)
        .sum();

    assert_eq!(view.total_quantity, quantity_sum);
    assert_eq!(view.total_amount_cents, amount_sum);
    assert!(view.lines.iter().all(|l| l.quantity > 0));

    let mut product_ids: Vec<&str> = view.lines.iter().map(|l| l.product_id.as_str()).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    assert_eq!(product_ids.len(), view.lines.len());
}

// =============================================================================
// Bill building
// =============================================================================

#[tokio::test]
async fn rice_add_update_delete_walks_the_totals() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 60, 50, 100).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    assert_eq!(bill.total_quantity, 0);
    assert_eq!(bill.total_amount_cents, 0);

    // rate 50 × qty 2
    let bill = billing.ledger().add_item(&bill.id, &rice.id, 2).await.unwrap();
    assert_eq!(bill.total_amount_cents, 100);
    assert_eq!(bill.total_quantity, 2);
    assert_totals_consistent(&billing, &bill.id, &customer_id).await;

    // update qty to 5
    let bill = billing
        .ledger()
        .update_item(&bill.id, &rice.id, 5)
        .await
        .unwrap();
    assert_eq!(bill.total_amount_cents, 250);
    assert_eq!(bill.total_quantity, 5);
    assert_totals_consistent(&billing, &bill.id, &customer_id).await;

    // delete the line
    let bill = billing
        .ledger()
        .delete_item(&bill.id, &rice.id)
        .await
        .unwrap();
    assert_eq!(bill.total_amount_cents, 0);
    assert_eq!(bill.total_quantity, 0);
    assert_totals_consistent(&billing, &bill.id, &customer_id).await;
}

#[tokio::test]
async fn add_then_delete_restores_prior_totals_exactly() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let tea = billing.catalog().add_product("Tea", 25000, 24000, 50).await.unwrap();
    let sugar = billing.catalog().add_product("Sugar", 4500, 4200, 50).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    let bill = billing.ledger().add_item(&bill.id, &tea.id, 2).await.unwrap();

    let before_quantity = bill.total_quantity;
    let before_amount = bill.total_amount_cents;

    billing.ledger().add_item(&bill.id, &sugar.id, 3).await.unwrap();
    let bill = billing
        .ledger()
        .delete_item(&bill.id, &sugar.id)
        .await
        .unwrap();

    assert_eq!(bill.total_quantity, before_quantity);
    assert_eq!(bill.total_amount_cents, before_amount);
    assert_totals_consistent(&billing, &bill.id, &customer_id).await;
}

#[tokio::test]
async fn adding_same_product_replaces_the_line() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 60, 50, 100).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 2).await.unwrap();

    // Re-adding replaces quantity (3), it does not sum to 5
    let bill = billing.ledger().add_item(&bill.id, &rice.id, 3).await.unwrap();
    assert_eq!(bill.total_quantity, 3);
    assert_eq!(bill.total_amount_cents, 150);

    let view = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, 3);
}

#[tokio::test]
async fn line_rate_is_frozen_against_catalog_changes() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let oil = billing
        .catalog()
        .add_product("Sunflower Oil", 12000, 11000, 20)
        .await
        .unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    let bill = billing.ledger().add_item(&bill.id, &oil.id, 2).await.unwrap();
    assert_eq!(bill.total_amount_cents, 22000);

    // A restock later must not touch the captured rate or the totals
    billing.catalog().restock(&oil.id, 30).await.unwrap();

    let view = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();
    assert_eq!(view.lines[0].unit_rate_cents, 11000);
    assert_eq!(view.total_amount_cents, 22000);
}

#[tokio::test]
async fn missing_entities_are_reported_as_not_found() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 60, 50, 100).await.unwrap();
    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();

    let err = billing
        .ledger()
        .add_item("no-such-bill", &rice.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::NotFound { .. }));

    let err = billing
        .ledger()
        .add_item(&bill.id, "no-such-product", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::NotFound { .. }));

    // Updating or deleting a line that was never added
    let err = billing
        .ledger()
        .update_item(&bill.id, &rice.id, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::NotFound { .. }));

    let err = billing
        .ledger()
        .delete_item(&bill.id, &rice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::NotFound { .. }));
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 60, 50, 100).await.unwrap();
    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();

    for qty in [0, -1, 1000] {
        let err = billing
            .ledger()
            .add_item(&bill.id, &rice.id, qty)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }
}

// =============================================================================
// Stock reservation
// =============================================================================

#[tokio::test]
async fn open_bills_cannot_claim_more_than_physical_stock() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let oil = billing
        .catalog()
        .add_product("Sunflower Oil", 12000, 11000, 10)
        .await
        .unwrap();

    // Bill A holds 7 of the 10 in stock
    let bill_a = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill_a.id, &oil.id, 7).await.unwrap();

    // Bill B asking for 5 would over-claim: 7 + 5 > 10
    let bill_b = billing.ledger().open_bill(&customer_id).await.unwrap();
    let err = billing
        .ledger()
        .add_item(&bill_b.id, &oil.id, 5)
        .await
        .unwrap_err();
    match err {
        BillingError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 3);
            assert_eq!(requested, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // The remaining 3 are still claimable
    billing.ledger().add_item(&bill_b.id, &oil.id, 3).await.unwrap();

    // And reservation checks never touched physical stock
    let product = billing.catalog().find_by_id(&oil.id).await.unwrap();
    assert_eq!(product.stock, 10);
}

#[tokio::test]
async fn reserve_nets_against_open_bills() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let oil = billing
        .catalog()
        .add_product("Sunflower Oil", 12000, 11000, 10)
        .await
        .unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &oil.id, 7).await.unwrap();

    assert!(matches!(
        billing.catalog().reserve(&oil.id, 5).await.unwrap_err(),
        BillingError::InsufficientStock { .. }
    ));
    billing.catalog().reserve(&oil.id, 3).await.unwrap();
}

#[tokio::test]
async fn replacing_own_line_does_not_count_against_itself() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let oil = billing
        .catalog()
        .add_product("Sunflower Oil", 12000, 11000, 10)
        .await
        .unwrap();

    let bill_a = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill_a.id, &oil.id, 7).await.unwrap();

    // Growing 7 → 10 is fine: the old 7 is superseded, not stacked
    let bill_a = billing
        .ledger()
        .update_item(&bill_a.id, &oil.id, 10)
        .await
        .unwrap();
    assert_eq!(bill_a.total_quantity, 10);

    // But another open bill's claim still counts
    let bill_a = billing
        .ledger()
        .update_item(&bill_a.id, &oil.id, 6)
        .await
        .unwrap();
    let bill_b = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill_b.id, &oil.id, 3).await.unwrap();

    let err = billing
        .ledger()
        .update_item(&bill_a.id, &oil.id, 8)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InsufficientStock { .. }));

    billing.ledger().update_item(&bill_a.id, &oil.id, 7).await.unwrap();
}

// =============================================================================
// Payment
// =============================================================================

#[tokio::test]
async fn cash_payment_settles_and_commits_stock() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 2).await.unwrap();

    // total 8000, tendered 10000 → change 2000
    let receipt = billing
        .payments()
        .pay(&bill.id, &customer_id, Tender::Cash { tendered_cents: 10000 })
        .await
        .unwrap();

    assert_eq!(receipt.method, PaymentMethod::Cash);
    assert_eq!(receipt.total_amount_cents, 8000);
    assert_eq!(receipt.tendered_cents, Some(10000));
    assert_eq!(receipt.change_cents, Some(2000));

    // Stock decremented by the line quantity, exactly once
    let product = billing.catalog().find_by_id(&rice.id).await.unwrap();
    assert_eq!(product.stock, 8);

    // The bill is terminal: method recorded, further mutation refused
    let view = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();
    assert_eq!(view.payment_method, Some(PaymentMethod::Cash));

    let err = billing
        .ledger()
        .add_item(&bill.id, &rice.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvalidState(_)));

    // And cannot be paid twice
    let err = billing
        .payments()
        .pay(&bill.id, &customer_id, Tender::Cash { tendered_cents: 10000 })
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvalidState(_)));
}

#[tokio::test]
async fn short_cash_tender_is_declined_without_effect() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 2).await.unwrap();

    let err = billing
        .payments()
        .pay(&bill.id, &customer_id, Tender::Cash { tendered_cents: 7999 })
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::AuthorizationDeclined(_)));

    let view = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();
    assert_eq!(view.payment_method, None);
    assert_eq!(
        billing.catalog().find_by_id(&rice.id).await.unwrap().stock,
        10
    );
}

#[tokio::test]
async fn malformed_card_is_declined_without_effect() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 2).await.unwrap();

    let err = billing
        .payments()
        .pay(
            &bill.id,
            &customer_id,
            Tender::Card {
                number: "12345678".to_string(), // not 16 digits
                expiry: "12/27".to_string(),
                cvv: "123".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::AuthorizationDeclined(_)));

    // Bill remains open, stock untouched
    let view = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();
    assert_eq!(view.payment_method, None);
    assert_eq!(
        billing.catalog().find_by_id(&rice.id).await.unwrap().stock,
        10
    );

    // A well-formed card settles the same bill
    let receipt = billing
        .payments()
        .pay(
            &bill.id,
            &customer_id,
            Tender::Card {
                number: "1234567812345678".to_string(),
                expiry: "12/27".to_string(),
                cvv: "123".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.method, PaymentMethod::Card);
    assert_eq!(receipt.reference.as_deref(), Some("card ****5678"));
}

#[tokio::test]
async fn upi_payment_settles_with_reference() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 1).await.unwrap();

    let receipt = billing
        .payments()
        .pay(
            &bill.id,
            &customer_id,
            Tender::Upi {
                upi_id: "priya@okbank".to_string(),
                transaction_ref: "TXN1234567890".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.method, PaymentMethod::Upi);
    assert_eq!(receipt.reference.as_deref(), Some("TXN1234567890"));
}

#[tokio::test]
async fn payment_requires_the_matching_customer() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let other = billing
        .customers()
        .register("Arun", "arun@example.com", "9123456780", "34 Main Rd")
        .await
        .unwrap();

    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();
    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 1).await.unwrap();

    let err = billing
        .payments()
        .pay(&bill.id, &other.id, Tender::Cash { tendered_cents: 10000 })
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvalidState(_)));
}

#[tokio::test]
async fn decrement_failure_after_authorization_rolls_everything_back() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();
    let tea = billing.catalog().add_product("Tea", 25000, 24000, 10).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 2).await.unwrap();
    billing.ledger().add_item(&bill.id, &tea.id, 5).await.unwrap();

    // Stock of the SECOND line shrinks behind the bill's back
    billing.catalog().commit_decrement(&tea.id, 8).await.unwrap();
    assert_eq!(billing.catalog().find_by_id(&tea.id).await.unwrap().stock, 2);

    let err = billing
        .payments()
        .pay(&bill.id, &customer_id, Tender::Cash { tendered_cents: 500000 })
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InsufficientStock { .. }));

    // All-or-nothing: the first line's decrement was rolled back too,
    // and the bill is still open and queryable
    assert_eq!(
        billing.catalog().find_by_id(&rice.id).await.unwrap().stock,
        10
    );
    assert_eq!(billing.catalog().find_by_id(&tea.id).await.unwrap().stock, 2);

    let view = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();
    assert_eq!(view.payment_method, None);

    // A restock unblocks the same payment
    billing.catalog().restock(&tea.id, 5).await.unwrap();
    billing
        .payments()
        .pay(&bill.id, &customer_id, Tender::Cash { tendered_cents: 500000 })
        .await
        .unwrap();
    assert_eq!(billing.catalog().find_by_id(&tea.id).await.unwrap().stock, 2);
    assert_eq!(
        billing.catalog().find_by_id(&rice.id).await.unwrap().stock,
        8
    );
}

// =============================================================================
// Bill view
// =============================================================================

#[tokio::test]
async fn bill_view_is_idempotent_and_ownership_checked() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let other = billing
        .customers()
        .register("Arun", "arun@example.com", "9123456780", "34 Main Rd")
        .await
        .unwrap();

    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();
    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 2).await.unwrap();

    let first = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();
    let second = billing
        .ledger()
        .get_bill_view(&bill.id, &customer_id)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(first.lines[0].product_name, "Rice");
    assert_eq!(first.lines[0].price_cents, 6000);
    assert_eq!(first.lines[0].amount_cents, 8000);

    // The right bill id with the wrong customer is NotFound
    let err = billing
        .ledger()
        .get_bill_view(&bill.id, &other.id)
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::NotFound { .. }));
}

#[tokio::test]
async fn customers_can_resume_their_open_bills() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();

    let first = billing.ledger().open_bill(&customer_id).await.unwrap();
    let second = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&second.id, &rice.id, 1).await.unwrap();

    // Both open bills are listed; paying one removes it from the list
    let open = billing
        .ledger()
        .open_bills_for_customer(&customer_id)
        .await
        .unwrap();
    assert_eq!(open.len(), 2);

    billing
        .payments()
        .pay(&second.id, &customer_id, Tender::Cash { tendered_cents: 10000 })
        .await
        .unwrap();

    let open = billing
        .ledger()
        .open_bills_for_customer(&customer_id)
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, first.id);
}

// =============================================================================
// Feedback
// =============================================================================

#[tokio::test]
async fn feedback_after_settlement() {
    let billing = setup().await;
    let customer_id = register_customer(&billing).await;
    let rice = billing.catalog().add_product("Rice", 6000, 4000, 10).await.unwrap();

    let bill = billing.ledger().open_bill(&customer_id).await.unwrap();
    billing.ledger().add_item(&bill.id, &rice.id, 1).await.unwrap();
    billing
        .payments()
        .pay(&bill.id, &customer_id, Tender::Cash { tendered_cents: 10000 })
        .await
        .unwrap();

    let feedback = billing
        .payments()
        .record_feedback(&customer_id, 5, "Quick checkout")
        .await
        .unwrap();
    assert_eq!(feedback.rating, 5);

    for rating in [0, 6] {
        let err = billing
            .payments()
            .record_feedback(&customer_id, rating, "")
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    let err = billing
        .payments()
        .record_feedback("no-such-customer", 4, "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::NotFound { .. }));
}
