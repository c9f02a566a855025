mod common;

use anyhow::Result;
use common::{empty_service, seeded_service};
use fiscus::application::{ServiceConfig, WalletService};
use fiscus::domain::{Cents, ErrorKind, TransactionStatus, TransactionType, parse_cents};
use fiscus::io::SeedData;

#[tokio::test]
async fn test_refund_scenario_links_records() -> Result<()> {
    let service = seeded_service()?;
    let before = service.list_transactions(None).await.len();

    let result = service
        .refund_transaction(101, 8950, "customer request")
        .await?;

    assert_eq!(result.refund.amount, -8950);
    assert_eq!(result.refund.original_transaction_id, Some(101));
    assert_eq!(result.refund.transaction_type, TransactionType::BusinessRefund);
    assert_eq!(result.refund.customer, "Maria Lopez");
    assert!(!result.refund.refundable);

    assert!(!result.original.refundable);
    assert!(result.original.refunded);

    let original = service.get_transaction(101).await?;
    assert!(!original.refundable);
    assert!(original.refunded);

    let transactions = service.list_transactions(None).await;
    assert_eq!(transactions.len(), before + 1);
    assert_eq!(transactions[0].id, result.refund.id);

    Ok(())
}

#[tokio::test]
async fn test_double_refund_adds_exactly_one_record() -> Result<()> {
    let service = seeded_service()?;
    let before = service.list_transactions(None).await.len();

    service.refund_transaction(98, 4275, "first").await?;
    let err = service
        .refund_transaction(98, 4275, "second")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::NotRefundable));
    assert_eq!(service.list_transactions(None).await.len(), before + 1);
    assert_eq!(service.refunds_for(98).await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_seeded_refunded_payment_is_not_refundable() -> Result<()> {
    let service = seeded_service()?;

    let err = service
        .refund_transaction(100, 1000, "again")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotRefundable));

    let err = service
        .refund_transaction(404, 1000, "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));

    Ok(())
}

#[tokio::test]
async fn test_refund_ids_follow_the_maximum() -> Result<()> {
    let service = seeded_service()?;
    let result = service.refund_transaction(101, 1000, "partial").await?;
    assert_eq!(result.refund.id, 104);
    Ok(())
}

#[tokio::test]
async fn test_list_limit() -> Result<()> {
    let service = seeded_service()?;

    let recent = service.list_transactions(Some(2)).await;
    let ids: Vec<i64> = recent.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![102, 101]);

    assert!(service.list_transactions(Some(0)).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_payment_then_refund_updates_metrics() -> Result<()> {
    let service = empty_service();

    let paid = service
        .record_payment("Lena Fischer", "card", 10000, TransactionStatus::Completed)
        .await?;
    service
        .record_payment("Omar Haddad", "wallet", 5000, TransactionStatus::Completed)
        .await?;
    service
        .record_payment("Ivy Chen", "card", 2000, TransactionStatus::Pending)
        .await?;
    service.refund_transaction(paid.id, 2500, "damaged item").await?;

    let metrics = service.business_metrics().await;
    assert_eq!(metrics.total_revenue, 15000);
    assert_eq!(metrics.total_refunds, 2500);
    assert_eq!(metrics.net_revenue, 12500);
    assert_eq!(metrics.payment_count, 2);
    assert_eq!(metrics.refund_count, 1);
    assert_eq!(metrics.pending_count, 1);
    assert_eq!(metrics.pending_amount, 2000);
    assert_eq!(metrics.average_payment, 7500);
    assert!((metrics.refund_rate - 16.666).abs() < 0.01);
    assert_eq!(metrics.by_payment_method.len(), 2);
    assert_eq!(metrics.by_payment_method[0].payment_method, "card");

    Ok(())
}

#[tokio::test]
async fn test_payment_requires_customer() -> Result<()> {
    let service = empty_service();
    let err = service
        .record_payment("  ", "card", 100, TransactionStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
    Ok(())
}

#[tokio::test]
async fn test_dashboard_combines_both_ledgers() -> Result<()> {
    let service = seeded_service()?;
    let report = service.dashboard(3).await;

    assert_eq!(report.portfolio.card_count, 3);
    assert_eq!(report.metrics.total_revenue, 28225);
    assert_eq!(report.metrics.total_refunds, 15000);
    assert_eq!(report.recent_transactions.len(), 3);
    assert_eq!(report.recent_transactions[0].id, 102);

    Ok(())
}

#[tokio::test]
async fn test_from_seed_builds_the_demo_session() -> Result<()> {
    let service = WalletService::from_seed(SeedData::builtin()?, ServiceConfig::default())?;
    assert_eq!(service.list_transactions(None).await.len(), 5);
    assert_eq!(service.list_cards().await.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_from_seed_rejects_refund_of_refundable_payment() -> Result<()> {
    let seed = SeedData::from_json(
        r#"{
            "business_transactions": [
                {
                    "id": 1, "type": "business_payment", "amount": 5000,
                    "customer": "Nora Vance", "payment_method": "card",
                    "timestamp": "2024-09-01T10:00:00Z", "status": "completed",
                    "refundable": true
                },
                {
                    "id": 2, "type": "business_refund", "amount": -1000,
                    "customer": "Nora Vance", "payment_method": "card",
                    "timestamp": "2024-09-01T11:00:00Z", "status": "completed",
                    "refundable": false, "original_transaction_id": 1
                }
            ]
        }"#,
    )?;

    assert!(WalletService::from_seed(seed, ServiceConfig::default()).is_err());
    Ok(())
}

#[tokio::test]
async fn test_metrics_saturate_instead_of_overflowing() -> Result<()> {
    let service = empty_service();
    let huge = parse_cents("92233720368547758.07")?;

    service
        .record_payment("Big Spender", "card", huge, TransactionStatus::Completed)
        .await?;
    service
        .record_payment("Big Spender", "card", huge, TransactionStatus::Completed)
        .await?;

    let metrics = service.business_metrics().await;
    assert_eq!(metrics.total_revenue, Cents::MAX);
    assert_eq!(metrics.payment_count, 2);
    Ok(())
}
