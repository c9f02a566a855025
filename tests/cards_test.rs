mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{empty_service, seeded_service, slow_service};
use fiscus::domain::{
    CardPurpose, Cents, ErrorKind, parse_cents, remaining_balance, spending_progress,
};

#[tokio::test]
async fn test_issue_then_get_returns_fresh_card() -> Result<()> {
    let service = empty_service();

    let card = service.issue_card("online-shopping", 10000, 7).await?;
    let fetched = service.get_card(card.id).await?;

    assert_eq!(fetched.current_spending, 0);
    assert!(fetched.is_active);
    assert!(!fetched.is_frozen);
    assert_eq!(fetched.wallet_id, 7);
    assert_eq!(fetched.purpose, CardPurpose::OnlineShopping);

    Ok(())
}

#[tokio::test]
async fn test_issue_rejects_unknown_purpose_and_bad_limit() -> Result<()> {
    let service = empty_service();

    let err = service.issue_card("groceries", 10000, 1).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

    let err = service.issue_card("one-time", -5, 1).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));

    assert!(service.list_cards().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_spend_scenario_limit_exceeded() -> Result<()> {
    let service = empty_service();
    let card = service.issue_card("one-time", 10000, 1).await?;

    let card = service.record_spend(card.id, 4000).await?;
    assert_eq!(card.current_spending, 4000);

    let err = service.record_spend(card.id, 7000).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::LimitExceeded));

    let card = service.get_card(card.id).await?;
    assert_eq!(card.current_spending, 4000);
    assert_eq!(remaining_balance(&card), 6000);
    assert_eq!(spending_progress(&card), 40.0);

    Ok(())
}

#[tokio::test]
async fn test_limit_update_below_spend_is_rejected() -> Result<()> {
    let service = empty_service();
    let card = service.issue_card("subscription", 10000, 1).await?;
    service.record_spend(card.id, 4000).await?;

    let err = service.update_limit(card.id, 1000).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::LimitBelowSpend));
    assert_eq!(service.get_card(card.id).await?.spending_limit, 10000);

    let updated = service.update_limit(card.id, 20000).await?;
    assert_eq!(updated.spending_limit, 20000);

    Ok(())
}

#[tokio::test]
async fn test_frozen_card_rejects_spend() -> Result<()> {
    let service = empty_service();
    let card = service.issue_card("online-shopping", 5000, 1).await?;

    let frozen = service.toggle_freeze(card.id).await?;
    assert!(frozen.is_frozen);

    let err = service.record_spend(card.id, 100).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Frozen));

    let thawed = service.toggle_freeze(card.id).await?;
    assert!(!thawed.is_frozen);
    service.record_spend(card.id, 100).await?;

    Ok(())
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() -> Result<()> {
    let service = empty_service();
    let card = service.issue_card("one-time", 5000, 1).await?;

    let deleted = service.delete_card(card.id).await?;
    assert_eq!(deleted.id, card.id);

    let err = service.get_card(card.id).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    let err = service.toggle_freeze(card.id).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));

    Ok(())
}

#[tokio::test]
async fn test_seeded_cards_and_wallet_filter() -> Result<()> {
    let service = seeded_service()?;

    let cards = service.list_cards().await;
    let ids: Vec<u64> = cards.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);

    let wallet_cards = service.list_cards_for_wallet(1).await;
    assert_eq!(wallet_cards.len(), 2);

    // Card 1 is frozen in the seed data
    let err = service.record_spend(1, 100).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Frozen));

    let card = service.issue_card("one-time", 2500, 2).await?;
    assert_eq!(card.id, 4);
    assert_eq!(service.list_cards().await[0].id, 4);

    Ok(())
}

#[tokio::test]
async fn test_remaining_plus_spent_equals_limit_for_every_card() -> Result<()> {
    let service = seeded_service()?;
    service.record_spend(2, 1000).await?;
    let err = service.record_spend(3, 99999).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::LimitExceeded));
    assert_eq!(service.get_card(3).await?.current_spending, 0);
    service.update_limit(3, 8000).await?;

    for card in service.list_cards().await {
        assert_eq!(
            remaining_balance(&card) + card.current_spending,
            card.spending_limit
        );
    }

    let details = service.card_details(2).await?;
    assert_eq!(details.remaining, 3000 - 2599);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_spends_never_exceed_limit() -> Result<()> {
    let service = Arc::new(slow_service(2));
    let card = service.issue_card("online-shopping", 10000, 1).await?;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.record_spend(card.id, 700).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            accepted += 1;
        }
    }

    let card = service.get_card(card.id).await?;
    assert_eq!(accepted, 14);
    assert_eq!(card.current_spending, 14 * 700);
    assert!(card.current_spending <= card.spending_limit);

    Ok(())
}

#[tokio::test]
async fn test_portfolio_summary() -> Result<()> {
    let service = seeded_service()?;
    let portfolio = service.card_portfolio().await;

    assert_eq!(portfolio.card_count, 3);
    assert_eq!(portfolio.frozen_count, 1);
    assert_eq!(portfolio.total_limit, 58000);
    assert_eq!(portfolio.total_spent, 14049);
    assert_eq!(portfolio.total_remaining, 58000 - 14049);

    Ok(())
}

#[tokio::test]
async fn test_portfolio_saturates_on_huge_limits() -> Result<()> {
    let service = empty_service();
    let huge = parse_cents("92233720368547758.07")?;

    service.issue_card("online-shopping", huge, 1).await?;
    service.issue_card("subscription", huge, 1).await?;

    let portfolio = service.card_portfolio().await;
    assert_eq!(portfolio.card_count, 2);
    assert_eq!(portfolio.total_limit, Cents::MAX);
    assert_eq!(portfolio.total_remaining, Cents::MAX);
    assert_eq!(portfolio.total_spent, 0);

    Ok(())
}
