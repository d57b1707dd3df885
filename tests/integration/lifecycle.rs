//! Listing creation, cancellation, and query integration tests.

use bazaar::{AuctionFilter, AuctionState, ItemCustody, MarketError, MarketEvent};

use crate::common::MarketHarness;

#[tokio::test]
async fn test_create_applies_default_duration() {
    let harness = MarketHarness::new().await;
    let auction = harness.listing(1, "Sword", 100, None, None).await;

    let config = harness.engine.config();
    assert_eq!(
        auction.expires_at,
        auction.created_at + config.default_duration_secs
    );
}

#[tokio::test]
async fn test_create_rejects_duplicate_names_case_insensitive() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;

    let other = harness.player(2);
    let item = harness.custody.hold(&other).await.unwrap();
    let result = harness
        .engine
        .set_auction(&other, "SWORD", item, 100, None, Some(1))
        .await;
    assert!(matches!(result, Err(MarketError::DuplicateName(_))));
}

#[tokio::test]
async fn test_create_validates_prices_and_duration() {
    let harness = MarketHarness::new().await;
    let seller = harness.player(1);

    let item = harness.custody.hold(&seller).await.unwrap();
    let zero_start = harness
        .engine
        .set_auction(&seller, "Sword", item, 0, None, Some(1))
        .await;
    assert!(matches!(zero_start, Err(MarketError::Validation(_))));

    let item = harness.custody.hold(&seller).await.unwrap();
    let buyout_below_start = harness
        .engine
        .set_auction(&seller, "Sword", item, 100, Some(100), Some(1))
        .await;
    assert!(matches!(buyout_below_start, Err(MarketError::Validation(_))));

    let item = harness.custody.hold(&seller).await.unwrap();
    let zero_hours = harness
        .engine
        .set_auction(&seller, "Sword", item, 100, None, Some(0))
        .await;
    assert!(matches!(zero_hours, Err(MarketError::Validation(_))));

    let item = harness.custody.hold(&seller).await.unwrap();
    let oversized = harness
        .engine
        .set_auction(&seller, "Sword", item, 100, None, Some(10_000))
        .await;
    assert!(matches!(oversized, Err(MarketError::Validation(_))));
}

#[tokio::test]
async fn test_seller_replaces_own_bidless_listing() {
    let harness = MarketHarness::new().await;
    let first = harness.listing(1, "Sword", 100, None, Some(1)).await;
    let seller = harness.player(1);

    let replacement = harness.listing(1, "Sword", 200, Some(400), Some(2)).await;
    assert_eq!(replacement.start_price, 200);
    assert!(replacement.version > first.version);

    // The first item went back to the seller.
    assert_eq!(harness.custody.released_to(&seller).await.len(), 1);

    let active = harness.engine.get_auction("Sword").await.unwrap();
    assert_eq!(active.start_price, 200);
}

#[tokio::test]
async fn test_replace_refused_once_a_bid_exists() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let seller = harness.player(1);
    let bidder = harness.fund(2, 1_000).await;

    harness.engine.bid(&bidder, "Sword", 150).await.unwrap();

    let item = harness.custody.hold(&seller).await.unwrap();
    let result = harness
        .engine
        .set_auction(&seller, "Sword", item, 200, None, Some(1))
        .await;
    assert!(matches!(result, Err(MarketError::DuplicateName(_))));
}

#[tokio::test]
async fn test_name_is_reusable_after_settlement() {
    let harness = MarketHarness::new().await;
    let auction = harness.listing(1, "Sword", 100, None, Some(1)).await;

    harness.advance_past_deadline(&auction);
    harness.settle().await;
    assert!(harness.engine.get_auction("Sword").await.is_none());

    let again = harness.listing(2, "Sword", 50, None, Some(1)).await;
    assert_eq!(again.state, AuctionState::Open);
    assert_eq!(again.start_price, 50);
}

#[tokio::test]
async fn test_cancel_by_seller_returns_item() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let seller = harness.player(1);

    let cancelled = harness.engine.cancel(&seller, "Sword", false).await.unwrap();
    assert_eq!(cancelled.state, AuctionState::Cancelled);
    assert!(harness.engine.get_auction("Sword").await.is_none());
    assert_eq!(harness.custody.released_to(&seller).await.len(), 1);

    let events = harness.notifier.events_for(&seller).await;
    assert!(events
        .iter()
        .any(|e| matches!(e, MarketEvent::AuctionCancelled { .. })));
}

#[tokio::test]
async fn test_cancel_by_stranger_denied_but_override_allowed() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let stranger = harness.player(2);

    let denied = harness.engine.cancel(&stranger, "Sword", false).await;
    assert!(matches!(denied, Err(MarketError::PermissionDenied(_))));

    // The command layer grants the override to moderators.
    harness
        .engine
        .cancel(&stranger, "Sword", true)
        .await
        .unwrap();
    assert!(harness.engine.get_auction("Sword").await.is_none());
}

#[tokio::test]
async fn test_cancel_refused_once_a_bid_exists() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let seller = harness.player(1);
    let bidder = harness.fund(2, 1_000).await;

    harness.engine.bid(&bidder, "Sword", 150).await.unwrap();

    let result = harness.engine.cancel(&seller, "Sword", false).await;
    assert!(matches!(result, Err(MarketError::AuctionHasBids(_))));

    // The bidder's escrow is untouched.
    assert_eq!(harness.economy.reserved_for(&bidder).await, 150);
}

#[tokio::test]
async fn test_cancel_unknown_auction() {
    let harness = MarketHarness::new().await;
    let seller = harness.player(1);
    let result = harness.engine.cancel(&seller, "Ghost", false).await;
    assert!(matches!(result, Err(MarketError::NotFound(_))));
}

#[tokio::test]
async fn test_cancel_works_while_gate_is_closed() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let seller = harness.player(1);

    harness.engine.set_open(false).await.unwrap();
    harness.engine.cancel(&seller, "Sword", false).await.unwrap();
}

#[tokio::test]
async fn test_gate_closed_blocks_creation_but_not_listing() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;

    harness.engine.set_open(false).await.unwrap();

    let seller = harness.player(2);
    let item = harness.custody.hold(&seller).await.unwrap();
    let blocked = harness
        .engine
        .set_auction(&seller, "Axe", item, 100, None, Some(1))
        .await;
    assert!(matches!(blocked, Err(MarketError::GateClosed)));

    let listed = harness.engine.list_auctions(&AuctionFilter::All).await;
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_listing_is_ordered_by_deadline() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Slow", 100, None, Some(3)).await;
    harness.listing(1, "Fast", 100, None, Some(1)).await;
    harness.listing(2, "Medium", 100, Some(300), Some(2)).await;

    let listed = harness.engine.list_auctions(&AuctionFilter::All).await;
    let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Fast", "Medium", "Slow"]);
}

#[tokio::test]
async fn test_listing_filters() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    harness.listing(1, "Axe", 100, Some(300), Some(1)).await;
    harness.listing(2, "Bow", 100, Some(200), Some(1)).await;

    let with_buyout = harness
        .engine
        .list_auctions(&AuctionFilter::WithBuyout)
        .await;
    let names: Vec<&str> = with_buyout.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Axe", "Bow"]);

    let owned = harness
        .engine
        .list_auctions(&AuctionFilter::OwnedBy(harness.player(1)))
        .await;
    let names: Vec<&str> = owned.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Axe", "Sword"]);
}

#[tokio::test]
async fn test_name_queries_for_completion() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    harness.listing(1, "Axe", 100, Some(300), Some(1)).await;
    harness.listing(2, "Bow", 100, Some(200), Some(1)).await;

    assert_eq!(
        harness.engine.auction_names().await,
        vec!["Axe", "Bow", "Sword"]
    );
    assert_eq!(
        harness.engine.auction_names_with_buyout().await,
        vec!["Axe", "Bow"]
    );
    assert_eq!(
        harness
            .engine
            .auction_names_owned_by(&harness.player(2))
            .await,
        vec!["Bow"]
    );
}

#[tokio::test]
async fn test_teleport_requires_an_anchor() {
    let harness = MarketHarness::new().await;
    let player = harness.player(1);

    let missing = harness.engine.teleport(&player);
    assert!(matches!(missing, Err(MarketError::NotFound(_))));

    let location = bazaar::Location {
        world: "market".into(),
        x: 10.0,
        y: 64.0,
        z: -20.0,
    };
    harness
        .engine
        .spawn_anchor(location.clone(), &player)
        .await
        .unwrap();
    assert_eq!(harness.engine.teleport(&player).unwrap(), location);

    harness.engine.remove_spawn_anchor().await.unwrap();
    assert!(harness.engine.teleport(&player).is_err());
}
