//! Persistence rollback and startup reload integration tests.

use bazaar::{AuctionState, EngineConfig, ItemCustody, Location, MarketError};

use crate::common::MarketHarness;

#[tokio::test]
async fn test_create_rolls_back_on_write_failure() {
    let harness = MarketHarness::new().await;
    let seller = harness.player(1);
    let item = harness.custody.hold(&seller).await.unwrap();

    harness.kv.set_fail_writes(true);
    let result = harness
        .engine
        .set_auction(&seller, "Sword", item, 100, None, Some(1))
        .await;
    assert!(matches!(result, Err(MarketError::Persistence(_))));
    assert!(harness.engine.get_auction("Sword").await.is_none());

    // The record stays consistent for a later retry.
    harness.kv.set_fail_writes(false);
    let item = harness.custody.hold(&seller).await.unwrap();
    harness
        .engine
        .set_auction(&seller, "Sword", item, 100, None, Some(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bid_rolls_back_on_write_failure() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let bidder = harness.fund(2, 1_000).await;

    let before = harness.engine.get_auction("Sword").await.unwrap();

    harness.kv.set_fail_writes(true);
    let result = harness.engine.bid(&bidder, "Sword", 150).await;
    assert!(matches!(result, Err(MarketError::Persistence(_))));

    // No in-memory mutation survived, and the escrow went home.
    let after = harness.engine.get_auction("Sword").await.unwrap();
    assert_eq!(after.version, before.version);
    assert!(after.highest_bid.is_none());
    assert_eq!(harness.economy.balance(&bidder).await, 1_000);
    assert_eq!(harness.economy.total_reserved().await, 0);
}

#[tokio::test]
async fn test_set_open_fails_without_flipping_the_gate() {
    let harness = MarketHarness::new().await;
    assert!(harness.engine.is_open());

    harness.kv.set_fail_writes(true);
    let result = harness.engine.set_open(false).await;
    assert!(matches!(result, Err(MarketError::Persistence(_))));
    assert!(harness.engine.is_open());
}

#[tokio::test]
async fn test_settlement_retries_after_write_failure() {
    let harness = MarketHarness::new().await;
    let auction = harness.listing(1, "Sword", 10, None, Some(1)).await;
    let seller = harness.player(1);
    let bidder = harness.fund(2, 100).await;

    harness.engine.bid(&bidder, "Sword", 40).await.unwrap();
    harness.advance_past_deadline(&auction);

    harness.kv.set_fail_writes(true);
    harness.settle().await;

    // The pass failed but left the listing consistent.
    assert_eq!(
        harness.engine.get_auction("Sword").await.unwrap().state,
        AuctionState::Open
    );
    assert_eq!(harness.economy.balance(&seller).await, 0);

    harness.kv.set_fail_writes(false);
    harness.settle().await;
    assert!(harness.engine.get_auction("Sword").await.is_none());
    assert_eq!(harness.economy.balance(&seller).await, 40);
    assert_eq!(harness.custody.release_count().await, 1);
}

#[tokio::test]
async fn test_reload_restores_listings_and_bids() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(4)).await;
    harness.listing(2, "Axe", 50, Some(200), Some(2)).await;
    let bidder = harness.fund(3, 1_000).await;
    harness.engine.bid(&bidder, "Sword", 150).await.unwrap();

    let restarted = harness.restart().await;

    let sword = restarted.get_auction("Sword").await.unwrap();
    assert_eq!(sword.state, AuctionState::Open);
    assert_eq!(sword.highest_bid.unwrap().amount, 150);

    let axe = restarted.get_auction("Axe").await.unwrap();
    assert_eq!(axe.buyout_price, Some(200));

    assert_eq!(restarted.auction_names().await, vec!["Axe", "Sword"]);
}

#[tokio::test]
async fn test_reload_restores_gate_and_anchor() {
    let harness = MarketHarness::new().await;
    let admin = harness.player(1);

    harness.engine.set_open(false).await.unwrap();
    let location = Location {
        world: "market".into(),
        x: 1.0,
        y: 70.0,
        z: 2.0,
    };
    harness
        .engine
        .spawn_anchor(location.clone(), &admin)
        .await
        .unwrap();

    let restarted = harness.restart().await;
    assert!(!restarted.is_open());
    assert_eq!(restarted.teleport(&admin).unwrap(), location);
}

#[tokio::test]
async fn test_reload_restores_live_buyout_window() {
    let harness = MarketHarness::with_config(EngineConfig {
        buyout_ttl_secs: 3_600,
        ..EngineConfig::default()
    })
    .await;
    harness.listing(1, "Axe", 20, Some(50), Some(2)).await;
    let buyer = harness.fund(2, 100).await;
    harness.engine.buyout_request(&buyer, "Axe").await.unwrap();

    let restarted = harness.restart().await;
    assert_eq!(
        restarted.get_auction("Axe").await.unwrap().state,
        AuctionState::PendingBuyout
    );

    // The restored token still belongs to the requester.
    let sold = restarted.buyout_confirm(&buyer, "Axe").await.unwrap();
    assert_eq!(sold.state, AuctionState::Sold);
}

#[tokio::test]
async fn test_window_lapsed_during_downtime_reopens_after_reload() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Axe", 20, Some(50), Some(2)).await;
    let buyer = harness.fund(2, 100).await;
    harness.engine.buyout_request(&buyer, "Axe").await.unwrap();

    // The TTL lapses while the server is down.
    harness.advance(3_600);
    let restarted = harness.restart().await;

    restarted.run_expiry_pass().await;
    assert_eq!(
        restarted.get_auction("Axe").await.unwrap().state,
        AuctionState::Open
    );
}

#[tokio::test]
async fn test_settled_listings_are_archived_not_active() {
    let harness = MarketHarness::new().await;
    let auction = harness.listing(1, "Sword", 10, None, Some(1)).await;

    harness.advance_past_deadline(&auction);
    harness.settle().await;

    // History survives under the archive prefix; the active record is gone.
    assert!(harness.kv.raw_get("auction/sword").await.is_none());
    let archived = harness
        .kv
        .raw_get(&format!("archive/sword/{}", auction.created_at))
        .await;
    assert!(archived.is_some());

    let restarted = harness.restart().await;
    assert!(restarted.get_auction("Sword").await.is_none());
}
