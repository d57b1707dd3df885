//! Bid arbitration integration tests.

use bazaar::{AuctionState, MarketError, MarketEvent};

use crate::common::MarketHarness;

#[tokio::test]
async fn test_bid_sequence_is_strictly_increasing() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;

    let a = harness.fund(2, 1_000).await;
    let b = harness.fund(3, 1_000).await;

    let after_a = harness.engine.bid(&a, "Sword", 150).await.unwrap();
    assert_eq!(after_a.highest_bid.as_ref().unwrap().amount, 150);

    // Equal to the floor: rejected.
    let equal = harness.engine.bid(&b, "Sword", 150).await;
    assert!(matches!(equal, Err(MarketError::StateConflict(_))));

    let after_b = harness.engine.bid(&b, "Sword", 151).await.unwrap();
    assert_eq!(after_b.highest_bid.as_ref().unwrap().amount, 151);
    assert!(after_b.version > after_a.version);
}

#[tokio::test]
async fn test_bid_must_exceed_start_price() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let bidder = harness.fund(2, 1_000).await;

    // At the start price is not enough; the floor is strict.
    let result = harness.engine.bid(&bidder, "Sword", 100).await;
    assert!(matches!(result, Err(MarketError::StateConflict(_))));

    harness.engine.bid(&bidder, "Sword", 101).await.unwrap();
}

#[tokio::test]
async fn test_outbid_refunds_previous_reservation() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 10, None, Some(1)).await;

    let a = harness.fund(2, 100).await;
    let b = harness.fund(3, 100).await;

    harness.engine.bid(&a, "Sword", 12).await.unwrap();
    assert_eq!(harness.economy.reserved_for(&a).await, 12);
    assert_eq!(harness.economy.balance(&a).await, 88);

    harness.engine.bid(&b, "Sword", 15).await.unwrap();

    // A is whole again, B holds the only reservation.
    assert_eq!(harness.economy.reserved_for(&a).await, 0);
    assert_eq!(harness.economy.balance(&a).await, 100);
    assert_eq!(harness.economy.reserved_for(&b).await, 15);
    assert_eq!(harness.economy.total_reserved().await, 15);
    assert_eq!(harness.engine.escrowed_amount("Sword").await, Some(15));

    // And A heard about it.
    let events = harness.notifier.events_for(&a).await;
    assert!(events.iter().any(|e| matches!(
        e,
        MarketEvent::Outbid { auction, new_amount: 15 } if auction == "Sword"
    )));
}

#[tokio::test]
async fn test_escrow_matches_high_bid_after_every_accepted_bid() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 10, None, Some(1)).await;

    for (id, offer) in [(2u8, 20u64), (3, 30), (4, 45), (2, 60)] {
        let bidder = harness.fund(id, 1_000).await;
        harness.engine.bid(&bidder, "Sword", offer).await.unwrap();

        let auction = harness.engine.get_auction("Sword").await.unwrap();
        let high = auction.highest_bid.unwrap();
        assert_eq!(high.amount, offer);
        assert_eq!(harness.economy.total_reserved().await, high.amount);
    }
}

#[tokio::test]
async fn test_insufficient_funds_changes_nothing() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let poor = harness.fund(2, 50).await;

    let before = harness.engine.get_auction("Sword").await.unwrap();
    let result = harness.engine.bid(&poor, "Sword", 200).await;
    assert!(matches!(result, Err(MarketError::InsufficientFunds(200))));

    let after = harness.engine.get_auction("Sword").await.unwrap();
    assert_eq!(after.version, before.version);
    assert!(after.highest_bid.is_none());
    assert_eq!(harness.economy.balance(&poor).await, 50);
    assert_eq!(harness.economy.total_reserved().await, 0);
}

#[tokio::test]
async fn test_bid_on_unknown_auction() {
    let harness = MarketHarness::new().await;
    let bidder = harness.fund(2, 100).await;

    let result = harness.engine.bid(&bidder, "Ghost", 50).await;
    assert!(matches!(result, Err(MarketError::NotFound(_))));
}

#[tokio::test]
async fn test_seller_cannot_bid_on_own_listing() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let seller = harness.fund(1, 1_000).await;

    let result = harness.engine.bid(&seller, "Sword", 200).await;
    assert!(matches!(result, Err(MarketError::Validation(_))));
}

#[tokio::test]
async fn test_gate_closed_blocks_bids() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let bidder = harness.fund(2, 1_000).await;

    harness.engine.set_open(false).await.unwrap();
    let result = harness.engine.bid(&bidder, "Sword", 150).await;
    assert!(matches!(result, Err(MarketError::GateClosed)));

    harness.engine.set_open(true).await.unwrap();
    harness.engine.bid(&bidder, "Sword", 150).await.unwrap();
}

#[tokio::test]
async fn test_bid_names_are_case_insensitive() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;
    let bidder = harness.fund(2, 1_000).await;

    harness.engine.bid(&bidder, "SWORD", 150).await.unwrap();
    let auction = harness.engine.get_auction("sword").await.unwrap();
    assert_eq!(auction.highest_bid.unwrap().amount, 150);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_bids_keep_escrow_consistent() {
    let harness = MarketHarness::new().await;
    harness.listing(1, "Sword", 100, None, Some(1)).await;

    let mut bidders = Vec::new();
    for id in 2..=7u8 {
        bidders.push(harness.fund(id, 10_000).await);
    }

    let mut handles = Vec::new();
    for (i, bidder) in bidders.iter().cloned().enumerate() {
        let engine = harness.engine.clone();
        let offer = 200 + (i as u64) * 50;
        handles.push(tokio::spawn(async move {
            engine.bid(&bidder, "Sword", offer).await
        }));
    }

    let mut accepted = Vec::new();
    for handle in handles {
        if let Ok(auction) = handle.await.unwrap() {
            accepted.push(auction.highest_bid.unwrap().amount);
        }
    }
    assert!(!accepted.is_empty(), "at least one bid must win");

    let auction = harness.engine.get_auction("Sword").await.unwrap();
    assert_eq!(auction.state, AuctionState::Open);
    let high = auction.highest_bid.expect("a winning bid stands");

    // The standing bid is the largest accepted offer, and exactly that
    // amount is escrowed across all bidders — no double-reservation,
    // no lost refunds.
    assert_eq!(high.amount, *accepted.iter().max().unwrap());
    assert_eq!(harness.economy.total_reserved().await, high.amount);
    assert_eq!(harness.economy.reserved_for(&high.bidder).await, high.amount);

    for bidder in &bidders {
        let expected = if *bidder == high.bidder {
            10_000 - high.amount
        } else {
            10_000
        };
        assert_eq!(harness.economy.balance(bidder).await, expected);
    }
}
