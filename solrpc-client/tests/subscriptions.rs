//! Subscription multiplexing and confirmation tracking against a scripted server
//!
//! These tests cover:
//! - Routing notifications by server subscription id
//! - Unsubscribe, drop and one-shot signature streams
//! - Reconnection, resubscription and giving up
//! - Confirmation by polling, by push and by both across a reconnect
//! - Cancellation and timeouts while a poll is stalled

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use common::{MockConnector, ScriptedTransport, StalledTransport, init_tracing, with_context};
use serde_json::{Value, json};
use solrpc_client::error::TransportError;
use solrpc_client::{
    AccountInfoConfig, ClientError, CommitmentLevel, ConfirmationConfig, ConfirmationStatus,
    ConfirmationTracker, Outcome, Pubkey, ReconnectPolicy, RpcDispatcher, Signature,
    SignatureResult, SlotInfo, SubscriptionHandle, SubscriptionKind, SubscriptionMultiplexer,
};
use tokio::time::Instant;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn slot_update(slot: u64) -> Value {
    json!({ "parent": slot - 1, "root": slot.saturating_sub(32), "slot": slot })
}

fn account_update(lamports: u64) -> Value {
    with_context(
        9,
        json!({
            "lamports": lamports,
            "owner": Pubkey::default().to_string(),
            "data": ["AQID", "base64"],
            "executable": false,
            "rentEpoch": 0,
            "space": 3
        }),
    )
}

fn status(slot: u64, confirmation_status: &str, err: Value) -> Value {
    let confirmations = match confirmation_status {
        "finalized" => Value::Null,
        _ => json!(1),
    };
    let legacy = match &err {
        Value::Null => json!({ "Ok": null }),
        err => json!({ "Err": err }),
    };
    json!({
        "slot": slot,
        "confirmations": confirmations,
        "err": err,
        "status": legacy,
        "confirmationStatus": confirmation_status
    })
}

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(100),
        multiplier: 2.0,
        max_delay: Duration::from_secs(1),
        max_attempts,
    }
}

async fn multiplexer(
    policy: ReconnectPolicy,
) -> (
    SubscriptionMultiplexer,
    Arc<MockConnector>,
    tokio::sync::mpsc::UnboundedReceiver<common::ServerEnd>,
    common::ServerEnd,
) {
    init_tracing();
    let (connector, mut accepted) = MockConnector::new();
    let multiplexer = SubscriptionMultiplexer::connect(connector.clone(), policy, REQUEST_TIMEOUT)
        .await
        .unwrap();
    let server = accepted.recv().await.unwrap();
    (multiplexer, connector, accepted, server)
}

/// Tracker whose status polls are answered by `statuses`, called with the poll count
fn tracker(
    statuses: impl Fn(usize) -> Result<Value, Value> + Send + Sync + 'static,
    block_height: u64,
) -> (ConfirmationTracker, Arc<ScriptedTransport>) {
    init_tracing();
    let polls = AtomicUsize::new(0);
    let transport = ScriptedTransport::new(move |method, params| match method {
        "getSignatureStatuses" => statuses(polls.fetch_add(1, Ordering::SeqCst) + 1),
        "getBlockHeight" => {
            assert_eq!(params, &json!([{ "commitment": "confirmed" }]));
            Ok(json!(block_height))
        }
        other => panic!("unexpected method {}", other),
    });
    let dispatcher = RpcDispatcher::new(transport.clone(), REQUEST_TIMEOUT);
    (
        ConfirmationTracker::new(dispatcher, ConfirmationConfig::default()),
        transport,
    )
}

fn statuses_reply(status: Value) -> Result<Value, Value> {
    Ok(with_context(100, json!([status])))
}

// Multiplexer

#[tokio::test]
async fn test_notifications_are_routed_by_server_id() {
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;

    let (slots, request) = tokio::join!(
        multiplexer.slot_subscribe(),
        server.accept("slotSubscribe", 10)
    );
    let mut slots = slots.unwrap();
    assert_eq!(request["params"], json!([]));

    let owner = Pubkey::new_from_array([3; 32]);
    let (accounts, request) = tokio::join!(
        multiplexer.account_subscribe(
            &owner,
            AccountInfoConfig::with_commitment(CommitmentLevel::Confirmed)
        ),
        server.accept("accountSubscribe", 11)
    );
    let mut accounts = accounts.unwrap();
    assert_eq!(
        request["params"],
        json!([owner.to_string(), { "encoding": "base64", "commitment": "confirmed" }])
    );
    assert_ne!(slots.subscription_key(), accounts.subscription_key());
    assert_eq!(accounts.kind(), SubscriptionKind::Account);

    server.notify("accountNotification", 11, account_update(500));
    server.notify("slotNotification", 10, slot_update(42));

    let account = accounts.next().await.unwrap();
    assert_eq!(account.context.slot, 9);
    assert_eq!(account.value.lamports, 500);
    assert_eq!(account.value.data, vec![1, 2, 3]);

    let slot: SlotInfo = slots.next().await.unwrap();
    assert_eq!(slot.slot, 42);
}

#[tokio::test]
async fn test_unknown_and_malformed_notifications_are_dropped() {
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;
    let (slots, _) = tokio::join!(
        multiplexer.slot_subscribe(),
        server.accept("slotSubscribe", 10)
    );
    let mut slots = slots.unwrap();

    server.notify("slotNotification", 99, slot_update(1));
    server.send_raw("not json");
    server.notify("slotNotification", 10, json!({ "unexpected": true }));
    server.notify("slotNotification", 10, slot_update(7));

    assert_eq!(slots.next().await.unwrap().slot, 7);
}

#[tokio::test]
async fn test_subscribe_rejection_is_reported() {
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;

    let (result, _) = tokio::join!(multiplexer.slot_subscribe(), async {
        let request = server.next_request().await;
        server.reject(&request["id"], -32601, "Method not found");
    });
    let error = result.unwrap_err();
    assert_matches!(error, ClientError::Rpc(_));
    assert_eq!(error.rpc_code(), Some(-32601));
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_times_out_without_reply() {
    let (multiplexer, _connector, _accepted, _server) = multiplexer(fast_policy(3)).await;

    let error = multiplexer.slot_subscribe().await.unwrap_err();
    assert_matches!(
        error,
        ClientError::Transport(TransportError::Timeout(timeout)) if timeout == REQUEST_TIMEOUT
    );
}

#[tokio::test]
async fn test_signature_subscription_ends_after_one_notification() {
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;
    let signature = Signature::from([4u8; 64]);

    let (subscription, request) = tokio::join!(
        multiplexer.signature_subscribe(&signature, CommitmentLevel::Finalized),
        server.accept("signatureSubscribe", 5)
    );
    let mut subscription = subscription.unwrap();
    assert_eq!(
        request["params"],
        json!([signature.to_string(), { "commitment": "finalized" }])
    );

    server.notify(
        "signatureNotification",
        5,
        with_context(77, json!({ "err": null })),
    );
    let notification = subscription.next().await.unwrap();
    assert_eq!(notification.context.slot, 77);
    assert_eq!(notification.value, SignatureResult::Processed { err: None });

    assert!(subscription.next().await.is_none());
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;
    let (slots, _) = tokio::join!(
        multiplexer.slot_subscribe(),
        server.accept("slotSubscribe", 10)
    );
    let mut slots = slots.unwrap();

    let (closed, _) = tokio::join!(slots.unsubscribe(), async {
        let request = server.next_request().await;
        assert_eq!(request["method"], "slotUnsubscribe");
        assert_eq!(request["params"], json!([10]));
        server.reply(&request["id"], json!(true));
    });
    assert!(tokio_test::assert_ok!(closed));
    assert!(!slots.is_active());

    assert!(!slots.unsubscribe().await.unwrap());
    assert!(slots.next().await.is_none());
}

#[tokio::test]
async fn test_dropping_a_subscription_unsubscribes() {
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;
    let (logs, _) = tokio::join!(
        multiplexer.logs_subscribe(solrpc_client::LogsFilter::All, CommitmentLevel::Processed),
        server.accept("logsSubscribe", 21)
    );
    drop(logs.unwrap());

    let request = server.next_request().await;
    assert_eq!(request["method"], "logsUnsubscribe");
    assert_eq!(request["params"], json!([21]));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_resubscribes_with_new_ids() {
    let (multiplexer, connector, mut accepted, mut server) = multiplexer(fast_policy(3)).await;
    let owner = Pubkey::new_from_array([8; 32]);

    let (slots, _) = tokio::join!(
        multiplexer.slot_subscribe(),
        server.accept("slotSubscribe", 10)
    );
    let (accounts, original) = tokio::join!(
        multiplexer.account_subscribe(&owner, AccountInfoConfig::default()),
        server.accept("accountSubscribe", 11)
    );
    let (mut slots, mut accounts) = (slots.unwrap(), accounts.unwrap());
    let (slot_key, account_key) = (slots.subscription_key(), accounts.subscription_key());

    drop(server);
    let mut server = accepted.recv().await.unwrap();
    assert_eq!(connector.attempts(), 2);

    for _ in 0..2 {
        let request = server.next_request().await;
        let server_id = match request["method"].as_str().unwrap() {
            "slotSubscribe" => 20,
            "accountSubscribe" => {
                assert_eq!(request["params"], original["params"]);
                21
            }
            other => panic!("unexpected {}", other),
        };
        server.reply(&request["id"], json!(server_id));
    }

    // Old ids are no longer routed
    server.notify("slotNotification", 10, slot_update(5));
    server.notify("slotNotification", 20, slot_update(6));
    server.notify("accountNotification", 21, account_update(1));

    assert_eq!(slots.next().await.unwrap().slot, 6);
    assert_eq!(accounts.next().await.unwrap().value.lamports, 1);
    assert_eq!(slots.subscription_key(), slot_key);
    assert_eq!(accounts.subscription_key(), account_key);
    assert!(!multiplexer.is_terminated());
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_during_reconnect_waits_for_new_connection() {
    let (multiplexer, _connector, mut accepted, server) = multiplexer(fast_policy(3)).await;
    drop(server);

    let (slots, server) = tokio::join!(multiplexer.slot_subscribe(), async {
        let mut server = accepted.recv().await.unwrap();
        server.accept("slotSubscribe", 30).await;
        server
    });
    let mut slots = slots.unwrap();

    server.notify("slotNotification", 30, slot_update(3));
    assert_eq!(slots.next().await.unwrap().slot, 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_reconnection_ends_every_stream() {
    let (multiplexer, connector, _accepted, mut server) = multiplexer(fast_policy(2)).await;
    let (slots, _) = tokio::join!(
        multiplexer.slot_subscribe(),
        server.accept("slotSubscribe", 10)
    );
    let mut slots = slots.unwrap();

    connector.refuse_next(2);
    drop(server);

    assert!(slots.next().await.is_none());
    assert_eq!(connector.attempts(), 3);
    assert!(multiplexer.is_terminated());

    let error = multiplexer.slot_subscribe().await.unwrap_err();
    assert_matches!(
        error,
        ClientError::Transport(TransportError::ReconnectionFailed { max: 2 })
    );
}

// Confirmation tracking

#[tokio::test(start_paused = true)]
async fn test_polling_reaches_target_commitment() {
    let (tracker, transport) = tracker(
        |poll| match poll {
            1 => statuses_reply(Value::Null),
            2 => statuses_reply(status(7, "processed", Value::Null)),
            _ => statuses_reply(status(7, "confirmed", Value::Null)),
        },
        0,
    );

    let pending = tracker.track(Signature::from([1u8; 64]), CommitmentLevel::Confirmed, None);
    assert_eq!(pending.signature(), &Signature::from([1u8; 64]));

    let outcome = pending.wait().await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Success {
            slot: 7,
            commitment: CommitmentLevel::Confirmed
        }
    );
    assert_eq!(transport.calls("getSignatureStatuses"), 3);
    assert_eq!(transport.calls("getBlockHeight"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failures_are_retried() {
    let (tracker, transport) = tracker(
        |poll| match poll {
            1 => Err(json!({ "code": -32005, "message": "Node is behind" })),
            _ => statuses_reply(status(3, "finalized", Value::Null)),
        },
        0,
    );

    let outcome = tracker
        .track(Signature::from([2u8; 64]), CommitmentLevel::Finalized, None)
        .wait()
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(transport.calls("getSignatureStatuses"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_on_chain_error_below_target_resolves_immediately() {
    let err = json!({ "InstructionError": [0, { "Custom": 1 }] });
    let reported = err.clone();
    let (tracker, _transport) = tracker(
        move |_| statuses_reply(status(5, "processed", reported.clone())),
        0,
    );

    let outcome = tracker
        .track(Signature::from([3u8; 64]), CommitmentLevel::Confirmed, None)
        .wait()
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::OnChainError { slot: 5, err });
}

#[tokio::test(start_paused = true)]
async fn test_expired_blockhash_drops_transaction() {
    let (tracker, transport) = tracker(|_| statuses_reply(Value::Null), 101);

    let outcome = tracker
        .track(Signature::from([5u8; 64]), CommitmentLevel::Confirmed, Some(100))
        .wait()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Dropped {
            last_valid_block_height: 100,
            block_height: 101
        }
    );
    assert_eq!(transport.calls("getBlockHeight"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_wins_over_expiry_in_the_same_poll() {
    let (tracker, _transport) = tracker(
        |_| statuses_reply(status(90, "confirmed", Value::Null)),
        101,
    );

    let outcome = tracker
        .track(Signature::from([6u8; 64]), CommitmentLevel::Confirmed, Some(100))
        .wait()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Success {
            slot: 90,
            commitment: CommitmentLevel::Confirmed
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_reports_last_commitment() {
    let (tracker, _transport) = tracker(
        |_| statuses_reply(status(4, "processed", Value::Null)),
        0,
    );

    let outcome = tracker
        .track_with_timeout(
            Signature::from([7u8; 64]),
            CommitmentLevel::Finalized,
            None,
            Duration::from_secs(10),
        )
        .wait()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::TimedOut {
            last_observed: Some(CommitmentLevel::Processed)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_tracking() {
    let (tracker, transport) = tracker(|_| statuses_reply(Value::Null), 0);

    let mut pending = tracker.track(Signature::from([8u8; 64]), CommitmentLevel::Confirmed, None);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_matches!(pending.status(), ConfirmationStatus::Submitted);

    pending.cancel();
    pending.cancel();
    assert!(pending.is_cancelled());
    assert_eq!(pending.wait().await, None);

    let polls = transport.calls("getSignatureStatuses");
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.calls("getSignatureStatuses"), polls);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fires_while_poll_is_stalled() {
    init_tracing();
    let transport = Arc::new(StalledTransport::default());
    let dispatcher = RpcDispatcher::new(transport.clone(), Duration::from_secs(30));
    let tracker = ConfirmationTracker::new(dispatcher, ConfirmationConfig::default());

    let start = Instant::now();
    let outcome = tracker
        .track_with_timeout(
            Signature::from([20u8; 64]),
            CommitmentLevel::Confirmed,
            None,
            Duration::from_secs(1),
        )
        .wait()
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::TimedOut { last_observed: None });
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(transport.sent(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_stalled_poll() {
    init_tracing();
    let transport = Arc::new(StalledTransport::default());
    let dispatcher = RpcDispatcher::new(transport.clone(), Duration::from_secs(30));
    let tracker = ConfirmationTracker::new(dispatcher, ConfirmationConfig::default());

    let mut pending = tracker.track(Signature::from([21u8; 64]), CommitmentLevel::Confirmed, None);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.sent(), 1);

    let cancelled_at = Instant::now();
    pending.cancel();
    assert_eq!(pending.wait().await, None);
    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_zero_poll_interval_still_polls() {
    init_tracing();
    let polls = AtomicUsize::new(0);
    let transport = ScriptedTransport::new(move |method, _| match method {
        "getSignatureStatuses" => match polls.fetch_add(1, Ordering::SeqCst) {
            0..=1 => statuses_reply(Value::Null),
            _ => statuses_reply(status(15, "confirmed", Value::Null)),
        },
        other => panic!("unexpected method {}", other),
    });
    let config = ConfirmationConfig {
        poll_interval: Duration::ZERO,
        min_poll_interval: Duration::ZERO,
        timeout: Duration::from_secs(10),
    };
    let tracker = ConfirmationTracker::new(
        RpcDispatcher::new(transport.clone(), REQUEST_TIMEOUT),
        config,
    );

    let outcome = tracker
        .track(Signature::from([22u8; 64]), CommitmentLevel::Confirmed, None)
        .wait()
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Success {
            slot: 15,
            commitment: CommitmentLevel::Confirmed
        }
    );
    assert_eq!(transport.calls("getSignatureStatuses"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_push_resolves_before_next_poll() {
    let (tracker, transport) = tracker(|_| statuses_reply(Value::Null), 0);
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;
    let tracker = tracker.with_subscriptions(multiplexer);
    let signature = Signature::from([9u8; 64]);

    let pending = tracker.track(signature, CommitmentLevel::Confirmed, None);
    let request = server.accept("signatureSubscribe", 3).await;
    assert_eq!(
        request["params"],
        json!([signature.to_string(), { "commitment": "confirmed" }])
    );
    server.notify(
        "signatureNotification",
        3,
        with_context(12, json!({ "err": null })),
    );

    let outcome = pending.wait().await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Success {
            slot: 12,
            commitment: CommitmentLevel::Confirmed
        }
    );
    assert_eq!(transport.calls("getSignatureStatuses"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_push_with_error_resolves_on_chain_error() {
    let (tracker, _transport) = tracker(|_| statuses_reply(Value::Null), 0);
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;
    let tracker = tracker.with_subscriptions(multiplexer);

    let pending = tracker.track(Signature::from([10u8; 64]), CommitmentLevel::Finalized, None);
    server.accept("signatureSubscribe", 4).await;
    server.notify(
        "signatureNotification",
        4,
        with_context(13, json!({ "err": "AccountInUse" })),
    );

    assert_eq!(
        pending.wait().await.unwrap(),
        Outcome::OnChainError {
            slot: 13,
            err: json!("AccountInUse")
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_push_after_reconnect_resolves() {
    let (tracker, _transport) = tracker(|_| statuses_reply(Value::Null), 0);
    let (multiplexer, _connector, mut accepted, mut server) = multiplexer(fast_policy(3)).await;
    let tracker = tracker.with_subscriptions(multiplexer);
    let signature = Signature::from([11u8; 64]);

    let pending = tracker.track(signature, CommitmentLevel::Confirmed, None);
    let original = server.accept("signatureSubscribe", 3).await;
    drop(server);

    let mut server = accepted.recv().await.unwrap();
    let request = server.accept("signatureSubscribe", 4).await;
    assert_eq!(request["params"], original["params"]);
    server.notify(
        "signatureNotification",
        4,
        with_context(50, json!({ "err": null })),
    );

    assert_eq!(
        pending.wait().await.unwrap(),
        Outcome::Success {
            slot: 50,
            commitment: CommitmentLevel::Confirmed
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_polling_continues_when_subscriptions_give_up() {
    let (tracker, transport) = tracker(
        |poll| match poll {
            1..=3 => statuses_reply(Value::Null),
            _ => statuses_reply(status(60, "confirmed", Value::Null)),
        },
        0,
    );
    let (multiplexer, _connector, _accepted, mut server) =
        multiplexer(ReconnectPolicy::disabled()).await;
    let tracker = tracker.with_subscriptions(multiplexer.clone());

    let pending = tracker.track(Signature::from([12u8; 64]), CommitmentLevel::Confirmed, None);
    server.accept("signatureSubscribe", 3).await;
    drop(server);

    assert_eq!(
        pending.wait().await.unwrap(),
        Outcome::Success {
            slot: 60,
            commitment: CommitmentLevel::Confirmed
        }
    );
    assert!(multiplexer.is_terminated());
    assert_eq!(transport.calls("getSignatureStatuses"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_polling_resolves_after_reconnect_without_push() {
    let (tracker, transport) = tracker(
        |poll| match poll {
            1..=3 => statuses_reply(Value::Null),
            _ => statuses_reply(status(70, "confirmed", Value::Null)),
        },
        0,
    );
    let (multiplexer, connector, mut accepted, mut server) = multiplexer(fast_policy(3)).await;
    let tracker = tracker.with_subscriptions(multiplexer.clone());

    let pending = tracker.track(Signature::from([13u8; 64]), CommitmentLevel::Confirmed, None);
    server.accept("signatureSubscribe", 3).await;
    drop(server);

    let mut server = accepted.recv().await.unwrap();
    server.accept("signatureSubscribe", 4).await;

    assert_eq!(
        pending.wait().await.unwrap(),
        Outcome::Success {
            slot: 70,
            commitment: CommitmentLevel::Confirmed
        }
    );
    assert!(!multiplexer.is_terminated());
    assert_eq!(connector.attempts(), 2);
    assert_eq!(transport.calls("getSignatureStatuses"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_unsubscribes_signature() {
    let (tracker, _transport) = tracker(|_| statuses_reply(Value::Null), 0);
    let (multiplexer, _connector, _accepted, mut server) = multiplexer(fast_policy(3)).await;
    let tracker = tracker.with_subscriptions(multiplexer);

    let mut pending = tracker.track(Signature::from([14u8; 64]), CommitmentLevel::Confirmed, None);
    server.accept("signatureSubscribe", 7).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    pending.cancel();
    assert_eq!(pending.wait().await, None);

    let request = server.next_request().await;
    assert_eq!(request["method"], "signatureUnsubscribe");
    assert_eq!(request["params"], json!([7]));
}
