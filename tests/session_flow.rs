//! End-to-end tests of the session services over the in-memory store.

use std::{sync::Arc, time::Duration};

use buzz_rush_back::{
    config::{AppConfig, ResetPolicy},
    dao::session_store::memory::MemorySessionStore,
    dto::{
        phase::VisibleSessionPhase,
        session::{BuzzRejectReason, BuzzRequest, JoinRequest},
    },
    error::ServiceError,
    services::{admin_service, countdown, participant_service},
    state::{SessionState, SharedState},
};

/// Tick interval long enough that the background ticker never fires during a
/// test; ticks are driven explicitly through `countdown::tick`.
fn test_config() -> AppConfig {
    AppConfig {
        tick_interval: Duration::from_secs(3_600),
        ..AppConfig::default()
    }
}

async fn test_state_with(config: AppConfig) -> SharedState {
    let state = buzz_rush_back::state::AppState::new(config);
    state
        .set_session_store(Arc::new(MemorySessionStore::new()))
        .await;
    state
}

async fn test_state() -> SharedState {
    test_state_with(test_config()).await
}

async fn join(state: &SharedState, session_id: uuid::Uuid, identity: &str) {
    participant_service::join(
        state,
        session_id,
        JoinRequest {
            identity: identity.into(),
        },
    )
    .await
    .unwrap();
}

async fn buzz(
    state: &SharedState,
    session_id: uuid::Uuid,
    identity: &str,
) -> buzz_rush_back::dto::session::BuzzResponse {
    participant_service::buzz(
        state,
        session_id,
        BuzzRequest {
            identity: identity.into(),
        },
    )
    .await
    .unwrap()
}

/// Drive ticks until the buzz window opens.
async fn open_window(state: &SharedState, session: &Arc<SessionState>) {
    let generation = session.snapshot().await.generation;
    loop {
        match countdown::tick(state, session, generation).await.unwrap() {
            countdown::TickOutcome::CountdownRunning => continue,
            countdown::TickOutcome::WindowOpened => break,
            countdown::TickOutcome::Stale => panic!("tick went stale while opening the window"),
        }
    }
}

#[tokio::test]
async fn countdown_opens_window_after_three_ticks() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    let started = admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    assert_eq!(started.snapshot.phase, VisibleSessionPhase::Countdown);
    assert_eq!(started.snapshot.countdown_remaining, Some(3));

    let generation = session.snapshot().await.generation;
    assert_eq!(
        countdown::tick(&state, &session, generation).await.unwrap(),
        countdown::TickOutcome::CountdownRunning
    );
    assert_eq!(
        countdown::tick(&state, &session, generation).await.unwrap(),
        countdown::TickOutcome::CountdownRunning
    );
    assert_eq!(
        countdown::tick(&state, &session, generation).await.unwrap(),
        countdown::TickOutcome::WindowOpened
    );

    let view = participant_service::session_state(&state, created.session_id, None)
        .await
        .unwrap();
    assert_eq!(view.snapshot.phase, VisibleSessionPhase::BuzzWindow);
}

#[tokio::test]
async fn simultaneous_buzzers_get_strict_ranks() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    join(&state, created.session_id, "alice").await;
    join(&state, created.session_id, "bob").await;

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;

    let first = buzz(&state, created.session_id, "alice").await;
    let second = buzz(&state, created.session_id, "bob").await;

    assert!(first.accepted);
    assert_eq!(first.rank, Some(1));
    assert!(second.accepted);
    assert_eq!(second.rank, Some(2));

    let leaderboard = participant_service::leaderboard(&state, created.session_id)
        .await
        .unwrap();
    let order: Vec<_> = leaderboard
        .entries
        .iter()
        .map(|entry| (entry.rank, entry.identity.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "alice"), (2, "bob")]);
}

#[tokio::test]
async fn concurrent_buzzes_receive_contiguous_unique_ranks() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    let identities: Vec<String> = (0..8).map(|i| format!("player-{i}")).collect();
    for identity in &identities {
        join(&state, created.session_id, identity).await;
    }

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;

    let mut handles = Vec::new();
    for identity in identities.clone() {
        let state = state.clone();
        let session_id = created.session_id;
        handles.push(tokio::spawn(async move {
            participant_service::buzz(&state, session_id, BuzzRequest { identity })
                .await
                .unwrap()
        }));
    }

    let mut ranks = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.accepted);
        ranks.push(response.rank.unwrap());
    }

    ranks.sort_unstable();
    let expected: Vec<u32> = (1..=identities.len() as u32).collect();
    assert_eq!(ranks, expected, "ranks must be 1..=n with no gaps or ties");
}

#[tokio::test]
async fn second_buzz_from_same_identity_is_rejected() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    join(&state, created.session_id, "alice").await;
    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;

    let first = buzz(&state, created.session_id, "alice").await;
    assert_eq!(first.rank, Some(1));

    let retry = buzz(&state, created.session_id, "alice").await;
    assert!(!retry.accepted);
    assert_eq!(retry.rank, None);
    assert_eq!(retry.reason, Some(BuzzRejectReason::AlreadyBuzzed));
}

#[tokio::test]
async fn buzz_outside_the_window_is_rejected() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();

    join(&state, created.session_id, "carol").await;

    // Phase is idle: the window is closed.
    let response = buzz(&state, created.session_id, "carol").await;
    assert!(!response.accepted);
    assert_eq!(response.reason, Some(BuzzRejectReason::WindowClosed));

    // Still closed during the countdown.
    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    let response = buzz(&state, created.session_id, "carol").await;
    assert_eq!(response.reason, Some(BuzzRejectReason::WindowClosed));
}

#[tokio::test]
async fn unknown_identity_is_rejected() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;

    let response = buzz(&state, created.session_id, "ghost").await;
    assert!(!response.accepted);
    assert_eq!(response.reason, Some(BuzzRejectReason::UnknownIdentity));
}

#[tokio::test]
async fn duplicate_join_fails_with_identity_taken() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();

    join(&state, created.session_id, "alice").await;

    let err = participant_service::join(
        &state,
        created.session_id,
        JoinRequest {
            identity: "alice".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::IdentityTaken(identity) if identity == "alice"));
}

#[tokio::test]
async fn reset_clears_buzz_state_and_restarts_ranks() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    join(&state, created.session_id, "alice").await;
    join(&state, created.session_id, "bob").await;

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;
    buzz(&state, created.session_id, "alice").await;
    buzz(&state, created.session_id, "bob").await;

    let reset = admin_service::reset_session(&state, created.session_id)
        .await
        .unwrap();
    assert_eq!(reset.generation, 1);
    assert_eq!(reset.participants_cleared, 2);

    let view = participant_service::session_state(
        &state,
        created.session_id,
        Some("alice".into()),
    )
    .await
    .unwrap();
    assert_eq!(view.snapshot.phase, VisibleSessionPhase::Idle);
    let status = view.participant.unwrap();
    assert!(!status.buzzed);
    assert_eq!(status.rank, None);

    let leaderboard = participant_service::leaderboard(&state, created.session_id)
        .await
        .unwrap();
    assert!(leaderboard.entries.is_empty());

    // Next round: identities survive the reset and ranks restart at 1.
    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;

    let response = buzz(&state, created.session_id, "bob").await;
    assert_eq!(response.rank, Some(1));
}

#[tokio::test]
async fn reset_can_remove_identities_when_configured() {
    let config = AppConfig {
        reset_policy: ResetPolicy::RemoveIdentities,
        ..test_config()
    };
    let state = test_state_with(config).await;
    let created = admin_service::create_session(&state).await.unwrap();

    join(&state, created.session_id, "alice").await;
    admin_service::reset_session(&state, created.session_id)
        .await
        .unwrap();

    // The identity is free again.
    join(&state, created.session_id, "alice").await;
}

#[tokio::test]
async fn stale_tick_after_reset_is_a_no_op() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    let old_generation = session.snapshot().await.generation;

    admin_service::reset_session(&state, created.session_id)
        .await
        .unwrap();

    // A tick from the aborted countdown's generation must change nothing.
    let outcome = countdown::tick(&state, &session, old_generation)
        .await
        .unwrap();
    assert_eq!(outcome, countdown::TickOutcome::Stale);

    let view = participant_service::session_state(&state, created.session_id, None)
        .await
        .unwrap();
    assert_eq!(view.snapshot.phase, VisibleSessionPhase::Idle);
}

#[tokio::test]
async fn second_countdown_start_is_rejected_not_queued() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    let err = admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn mid_window_joiner_only_counts_next_round() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;

    let joined = participant_service::join(
        &state,
        created.session_id,
        JoinRequest {
            identity: "late".into(),
        },
    )
    .await
    .unwrap();
    assert!(joined.active_from_next_window);

    let response = buzz(&state, created.session_id, "late").await;
    assert_eq!(response.reason, Some(BuzzRejectReason::WindowClosed));

    admin_service::reset_session(&state, created.session_id)
        .await
        .unwrap();
    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;

    let response = buzz(&state, created.session_id, "late").await;
    assert_eq!(response.rank, Some(1));
}

#[tokio::test]
async fn history_survives_resets_and_honors_the_limit() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    for identity in ["alice", "bob", "carol"] {
        join(&state, created.session_id, identity).await;
    }

    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;
    buzz(&state, created.session_id, "alice").await;
    buzz(&state, created.session_id, "bob").await;

    admin_service::reset_session(&state, created.session_id)
        .await
        .unwrap();
    admin_service::start_countdown(&state, created.session_id)
        .await
        .unwrap();
    open_window(&state, &session).await;
    buzz(&state, created.session_id, "carol").await;

    let history = admin_service::recent_history(&state, created.session_id, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].identity, "carol");

    let limited = admin_service::recent_history(&state, created.session_id, Some(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].identity, "carol");
}

#[tokio::test]
async fn admin_token_is_checked_per_session() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();
    let session = state.session(created.session_id).unwrap();

    assert!(admin_service::authorize(&session, Some(&created.admin_token)).is_ok());
    assert!(matches!(
        admin_service::authorize(&session, Some("not-the-token")),
        Err(ServiceError::Unauthorized(_))
    ));
    assert!(matches!(
        admin_service::authorize(&session, None),
        Err(ServiceError::Unauthorized(_))
    ));

    // Tokens are scoped to their session.
    let other = admin_service::create_session(&state).await.unwrap();
    let other_session = state.session(other.session_id).unwrap();
    assert!(matches!(
        admin_service::authorize(&other_session, Some(&created.admin_token)),
        Err(ServiceError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn deleted_session_disappears_from_the_registry() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();

    join(&state, created.session_id, "alice").await;
    admin_service::delete_session(&state, created.session_id)
        .await
        .unwrap();

    assert!(state.session(created.session_id).is_none());
    let err = participant_service::leaderboard(&state, created.session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn operations_fail_cleanly_in_degraded_mode() {
    let state = test_state().await;
    let created = admin_service::create_session(&state).await.unwrap();

    state.clear_session_store().await;

    let err = participant_service::join(
        &state,
        created.session_id,
        JoinRequest {
            identity: "alice".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));
}
