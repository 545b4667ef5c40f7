use std::sync::{Arc, Mutex};
use std::time::Duration;

use drift_online::backend::{BackendRequest, BackendResponse, Responder};
use drift_online::prelude::*;
use drift_online::types::{ActiveMatch, MatchId, MatchQueueMatch, MatchQueueState, MatchQueueStatus};

// ---------------------------------------------------------------------------
// Loopback match service
// ---------------------------------------------------------------------------

/// Answers every request after a short delay, from a Tokio task.
///
/// The queue places the player on the third poll.
struct LoopbackBackend {
    latency: Duration,
    queue: Mutex<LoopbackQueue>,
}

#[derive(Default)]
struct LoopbackQueue {
    state: MatchQueueState,
    polls: u32,
}

impl LoopbackBackend {
    const POLLS_UNTIL_MATCH: u32 = 3;

    fn new(latency: Duration) -> Self {
        Self {
            latency,
            queue: Mutex::new(LoopbackQueue::default()),
        }
    }

    fn answer(&self, request: &BackendRequest) -> BackendResponse {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        match request {
            BackendRequest::GetActiveMatches => BackendResponse::ActiveMatches(vec![ActiveMatch {
                match_id: MatchId(7),
                connection_url: "127.0.0.1:7777".into(),
                num_players: 1,
                max_players: 4,
            }]),
            BackendRequest::JoinQueue
            | BackendRequest::InvitePlayer { .. }
            | BackendRequest::AcceptInvite { .. } => {
                queue.state = MatchQueueState::Queued;
                queue.polls = 0;
                BackendResponse::Queue(MatchQueueStatus::waiting())
            }
            BackendRequest::PollQueue => {
                queue.polls += 1;
                if queue.polls >= Self::POLLS_UNTIL_MATCH {
                    queue.state = MatchQueueState::Matched;
                    BackendResponse::Queue(MatchQueueStatus::matched(MatchQueueMatch {
                        match_id: MatchId(8),
                        connection_url: "127.0.0.1:7778".into(),
                    }))
                } else {
                    BackendResponse::Queue(MatchQueueStatus::waiting())
                }
            }
            BackendRequest::LeaveQueue => {
                queue.state = MatchQueueState::Idle;
                BackendResponse::Ack
            }
            _ => BackendResponse::Ack,
        }
    }
}

impl MatchBackend for LoopbackBackend {
    fn submit(&self, request: BackendRequest, responder: Responder) {
        let response = self.answer(&request);
        let latency = self.latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            responder.succeed(response);
        });
    }

    fn match_queue_state(&self) -> MatchQueueState {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    fn reset_match_queue(&self) {
        *self.queue.lock().unwrap_or_else(|e| e.into_inner()) = LoopbackQueue::default();
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// Waits on `scheduler`, ticking the subsystem, until `done` returns true.
async fn tick_until(
    subsystem: &mut OnlineSubsystemDrift,
    scheduler: &mut TickScheduler,
    done: impl Fn(&OnlineSessionDrift) -> bool,
) {
    while !done(subsystem.session_interface()) {
        let info = scheduler.wait_for_tick().await;
        subsystem.tick(info.dt);
    }
}

/// Hosts one match as a dedicated server, then finds it and queues for
/// another as a client.
async fn run_scenario(latency: Duration) -> Result<Vec<String>, DriftError> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = TickScheduler::new(TickConfig::with_rate(30));

    let mut server = OnlineSubsystemDrift::builder()
        .role(NetRole::DedicatedServer)
        .backend(Arc::new(LoopbackBackend::new(latency)))
        .build();
    let game = SessionName::game();

    let l = log.clone();
    server.sessions_mut().delegates_mut().create.add(move |o| {
        l.lock().unwrap_or_else(|e| e.into_inner()).push(format!("create {} {}", o.session, o.success));
    });
    let l = log.clone();
    server.sessions_mut().delegates_mut().destroy.add(move |o| {
        l.lock().unwrap_or_else(|e| e.into_inner()).push(format!("destroy {} {}", o.session, o.success));
    });

    let settings = SessionSettings::default()
        .with_public_connections(4)
        .with_map_name("Harbor")
        .with_game_mode("duel");
    server
        .sessions_mut()
        .create_session(PlayerId(1), game.clone(), settings)?;
    tick_until(&mut server, &mut scheduler, |s| {
        s.session_state(&game) == SessionState::Pending
    })
    .await;

    server
        .sessions_mut()
        .register_players(&game, &[PlayerId(1), PlayerId(2)], false)?;
    server.sessions_mut().start_session(&game)?;
    tracing::info!(state = %server.session_interface().session_state(&game), "match running");
    server.sessions_mut().end_session(&game)?;
    server.sessions_mut().destroy_session(&game)?;
    tick_until(&mut server, &mut scheduler, |_| {
        log.lock().unwrap_or_else(|e| e.into_inner()).iter().any(|e| e.starts_with("destroy"))
    })
    .await;

    let mut client = OnlineSubsystemDrift::builder()
        .backend(Arc::new(LoopbackBackend::new(latency)))
        .build();

    client.sessions_mut().find_sessions()?;
    tick_until(&mut client, &mut scheduler, |s| {
        s.search_state() != SearchState::InProgress
    })
    .await;
    for result in client.session_interface().search_results() {
        log.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("found {} at {:?}", result.match_id, result.connect_url()));
    }

    client
        .sessions_mut()
        .start_matchmaking(game.clone(), MatchmakingQuery::solo())?;
    tick_until(&mut client, &mut scheduler, |s| {
        s.search_state() != SearchState::InProgress
    })
    .await;

    let matched = client.session_interface().search_results().first().cloned();
    if let Some(result) = matched {
        client.sessions_mut().join_session(PlayerId(3), game.clone(), &result)?;
        let url = client.session_interface().resolved_connect_string(&game);
        log.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("joined {} at {:?}", result.match_id, url));
    }

    if let Ok(dump) = client.session_interface().dump_session_state() {
        tracing::debug!(bytes = dump.len(), "client sessions dumped");
    }

    let lines = log.lock().unwrap_or_else(|e| e.into_inner()).clone();
    Ok(lines)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    drift_online::init_tracing();

    let lines = run_scenario(Duration::from_millis(50)).await?;
    for line in lines {
        tracing::info!("{line}");
    }
    Ok(())
}
