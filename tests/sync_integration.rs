//! End-to-end tests: a real server on an ephemeral port, real HTTP
//! mutations and real websocket channels, exactly as two browser tabs
//! would drive them.

use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tokio::time::timeout;

use podo_sync::channel::RoomEvent;
use podo_sync::config::Config;
use podo_sync::routes::schedule::UpdateScheduleRequest;
use podo_sync::sync::{
    ChannelState, ChatLog, MutationClient, PresenceTracker, RoomChannel, SessionContext,
    SyncConfig, SyncError,
};
use podo_sync::{AppState, build_router};

const EVENT_WAIT: Duration = Duration::from_secs(5);

async fn spawn_server() -> u16 {
    let state = AppState::new(Config::default());
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    port
}

fn owner_client(config: &SyncConfig) -> MutationClient {
    MutationClient::new(config, SessionContext::new("jimin", "jimin@podo.app")).expect("client")
}

fn friend_client(config: &SyncConfig) -> MutationClient {
    MutationClient::new(config, SessionContext::new("haneul", "haneul@podo.app")).expect("client")
}

async fn next_event(rx: &mut broadcast::Receiver<RoomEvent>) -> RoomEvent {
    timeout(EVENT_WAIT, rx.recv())
        .await
        .expect("timed out waiting for a room event")
        .expect("event stream closed")
}

/// Skips unrelated events until one matches.
async fn wait_for<F>(rx: &mut broadcast::Receiver<RoomEvent>, mut matches: F) -> RoomEvent
where
    F: FnMut(&RoomEvent) -> bool,
{
    loop {
        let event = next_event(rx).await;
        if matches(&event) {
            return event;
        }
    }
}

async fn make_travel(client: &MutationClient) -> i64 {
    client
        .create_travel(
            "부산 여행",
            NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
            NaiveDate::from_ymd_opt(2026, 9, 3).expect("date"),
        )
        .await
        .expect("create travel")
        .travel_id
}

#[tokio::test]
async fn concurrent_schedule_edit_has_exactly_one_winner() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);
    let friend = friend_client(&config);

    let travel_id = make_travel(&owner).await;
    friend.join_travel(travel_id).await.expect("join");

    owner
        .create_schedule(
            travel_id,
            podo_sync::routes::schedule::ScheduleRequest {
                day: 1,
                time: "09:00".into(),
                schedule_type: "activity".into(),
                title: "해운대".into(),
                color: Some("blue".into()),
                place_name: None,
                x: None,
                y: None,
                address: None,
            },
        )
        .await
        .expect("create schedule");

    // Both tabs fetch the same version.
    let owner_view = owner.schedules(travel_id, 1).await.expect("fetch")[0].clone();
    let friend_view = friend.schedules(travel_id, 1).await.expect("fetch")[0].clone();
    assert_eq!(owner_view.version, friend_view.version);

    let update = |view: &podo_sync::routes::schedule::Schedule, time: &str| UpdateScheduleRequest {
        time: time.into(),
        schedule_type: view.schedule_type.clone(),
        title: view.title.clone(),
        place_name: view.place_name.clone(),
        x: view.x,
        y: view.y,
        address: view.address.clone(),
        version: view.version,
    };

    let won = owner
        .update_schedule(owner_view.id, update(&owner_view, "10:00"))
        .await
        .expect("first writer wins");
    assert_eq!(won.version, owner_view.version + 1);

    let err = friend
        .update_schedule(friend_view.id, update(&friend_view, "11:00"))
        .await
        .expect_err("second writer must lose");
    assert!(matches!(err, SyncError::Conflict(_)));

    // The loser refetches and sees the winner's value untouched by its
    // own rejected edit.
    let fresh = friend.schedules(travel_id, 1).await.expect("refetch");
    assert_eq!(fresh[0].time, "10:00");
    assert_eq!(fresh[0].version, won.version);

    // Retrying on fresh state succeeds.
    let retried = friend
        .update_schedule(fresh[0].id, update(&fresh[0], "11:00"))
        .await
        .expect("retry on fresh version");
    assert_eq!(retried.time, "11:00");
}

#[tokio::test]
async fn own_chat_echo_is_dropped_but_reaches_the_other_tab() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);
    let friend = friend_client(&config);

    let travel_id = make_travel(&owner).await;
    friend.join_travel(travel_id).await.expect("join");

    let owner_channel = RoomChannel::open(&config, travel_id, "jimin");
    let mut owner_rx = owner_channel.subscribe();
    let friend_channel = RoomChannel::open(&config, travel_id, "haneul");
    let mut friend_rx = friend_channel.subscribe();

    // Both presences confirm both sockets are live before anyone sends.
    wait_for(&mut owner_rx, |e| {
        matches!(e, RoomEvent::Presence { users } if users.len() == 2)
    })
    .await;
    wait_for(&mut friend_rx, |e| {
        matches!(e, RoomEvent::Presence { users } if users.len() == 2)
    })
    .await;

    let mut owner_log = ChatLog::new();
    let mut friend_log = ChatLog::new();

    let sent = owner
        .send_message(travel_id, "숙소 어디로 할까요?")
        .await
        .expect("send");
    assert!(owner_log.apply(sent.clone()));

    // The broadcast echo of the sender's own message is a duplicate.
    let echoed = wait_for(&mut owner_rx, |e| matches!(e, RoomEvent::Chat { .. })).await;
    let RoomEvent::Chat { message } = echoed else {
        unreachable!()
    };
    assert!(!owner_log.apply(message));
    assert_eq!(owner_log.len(), 1);

    // The other tab sees it exactly once.
    let received = wait_for(&mut friend_rx, |e| matches!(e, RoomEvent::Chat { .. })).await;
    let RoomEvent::Chat { message } = received else {
        unreachable!()
    };
    assert_eq!(message.message, "숙소 어디로 할까요?");
    assert!(friend_log.apply(message));
    assert_eq!(friend_log.len(), 1);

    // And the persisted history matches what both tabs show.
    let history = friend.chat_history(travel_id).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], sent);
}

/// A loopback socket with `SO_REUSEADDR`, so the port survives a server
/// restart while old connections linger in TIME_WAIT.
fn reusable_socket(port: u16) -> std::io::Result<tokio::net::TcpSocket> {
    let socket = tokio::net::TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(std::net::SocketAddr::from(([127, 0, 0, 1], port)))?;
    Ok(socket)
}

#[tokio::test]
async fn channel_reconnects_and_reannounces_presence() {
    // The first server generation runs on its own runtime so that
    // killing it also kills every live connection, not just the
    // accept loop.
    let socket = reusable_socket(0).expect("bind ephemeral port");
    let port = socket.local_addr().expect("local addr").port();
    let first_generation = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("runtime");
    first_generation.spawn(async move {
        let listener = socket.listen(64).expect("listen");
        let app = build_router(AppState::new(Config::default()));
        axum::serve(listener, app).await.expect("serve");
    });

    let mut config = SyncConfig::local(port);
    config.initial_backoff = Duration::from_millis(100);
    config.max_backoff = Duration::from_millis(500);

    let channel = RoomChannel::open(&config, 1, "jimin");
    let mut rx = channel.subscribe();
    wait_for(&mut rx, |e| {
        matches!(e, RoomEvent::Presence { users } if users.contains(&"jimin".to_string()))
    })
    .await;

    // Drop the whole first generation mid-connection.
    first_generation.shutdown_background();

    // Bring a fresh server up on the same port once it is free again.
    let listener = {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            match reusable_socket(port).and_then(|s| s.listen(64)) {
                Ok(listener) => break listener,
                Err(_) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Err(e) => panic!("could not rebind port {port}: {e}"),
            }
        }
    };
    let app = build_router(AppState::new(Config::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    // Same handle, never reopened: the driver reconnects on its own and
    // re-announces, so the fresh server's roster carries the username.
    wait_for(&mut rx, |e| {
        matches!(e, RoomEvent::Presence { users } if users.contains(&"jimin".to_string()))
    })
    .await;
    assert_ne!(channel.state(), ChannelState::Closed);
}

#[tokio::test]
async fn presence_roster_follows_connections_and_disconnects() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);

    let travel_id = make_travel(&owner).await;

    let owner_channel = RoomChannel::open(&config, travel_id, "jimin");
    let mut owner_rx = owner_channel.subscribe();
    let mut tracker = PresenceTracker::new();

    let RoomEvent::Presence { users } = wait_for(&mut owner_rx, |e| {
        matches!(e, RoomEvent::Presence { users } if users.contains(&"jimin".to_string()))
    })
    .await
    else {
        unreachable!()
    };
    tracker.apply(users);
    assert_eq!(tracker.roster(), vec!["jimin"]);

    let friend_channel = RoomChannel::open(&config, travel_id, "haneul");
    let RoomEvent::Presence { users } =
        wait_for(&mut owner_rx, |e| matches!(e, RoomEvent::Presence { users } if users.len() == 2))
            .await
    else {
        unreachable!()
    };
    tracker.apply(users);
    assert!(tracker.contains("jimin"));
    assert!(tracker.contains("haneul"));

    // Departure is derived from the dropped connection; there is no
    // explicit leave frame.
    drop(friend_channel);
    let RoomEvent::Presence { users } =
        wait_for(&mut owner_rx, |e| matches!(e, RoomEvent::Presence { users } if users.len() == 1))
            .await
    else {
        unreachable!()
    };
    tracker.apply(users);
    assert_eq!(tracker.roster(), vec!["jimin"]);
}

#[tokio::test]
async fn vote_cast_moves_and_cancels_and_broadcasts() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);
    let friend = friend_client(&config);

    let travel_id = make_travel(&owner).await;
    friend.join_travel(travel_id).await.expect("join");

    let vote = owner
        .create_vote(travel_id, "저녁 메뉴", vec!["짜장면".into(), "짬뽕".into()])
        .await
        .expect("create vote");
    let (first, second) = (vote.options[0].id, vote.options[1].id);

    let friend_channel = RoomChannel::open(&config, travel_id, "haneul");
    let mut friend_rx = friend_channel.subscribe();
    wait_for(&mut friend_rx, |e| matches!(e, RoomEvent::Presence { .. })).await;

    // First cast.
    let (_, mine) = owner.cast_vote(travel_id, first).await.expect("cast");
    assert_eq!(mine.get(&vote.id), Some(&first));
    wait_for(&mut friend_rx, |e| matches!(e, RoomEvent::VoteUpdated)).await;

    let tally = friend.votes(travel_id).await.expect("fetch votes");
    assert_eq!(tally[0].options[0].count, 1);
    assert_eq!(tally[0].options[1].count, 0);

    // Recast on the other option moves the single ballot.
    let (_, mine) = owner.cast_vote(travel_id, second).await.expect("recast");
    assert_eq!(mine.get(&vote.id), Some(&second));
    wait_for(&mut friend_rx, |e| matches!(e, RoomEvent::VoteUpdated)).await;

    let tally = friend.votes(travel_id).await.expect("fetch votes");
    assert_eq!(tally[0].options[0].count, 0);
    assert_eq!(tally[0].options[1].count, 1);

    // Same option again withdraws it.
    let (_, mine) = owner.cast_vote(travel_id, second).await.expect("cancel");
    assert!(mine.is_empty());

    let tally = friend.votes(travel_id).await.expect("fetch votes");
    assert!(tally[0].options.iter().all(|o| o.count == 0));
}

#[tokio::test]
async fn list_mutations_notify_every_subscriber() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);
    let friend = friend_client(&config);

    let travel_id = make_travel(&owner).await;

    let channel = RoomChannel::open(&config, travel_id, "jimin");
    let mut rx = channel.subscribe();
    wait_for(&mut rx, |e| matches!(e, RoomEvent::Presence { .. })).await;

    friend.join_travel(travel_id).await.expect("join");
    wait_for(&mut rx, |e| matches!(e, RoomEvent::MemberJoined)).await;

    owner
        .add_item(travel_id, "텐트", Some("장비"))
        .await
        .expect("add item");
    wait_for(&mut rx, |e| matches!(e, RoomEvent::Updated)).await;

    owner
        .create_schedule(
            travel_id,
            podo_sync::routes::schedule::ScheduleRequest {
                day: 1,
                time: "09:00".into(),
                schedule_type: "activity".into(),
                title: "광안리".into(),
                color: None,
                place_name: None,
                x: Some(129.118),
                y: Some(35.153),
                address: None,
            },
        )
        .await
        .expect("create schedule");
    wait_for(&mut rx, |e| matches!(e, RoomEvent::Updated)).await;

    owner.optimize_day(travel_id, 1).await.expect("optimize");
    wait_for(&mut rx, |e| matches!(e, RoomEvent::ScheduleOptimized)).await;
}

#[tokio::test]
async fn owner_only_mutations_map_to_forbidden() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);
    let friend = friend_client(&config);

    let travel_id = make_travel(&owner).await;
    friend.join_travel(travel_id).await.expect("join");

    let err = friend
        .update_travel(
            travel_id,
            "내 맘대로 바꾸기",
            NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
            NaiveDate::from_ymd_opt(2026, 9, 2).expect("date"),
        )
        .await
        .expect_err("non-owner edit must be refused");
    assert!(matches!(err, SyncError::Forbidden(_)));

    let err = friend
        .delete_travel(travel_id)
        .await
        .expect_err("non-owner delete must be refused");
    assert!(matches!(err, SyncError::Forbidden(_)));

    // The room is untouched.
    let travel = friend.travel(travel_id).await.expect("still there");
    assert_eq!(travel.title, "부산 여행");
}

#[tokio::test]
async fn invitation_flow_joins_on_accept() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);
    let friend = friend_client(&config);

    let travel_id = make_travel(&owner).await;

    owner
        .invite_member(travel_id, "haneul@podo.app")
        .await
        .expect("invite");

    assert_eq!(friend.unread_count().await.expect("unread"), 1);
    let notifications = friend.notifications().await.expect("list");
    assert_eq!(notifications.len(), 1);

    let joined = friend
        .accept_invitation(notifications[0].id)
        .await
        .expect("accept");
    assert_eq!(joined.travel_id, travel_id);
    assert_eq!(joined.name, "haneul");

    assert_eq!(friend.unread_count().await.expect("unread"), 0);
    let members = friend.members(travel_id).await.expect("members");
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn chat_upload_round_trips() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);

    let saved = owner
        .upload_file("map.png", vec![7u8; 128])
        .await
        .expect("upload");
    assert_eq!(saved.file_name, "map.png");

    let file_id = saved.file_url.rsplit('/').next().expect("file id");
    let data = owner.download_file(file_id).await.expect("download");
    assert_eq!(data, vec![7u8; 128]);
}

#[tokio::test]
async fn invite_code_lets_a_stranger_find_the_room() {
    let port = spawn_server().await;
    let config = SyncConfig::local(port);
    let owner = owner_client(&config);
    let friend = friend_client(&config);

    let travel_id = make_travel(&owner).await;
    let travel = owner.travel(travel_id).await.expect("fetch");

    let found = friend
        .travel_by_invite_code(&travel.invite_code)
        .await
        .expect("lookup by code");
    assert_eq!(found.travel_id, travel_id);

    let err = friend
        .travel_by_invite_code("deadbeef")
        .await
        .expect_err("bad code");
    assert!(matches!(err, SyncError::NotFound(_)));
}
