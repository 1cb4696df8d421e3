use asl_server::{DeliveryOrder, Relay, RelayConfig, RelayError, RelaySession};
use asl_shared::{
    AslEvent, ObjectId, PeerId, RaiseOptions, Receivers, Session, SessionMessage, Timestamp,
    TransportError,
};

fn destroy(id: u32) -> AslEvent {
    AslEvent::Destroy {
        name: "Cube".to_string(),
        id: ObjectId::new(id),
        timestamp: Timestamp::default(),
    }
}

fn drain(session: &mut RelaySession) -> Vec<SessionMessage> {
    std::iter::from_fn(|| session.receive().expect("session should be connected")).collect()
}

fn events_from(messages: &[SessionMessage], from: PeerId) -> Vec<u32> {
    messages
        .iter()
        .filter_map(|message| match message {
            SessionMessage::Event {
                sender,
                event: AslEvent::Destroy { id, .. },
            } if *sender == from => Some(id.value()),
            _ => None,
        })
        .collect()
}

fn interleaved(seed: u64) -> Relay {
    Relay::new(RelayConfig {
        max_peers: None,
        delivery: DeliveryOrder::Interleaved { seed },
    })
}

#[test]
fn test_first_peer_is_master() {
    asl_test::init_logging();
    let relay = Relay::default();
    let a = relay.connect().unwrap();
    let b = relay.connect().unwrap();

    assert_eq!(a.local_peer(), Some(PeerId::new(1)));
    assert_eq!(b.local_peer(), Some(PeerId::new(2)));
    assert!(a.is_master());
    assert!(!b.is_master());
    assert_eq!(relay.master(), Some(PeerId::new(1)));
}

#[test]
fn test_receivers_select_peers() {
    let relay = Relay::default();
    let mut a = relay.connect().unwrap();
    let mut b = relay.connect().unwrap();
    let mut c = relay.connect().unwrap();
    drain(&mut a);
    drain(&mut b);
    drain(&mut c);

    b.raise_event(destroy(1), RaiseOptions::to(Receivers::Others)).unwrap();
    b.raise_event(destroy(2), RaiseOptions::to(Receivers::All)).unwrap();
    b.raise_event(destroy(3), RaiseOptions::to(Receivers::Master)).unwrap();
    b.raise_event(
        destroy(4),
        RaiseOptions::to(Receivers::Targets(vec![PeerId::new(3), PeerId::new(9)])),
    )
    .unwrap();

    let sender = PeerId::new(2);
    assert_eq!(events_from(&drain(&mut a), sender), vec![1, 2, 3]);
    assert_eq!(events_from(&drain(&mut b), sender), vec![2]);
    assert_eq!(events_from(&drain(&mut c), sender), vec![1, 2, 4]);
}

#[test]
fn test_master_receives_its_own_master_events() {
    let relay = Relay::default();
    let mut a = relay.connect().unwrap();
    drain(&mut a);

    a.raise_event(AslEvent::Join, RaiseOptions::to(Receivers::Master)).unwrap();
    assert_eq!(
        drain(&mut a),
        vec![SessionMessage::Event {
            sender: PeerId::new(1),
            event: AslEvent::Join,
        }]
    );
}

/// Events from one sender arrive in order even when senders interleave
#[test]
fn test_per_sender_order_survives_interleaving() {
    for seed in 0..8 {
        let relay = interleaved(seed);
        let mut a = relay.connect().unwrap();
        let mut b = relay.connect().unwrap();
        let mut c = relay.connect().unwrap();
        drain(&mut c);

        for id in 0..50 {
            a.raise_event(destroy(1000 + id), RaiseOptions::to(Receivers::Others)).unwrap();
            b.raise_event(destroy(2000 + id), RaiseOptions::to(Receivers::Others)).unwrap();
        }

        let received = drain(&mut c);
        let from_a = events_from(&received, PeerId::new(1));
        let from_b = events_from(&received, PeerId::new(2));
        assert_eq!(from_a, (1000..1050).collect::<Vec<_>>());
        assert_eq!(from_b, (2000..2050).collect::<Vec<_>>());
    }
}

/// Cached events reach a later joiner ahead of anything live
#[test]
fn test_cache_is_replayed_first() {
    let relay = interleaved(7);
    let mut a = relay.connect().unwrap();
    a.raise_event(destroy(1), RaiseOptions::to(Receivers::Others).cached())
        .unwrap();
    a.raise_event(destroy(2), RaiseOptions::to(Receivers::Others).cached())
        .unwrap();
    a.raise_event(destroy(3), RaiseOptions::to(Receivers::Others))
        .unwrap();
    assert_eq!(relay.cached_events(), 2);

    let mut b = relay.connect().unwrap();
    a.raise_event(destroy(4), RaiseOptions::to(Receivers::Others))
        .unwrap();

    let received = drain(&mut b);
    assert_eq!(events_from(&received, PeerId::new(1)), vec![1, 2, 4]);
    assert_eq!(
        received[0],
        SessionMessage::Event {
            sender: PeerId::new(1),
            event: destroy(1),
        }
    );
}

/// When the master leaves, the lowest remaining actor takes over and
/// everyone is told
#[test]
fn test_master_hand_off() {
    let relay = Relay::default();
    let mut a = relay.connect().unwrap();
    let mut b = relay.connect().unwrap();
    let mut c = relay.connect().unwrap();
    drain(&mut b);
    drain(&mut c);

    a.leave().unwrap();
    assert_eq!(relay.master(), Some(PeerId::new(2)));
    assert!(b.is_master());

    let expected = vec![
        SessionMessage::PeerLeft(PeerId::new(1)),
        SessionMessage::MasterChanged(PeerId::new(2)),
    ];
    assert_eq!(drain(&mut b), expected);
    assert_eq!(drain(&mut c), expected);
}

#[test]
fn test_departed_session_is_disconnected() {
    let relay = Relay::default();
    let mut a = relay.connect().unwrap();
    let _b = relay.connect().unwrap();

    a.leave().unwrap();
    assert!(!a.is_connected());
    assert_eq!(
        a.raise_event(destroy(1), RaiseOptions::to(Receivers::All)),
        Err(TransportError::NotConnected)
    );
    assert_eq!(a.receive(), Err(TransportError::NotConnected));
    assert!(matches!(
        relay.disconnect(PeerId::new(1)),
        Err(RelayError::UnknownPeer { .. })
    ));
}

#[test]
fn test_room_capacity() {
    let relay = Relay::new(RelayConfig {
        max_peers: Some(2),
        delivery: DeliveryOrder::Arrival,
    });
    let _a = relay.connect().unwrap();
    let b = relay.connect().unwrap();

    assert!(matches!(
        relay.connect(),
        Err(RelayError::RoomFull { max: 2 })
    ));

    relay.disconnect(b.local_peer().unwrap()).unwrap();
    let c = relay.connect().unwrap();
    assert_eq!(c.local_peer(), Some(PeerId::new(3)));
}
