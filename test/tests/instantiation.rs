use asl_client::{PeerConfig, PeerEvent};
use asl_server::RelayConfig;
use asl_shared::{ObjectId, Owner, Transform, Vector3};
use asl_test::{assert_registries_hold, TestRoom, CUBE, SPHERE};

/// Every peer ends up with the same prefab, ids and pose
#[test]
fn test_instantiation_converges() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    let c = room.join();
    room.exchange();

    let pose = Transform::from_position(Vector3::new(1.0, 2.0, 3.0));
    let id = room
        .with(a, |peer, scene| peer.instantiate_at(scene, CUBE, &pose))
        .unwrap();
    room.exchange();

    assert_registries_hold!(room, [id]);
    for index in [a, b, c] {
        let entry = room.peer(index).objects().get(&id).unwrap();
        assert_eq!(entry.prefab(), CUBE);
        assert_eq!(entry.ownership().owner(), Owner::Scene);
        let node = room.scene(index).node(&entry.handle()).unwrap();
        assert_eq!(node.transform, pose);
    }
}

/// Ids come from the creator's partition
#[test]
fn test_ids_come_from_creator_partition() {
    let mut room = TestRoom::with_config(
        RelayConfig::default(),
        PeerConfig {
            ids_per_peer: 100,
            ..PeerConfig::default()
        },
    );
    let a = room.join();
    let b = room.join();
    room.exchange();

    let first = room.with(a, |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
    let second = room.with(b, |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
    room.exchange();

    assert_eq!(first, ObjectId::new(101));
    assert_eq!(second, ObjectId::new(201));
    assert_registries_hold!(room, [first, second]);
}

/// A template with two replicable parts takes two ids, both resolving to the
/// same object
#[test]
fn test_multi_part_template() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    room.exchange();

    let id = room.with(a, |peer, scene| peer.instantiate(scene, SPHERE)).unwrap();
    room.exchange();

    let ids = room.peer(b).objects().get(&id).unwrap().ids().to_vec();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], id);
    let part = room.peer(b).objects().get(&ids[1]).unwrap();
    assert_eq!(part.id(), id);
    assert_eq!(room.scene(b).count_named(SPHERE), 1);
}

/// An unknown template spawns nothing and sends nothing
#[test]
fn test_unknown_template_is_refused() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    room.exchange();
    room.clear_events();

    assert!(room
        .with(a, |peer, scene| peer.instantiate(scene, "Teapot"))
        .is_none());
    room.exchange();

    assert!(room.scene(a).is_empty());
    assert!(room.peer(b).objects().registry().is_empty());
    assert!(room.events(b).is_empty());
}

/// The owned variant reports creation, claim and restriction in that order
#[test]
fn test_owned_instantiation_event_order() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    room.exchange();
    room.clear_events();

    let id = room
        .with(a, |peer, scene| {
            peer.instantiate_owned(scene, CUBE, &Transform::identity())
        })
        .unwrap();
    room.exchange();

    let seen: Vec<&str> = room
        .events(b)
        .iter()
        .filter_map(|event| match event {
            PeerEvent::Spawned { id: spawned, .. } if *spawned == id => Some("spawned"),
            PeerEvent::OwnerChanged { id: changed, .. } if *changed == id => Some("owner"),
            PeerEvent::RestrictionsChanged { id: changed, .. } if *changed == id => {
                Some("restrictions")
            }
            _ => None,
        })
        .collect();
    assert_eq!(seen, vec!["spawned", "owner", "restrictions"]);
}
