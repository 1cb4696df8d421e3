use std::io::{self, Cursor, Read};

use asl_client::{AslClientError, PeerEvent};
use asl_shared::{Owner, Vector3};
use asl_test::{TestRoom, CUBE, WORLD};

/// Worlds are stacked along the up axis and announced to everyone
#[test]
fn test_worlds_are_stacked_and_announced() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    room.exchange();

    let first = room.with(a, |peer, scene| peer.create_world(scene, WORLD)).unwrap();
    let second = room.with(a, |peer, scene| peer.create_world(scene, WORLD)).unwrap();
    room.exchange();

    let heights: Vec<Vector3> = [first, second]
        .iter()
        .map(|world| {
            let handle = room.peer(b).objects().handle_of(world).unwrap();
            room.scene(b).node(&handle).unwrap().transform.position
        })
        .collect();
    assert_eq!(heights[0], Vector3::zero());
    assert_eq!(heights[1], Vector3::new(0.0, 1000.0, 0.0));

    assert_eq!(room.peer(b).worlds().world_ids(), vec![first, second]);
    let peer_a = Owner::Peer(room.peer_id(a));
    assert_eq!(room.peer(b).objects().owner_of(&first), Some(peer_a));
}

/// Adding an object to a world re-parents it on every peer
#[test]
fn test_add_to_world_reparents_everywhere() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    room.exchange();

    let world = room.with(a, |peer, scene| peer.create_world(scene, WORLD)).unwrap();
    let cube = room.with(b, |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
    room.exchange();

    assert!(room.with(b, |peer, scene| peer.add_to_world(scene, world, cube)));
    room.exchange();

    for index in [a, b] {
        let objects = room.peer(index).objects();
        let cube_handle = objects.handle_of(&cube).unwrap();
        let world_handle = objects.handle_of(&world).unwrap();
        assert_eq!(
            room.scene(index).node(&cube_handle).unwrap().parent,
            Some(world_handle)
        );
        assert_eq!(room.peer(index).worlds().world_of(&cube), Some(world));
    }
    assert_eq!(
        room.peer(a).worlds().world_by_name(room.peer(a).objects(), WORLD),
        Some(world)
    );
}

/// An object belongs to one world at a time
#[test]
fn test_moving_to_another_world_leaves_the_first() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    room.exchange();

    let first = room.with(a, |peer, scene| peer.create_world(scene, WORLD)).unwrap();
    let second = room.with(a, |peer, scene| peer.create_world(scene, WORLD)).unwrap();
    let cube = room.with(a, |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
    assert!(room.with(a, |peer, scene| peer.add_to_world(scene, first, cube)));
    room.exchange();

    assert!(room.with(b, |peer, scene| peer.add_to_world(scene, second, cube)));
    room.exchange();

    for index in [a, b] {
        let objects = room.peer(index).objects();
        let cube_handle = objects.handle_of(&cube).unwrap();
        let second_handle = objects.handle_of(&second).unwrap();
        assert_eq!(
            room.scene(index).node(&cube_handle).unwrap().parent,
            Some(second_handle)
        );
        assert_eq!(room.peer(index).worlds().world_of(&cube), Some(second));
    }
}

/// Adding to something that is not a world changes nothing
#[test]
fn test_add_to_non_world_is_refused() {
    let mut room = TestRoom::new();
    let a = room.join();
    room.exchange();

    let cube = room.with(a, |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
    let other = room.with(a, |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
    assert!(!room.with(a, |peer, scene| peer.add_to_world(scene, other, cube)));
}

/// Destroying a world detaches its members
#[test]
fn test_destroyed_world_releases_members() {
    let mut room = TestRoom::new();
    let a = room.join();
    let b = room.join();
    room.exchange();

    let world = room.with(a, |peer, scene| peer.create_world(scene, WORLD)).unwrap();
    let cube = room.with(a, |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
    assert!(room.with(a, |peer, scene| peer.add_to_world(scene, world, cube)));
    room.exchange();

    assert!(room.with(a, |peer, scene| peer.destroy_object(scene, &world)));
    room.exchange();

    for index in [a, b] {
        let handle = room.peer(index).objects().handle_of(&cube).unwrap();
        assert_eq!(room.scene(index).node(&handle).unwrap().parent, None);
        assert!(room.peer(index).worlds().world_ids().is_empty());
        assert_eq!(room.peer(index).worlds().world_of(&cube), None);
    }
}

/// A bulk transfer completes in the background and is reported by receive
#[test]
fn test_bulk_transfer_is_reported() {
    let mut room = TestRoom::new();
    let a = room.join();
    room.exchange();

    let mesh: Vec<u8> = (0..=255).collect();
    room.peer_mut(a)
        .start_bulk_transfer("room-mesh", Cursor::new(mesh.clone()));
    assert_eq!(room.peer(a).bulk_transfers_in_flight(), 1);

    assert_eq!(room.peer_mut(a).wait_bulk_transfers(), 1);
    room.exchange();

    assert_eq!(room.peer(a).bulk_transfers_in_flight(), 0);
    assert!(room.events(a).contains(&PeerEvent::BulkReceived {
        key: "room-mesh".to_string(),
        bytes: mesh,
    }));
}

struct BrokenSource;

impl Read for BrokenSource {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
    }
}

#[test]
fn test_failed_bulk_transfer_is_an_error_event() {
    let mut room = TestRoom::new();
    let a = room.join();
    room.exchange();

    room.peer_mut(a).start_bulk_transfer("broken", BrokenSource);
    room.peer_mut(a).wait_bulk_transfers();
    room.exchange();

    assert!(room.events(a).iter().any(|event| matches!(
        event,
        PeerEvent::Error(AslClientError::BulkTransferFailed { key, .. }) if key == "broken"
    )));
}
