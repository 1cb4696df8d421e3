/// PROPERTY-BASED TESTS: room-wide protocol invariants
///
/// Key invariants:
/// 1. Once the room is quiet, every peer agrees on each object's owner and
///    at most one peer believes it holds it
/// 2. The latest approved link from a source replaces every earlier one
/// 3. A restricted object never leaves its whitelist
/// 4. Peers never diverge on which objects exist

use proptest::prelude::*;

use asl_client::PeerConfig;
use asl_server::{DeliveryOrder, RelayConfig};
use asl_shared::{ObjectId, PeerId, Transform};
use asl_test::{TestRoom, CUBE, PORTAL};

const PEERS: usize = 3;

#[derive(Clone, Debug)]
enum Step {
    Claim(usize),
    Settle,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..PEERS).prop_map(Step::Claim),
        1 => Just(Step::Settle),
    ]
}

fn run_steps(room: &mut TestRoom, indices: &[usize], id: &ObjectId, steps: Vec<Step>) {
    for step in steps {
        match step {
            Step::Claim(index) => {
                room.peer_mut(indices[index]).request_ownership(id);
            }
            Step::Settle => {
                room.exchange();
            }
        }
    }
    room.exchange();
}

fn interleaved_room(seed: u64) -> TestRoom {
    TestRoom::with_config(
        RelayConfig {
            max_peers: None,
            delivery: DeliveryOrder::Interleaved { seed },
        },
        PeerConfig::default(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any mix of crossing claims converges on a single owner
    #[test]
    fn prop_single_owner_after_settling(
        seed in any::<u64>(),
        steps in prop::collection::vec(step_strategy(), 1..24),
    ) {
        let mut room = interleaved_room(seed);
        let indices: Vec<usize> = (0..PEERS).map(|_| room.join()).collect();
        room.exchange();
        let id = room.with(indices[0], |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
        room.exchange();

        run_steps(&mut room, &indices, &id, steps);

        let owners: Vec<_> = indices
            .iter()
            .map(|index| room.peer(*index).objects().owner_of(&id))
            .collect();
        prop_assert!(owners.windows(2).all(|pair| pair[0] == pair[1]), "owners diverged: {:?}", owners);

        let holders = indices
            .iter()
            .filter(|index| room.peer(**index).objects().is_owned_locally(&id))
            .count();
        prop_assert!(holders <= 1);
    }

    /// A settled restriction keeps every peer outside the whitelist away
    #[test]
    fn prop_restricted_object_stays_with_whitelist(
        seed in any::<u64>(),
        admitted in prop::collection::vec(any::<bool>(), PEERS - 1),
        steps in prop::collection::vec(step_strategy(), 1..24),
    ) {
        let mut room = interleaved_room(seed);
        let indices: Vec<usize> = (0..PEERS).map(|_| room.join()).collect();
        room.exchange();

        let whitelist: Vec<PeerId> = indices[1..]
            .iter()
            .zip(&admitted)
            .filter(|(_, admitted)| **admitted)
            .map(|(index, _)| room.peer_id(*index))
            .collect();
        let id = room
            .with(indices[0], |peer, scene| {
                peer.instantiate_owned(scene, CUBE, &Transform::identity())
            })
            .unwrap();
        prop_assert!(room.peer_mut(indices[0]).restrict_ownership(&id, &whitelist) || whitelist.is_empty());
        room.exchange();

        run_steps(&mut room, &indices, &id, steps);

        let creator = room.peer_id(indices[0]);
        for index in &indices {
            let owner = room.peer(*index).objects().owner_of(&id);
            prop_assert_eq!(owner, room.peer(indices[0]).objects().owner_of(&id));
            let holder = owner.and_then(|owner| owner.peer());
            prop_assert!(matches!(holder, Some(peer) if peer == creator || whitelist.contains(&peer)));
        }
    }

    /// Whatever order one peer links a source in, the last link wins everywhere
    #[test]
    fn prop_last_link_wins(
        seed in any::<u64>(),
        targets in prop::collection::vec(1usize..4, 1..8),
    ) {
        let mut room = interleaved_room(seed);
        let a = room.join();
        let b = room.join();
        room.exchange();

        let portals: Vec<ObjectId> = (0..4)
            .map(|_| room.with(a, |peer, scene| peer.instantiate(scene, PORTAL)).unwrap())
            .collect();
        for portal in &portals {
            prop_assert!(room.peer_mut(a).request_register(*portal));
        }
        room.exchange();

        for target in &targets {
            prop_assert!(room.peer_mut(b).request_link(portals[0], portals[*target]));
        }
        room.exchange();

        let expected = targets.last().map(|target| portals[*target]);
        prop_assert_eq!(room.peer(a).portals().destination(&portals[0]), expected);
        prop_assert_eq!(room.peer(b).portals().destination(&portals[0]), expected);
    }

    /// Concurrent creation and destruction from every peer leaves identical
    /// registries
    #[test]
    fn prop_registries_agree(
        seed in any::<u64>(),
        creations in prop::collection::vec(0..PEERS, 1..12),
        destroy_every in 2usize..4,
    ) {
        let mut room = interleaved_room(seed);
        let indices: Vec<usize> = (0..PEERS).map(|_| room.join()).collect();
        room.exchange();

        let mut created = Vec::new();
        for creator in creations {
            let id = room.with(indices[creator], |peer, scene| peer.instantiate(scene, CUBE)).unwrap();
            created.push((creator, id));
        }
        room.exchange();

        for (position, (creator, id)) in created.iter().enumerate() {
            if position % destroy_every == 0 {
                let destroyer = indices[(creator + 1) % PEERS];
                room.with(destroyer, |peer, scene| peer.destroy(scene, CUBE, id));
            }
        }
        room.exchange();

        let reference = room.peer(indices[0]).objects().registry().ids();
        for index in &indices {
            prop_assert_eq!(room.peer(*index).objects().registry().ids(), reference.clone());
            prop_assert_eq!(room.scene(*index).len(), reference.len());
        }
    }
}
