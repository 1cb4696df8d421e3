use std::collections::BTreeSet;

use crate::{object::error::OwnershipError, Owner, PeerId};

/// Whether a non-holder may force-claim the object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferPolicy {
    /// Any peer may take the object over
    Takeover,
    /// Only whitelisted peers may take the object
    Fixed,
}

/// Result of a local claim attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TakeOutcome {
    /// The claimant already held the object, nothing to propagate
    AlreadyOwned,
    /// The object was scene-owned and has been claimed
    Claimed,
    /// The object was held by another peer, who must relinquish it
    TakenOver { previous: PeerId },
    /// The object is restricted and the claimant is not whitelisted
    Denied,
}

impl TakeOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, TakeOutcome::Denied)
    }

    /// Whether other peers must be told about the new owner
    pub fn changed_owner(&self) -> bool {
        matches!(self, TakeOutcome::Claimed | TakeOutcome::TakenOver { .. })
    }
}

/// Ownership and restriction state as carried by scene-sync events
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipSnapshot {
    pub owner: Owner,
    pub epoch: u32,
    pub restricted: bool,
    pub whitelist: Vec<PeerId>,
}

/// Per-object ownership state machine.
///
/// `restricted` is orthogonal to who holds the object. The transfer policy is
/// derived from it and never stored, so `restricted == true` always means
/// [`TransferPolicy::Fixed`].
///
/// Every change of holder bumps `epoch`. Remote claims carry the claimant's
/// epoch and are only applied when they are newer than what is held locally,
/// with the higher owner winning a tie; crossing claims converge this way.
///
/// A scene-owned object can be picked up by anyone, restricted or not. A
/// peer that picks up a restricted object this way is whitelisted, so the
/// holder of a restricted object is always entitled to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipRecord {
    owner: Owner,
    epoch: u32,
    restricted: bool,
    whitelist: BTreeSet<PeerId>,
    /// The holder picked the object up from the scene at `epoch`
    claimed_from_scene: bool,
    /// That pick-up added the holder to the whitelist
    admitted_by_claim: bool,
}

impl Default for OwnershipRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnershipRecord {
    /// New records start scene-owned and unrestricted
    pub fn new() -> Self {
        Self {
            owner: Owner::Scene,
            epoch: 0,
            restricted: false,
            whitelist: BTreeSet::new(),
            claimed_from_scene: false,
            admitted_by_claim: false,
        }
    }

    pub fn from_snapshot(snapshot: &OwnershipSnapshot) -> Self {
        let mut record = Self::new();
        record.apply_snapshot(snapshot);
        record
    }

    // Queries

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn is_owned_by(&self, peer: PeerId) -> bool {
        self.owner == Owner::Peer(peer)
    }

    pub fn is_scene_owned(&self) -> bool {
        self.owner.is_scene()
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    pub fn transfer_policy(&self) -> TransferPolicy {
        if self.restricted {
            TransferPolicy::Fixed
        } else {
            TransferPolicy::Takeover
        }
    }

    pub fn whitelist(&self) -> Vec<PeerId> {
        self.whitelist.iter().copied().collect()
    }

    pub fn is_whitelisted(&self, peer: PeerId) -> bool {
        self.whitelist.contains(&peer)
    }

    pub fn can_take(&self, peer: PeerId) -> bool {
        self.owner.is_scene() || !self.restricted || self.whitelist.contains(&peer)
    }

    pub fn snapshot(&self) -> OwnershipSnapshot {
        OwnershipSnapshot {
            owner: self.owner,
            epoch: self.epoch,
            restricted: self.restricted,
            whitelist: self.whitelist(),
        }
    }

    // Transitions

    /// Local claim by `claimant`
    pub fn take(&mut self, claimant: PeerId) -> TakeOutcome {
        if self.is_owned_by(claimant) {
            return TakeOutcome::AlreadyOwned;
        }
        if !self.can_take(claimant) {
            return TakeOutcome::Denied;
        }

        let previous = self.owner;
        self.set_owner(Owner::Peer(claimant));

        match previous {
            Owner::Scene => {
                self.admit_from_scene(claimant);
                TakeOutcome::Claimed
            }
            Owner::Peer(previous) => TakeOutcome::TakenOver { previous },
        }
    }

    /// Applies a claim made by `claimant` on another peer. Returns whether the
    /// local holder changed.
    pub fn apply_transfer(
        &mut self,
        claimant: PeerId,
        epoch: u32,
    ) -> Result<bool, OwnershipError> {
        let from_scene = self.is_scene_pickup(epoch);
        if !from_scene && !self.can_take(claimant) {
            return Err(OwnershipError::NotWhitelisted { peer: claimant });
        }

        let incoming = (epoch, Owner::Peer(claimant));
        let current = (self.epoch, self.owner);
        if incoming <= current {
            return Ok(false);
        }

        // A crossing pick-up won: undo the loser's admission
        if let Owner::Peer(previous) = self.owner {
            if from_scene && self.admitted_by_claim {
                self.whitelist.remove(&previous);
            }
        }

        self.owner = Owner::Peer(claimant);
        self.epoch = epoch;
        self.claimed_from_scene = false;
        self.admitted_by_claim = false;
        if from_scene {
            self.admit_from_scene(claimant);
        }
        Ok(true)
    }

    /// Restricts the object and whitelists the caller, who must hold it.
    /// Returns `Ok(false)` if the object was already restricted.
    pub fn restrict(&mut self, caller: PeerId) -> Result<bool, OwnershipError> {
        if self.restricted {
            return Ok(false);
        }
        self.require_owner(caller, "restrict")?;

        self.restricted = true;
        self.whitelist.insert(caller);
        Ok(true)
    }

    /// Like [`Self::restrict`], but drops every other whitelisted peer first
    pub fn restrict_to(&mut self, caller: PeerId) -> Result<bool, OwnershipError> {
        if self.restricted {
            return Ok(false);
        }
        self.require_owner(caller, "restrict_to_self")?;

        self.whitelist.clear();
        self.restrict(caller)
    }

    /// Reopens the object to takeover. Returns `Ok(false)` if it was not
    /// restricted.
    pub fn unrestrict(&mut self, caller: PeerId) -> Result<bool, OwnershipError> {
        if !self.restricted {
            return Ok(false);
        }
        self.require_owner(caller, "unrestrict")?;

        self.restricted = false;
        Ok(true)
    }

    /// Authoritative replacement of the restriction state. If the object ends
    /// up restricted and its holder is not whitelisted, ownership falls back
    /// to the scene; returns whether that happened.
    pub fn set_restrictions<I: IntoIterator<Item = PeerId>>(
        &mut self,
        restricted: bool,
        whitelist: I,
    ) -> bool {
        self.restricted = restricted;
        self.whitelist = whitelist.into_iter().collect();
        self.reset_if_not_entitled()
    }

    /// Adds peers to the whitelist. Returns whether membership changed.
    pub fn whitelist_peers<I: IntoIterator<Item = PeerId>>(&mut self, peers: I) -> bool {
        let mut changed = false;
        for peer in peers {
            changed |= self.whitelist.insert(peer);
        }
        changed
    }

    /// Removes peers from the whitelist. Returns whether membership changed.
    /// A holder removed from a restricted object's whitelist loses it.
    pub fn blacklist_peers<I: IntoIterator<Item = PeerId>>(&mut self, peers: I) -> bool {
        let mut changed = false;
        for peer in peers {
            changed |= self.whitelist.remove(&peer);
        }
        if changed {
            self.reset_if_not_entitled();
        }
        changed
    }

    /// Forces the object back to the scene, e.g. when its holder left
    pub fn reset_to_scene(&mut self) -> bool {
        if self.owner.is_scene() {
            return false;
        }
        self.set_owner(Owner::Scene);
        true
    }

    pub fn apply_snapshot(&mut self, snapshot: &OwnershipSnapshot) {
        self.owner = snapshot.owner;
        self.epoch = snapshot.epoch;
        self.restricted = snapshot.restricted;
        self.whitelist = snapshot.whitelist.iter().copied().collect();
        self.claimed_from_scene = false;
        self.admitted_by_claim = false;
        self.reset_if_not_entitled();
    }

    // Private

    fn set_owner(&mut self, owner: Owner) {
        self.owner = owner;
        self.epoch = self.epoch.wrapping_add(1);
        self.claimed_from_scene = false;
        self.admitted_by_claim = false;
    }

    /// Whether a claim at `epoch` was made against the scene-owned state
    /// this record holds or has just left
    fn is_scene_pickup(&self, epoch: u32) -> bool {
        match self.owner {
            Owner::Scene => epoch == self.epoch.wrapping_add(1),
            Owner::Peer(_) => self.claimed_from_scene && epoch == self.epoch,
        }
    }

    fn admit_from_scene(&mut self, holder: PeerId) {
        self.claimed_from_scene = true;
        self.admitted_by_claim = self.restricted && self.whitelist.insert(holder);
    }

    fn reset_if_not_entitled(&mut self) -> bool {
        let Owner::Peer(holder) = self.owner else {
            return false;
        };
        if self.restricted && !self.whitelist.contains(&holder) {
            self.set_owner(Owner::Scene);
            return true;
        }
        false
    }

    fn require_owner(&self, caller: PeerId, operation: &'static str) -> Result<(), OwnershipError> {
        if self.is_owned_by(caller) {
            Ok(())
        } else {
            Err(OwnershipError::NotOwner {
                peer: caller,
                operation,
            })
        }
    }
}
