//! Region prospecting: claim, completion and release on death.
//!
//! A region moves from never prospected to in progress (claimed by one
//! character) to prospected. The only way back is the claimant dying
//! before it finishes. Commands that do not fit are dropped without
//! changing anything.

use tracing::{debug, info, warn};

use crate::block::BlockHash;
use crate::character::{Character, CharacterId, Operation};
use crate::params::EngineParams;
use crate::prizes;
use crate::region::{Region, RegionMap};
use crate::state::GameState;

/// Per-block inputs the state machine needs besides the state itself.
#[derive(Clone, Copy, Debug)]
pub struct BlockContext<'a> {
    pub height: u64,
    pub hash: &'a BlockHash,
    pub params: &'a EngineParams,
    pub map: RegionMap,
}

pub fn can_prospect_region(c: &Character, region: &Region) -> bool {
    if c.is_busy() {
        debug!(target: "prospect_core.prospecting", id = %c.id, "character is busy, can't prospect");
        return false;
    }
    if let Some(by) = region.claimant() {
        debug!(target: "prospect_core.prospecting", region = %region.id, by = %by, "region is already being prospected");
        return false;
    }
    if region.is_prospected() {
        debug!(target: "prospect_core.prospecting", region = %region.id, "region is already prospected");
        return false;
    }
    true
}

/// Claims the character's current region and starts the timed operation.
/// Returns whether anything changed.
pub fn start_prospecting(state: &mut GameState, ctx: &BlockContext<'_>, id: CharacterId) -> bool {
    let Some(c) = state.characters.get(id) else {
        return false;
    };
    let region_id = ctx.map.region_id(&c.position);
    if !can_prospect_region(c, &state.regions.get(region_id)) {
        return false;
    }

    if let Err(err) = state.regions.set_in_progress(region_id, id) {
        warn!(target: "prospect_core.prospecting", %err, "claim rejected");
        return false;
    }
    if let Err(err) = state.characters.start_operation(
        id,
        Operation::Prospecting,
        ctx.params.prospecting_blocks,
        Some(region_id),
        ctx.height,
    ) {
        warn!(target: "prospect_core.prospecting", %err, "could not start prospecting");
        state.regions.clear_claim(region_id);
        return false;
    }

    info!(
        target: "prospect_core.prospecting",
        id = %id,
        region = %region_id,
        blocks = ctx.params.prospecting_blocks,
        "started prospecting"
    );
    true
}

/// Completes the due operation of `id`: draws the prize, writes the
/// region record and clears the busy state.
pub fn finish_prospecting(state: &mut GameState, ctx: &BlockContext<'_>, id: CharacterId) {
    let Some(c) = state.characters.get(id) else {
        return;
    };
    let name = c.name.clone();
    let position = c.position;
    let region_id = c
        .busy
        .as_ref()
        .and_then(|b| b.region)
        .unwrap_or_else(|| ctx.map.region_id(&c.position));
    if state.regions.get(region_id).claimant() != Some(id) {
        warn!(target: "prospect_core.prospecting", id = %id, region = %region_id, "prospecting finished without claim");
        state.characters.finish_operation(id);
        return;
    }

    let prize = prizes::allocate(
        &ctx.params.prizes,
        &mut state.prizes,
        ctx.hash,
        region_id,
        id,
        ctx.params.prize_chance_percent(&position),
    );
    match state.regions.complete(region_id, id, &name, prize) {
        Ok(()) => info!(target: "prospect_core.prospecting", id = %id, region = %region_id, "finished prospecting"),
        Err(err) => warn!(target: "prospect_core.prospecting", %err, "prospecting finished without claim"),
    }
    state.characters.finish_operation(id);
}

/// Releases the claim of a character that is about to be removed.
pub fn cancel_prospecting(state: &mut GameState, id: CharacterId) {
    let Some(busy) = state.characters.abandon(id) else {
        return;
    };
    if busy.operation != Operation::Prospecting {
        return;
    }
    if let Some(region_id) = busy.region {
        if state.regions.get(region_id).claimant() == Some(id) {
            info!(target: "prospect_core.prospecting", id = %id, region = %region_id, "killed character was prospecting, cancelling");
            state.regions.clear_claim(region_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Faction;
    use crate::coord::HexCoord;
    use crate::region::Prospection;

    struct Fixture {
        state: GameState,
        params: EngineParams,
        hash: BlockHash,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                state: GameState::default(),
                params: EngineParams::default(),
                hash: BlockHash::from_bytes([9; 32]),
            }
        }

        fn ctx(&self, height: u64) -> BlockContext<'_> {
            BlockContext {
                height,
                hash: &self.hash,
                params: &self.params,
                map: RegionMap::new(self.params.region_size),
            }
        }

        fn spawn(&mut self, name: &str, pos: HexCoord) -> CharacterId {
            self.state.characters.create(name, Faction::Red, pos, 10)
        }

        fn start(&mut self, id: CharacterId, height: u64) -> bool {
            let ctx = BlockContext {
                height,
                hash: &self.hash,
                params: &self.params,
                map: RegionMap::new(self.params.region_size),
            };
            start_prospecting(&mut self.state, &ctx, id)
        }
    }

    #[test]
    fn second_claimant_is_ignored() {
        let mut f = Fixture::new();
        let a = f.spawn("a", HexCoord::new(0, 0));
        let b = f.spawn("b", HexCoord::new(1, 0));
        assert!(f.start(a, 1));
        assert!(!f.start(b, 1));
        assert!(f.state.characters.get(b).unwrap().busy.is_none());
        let region = f.ctx(1).map.region_id(&HexCoord::new(0, 0));
        assert_eq!(f.state.regions.get(region).claimant(), Some(a));
    }

    #[test]
    fn finishing_writes_name_and_clears_busy() {
        let mut f = Fixture::new();
        let a = f.spawn("domob", HexCoord::new(0, 0));
        assert!(f.start(a, 1));
        let hash = f.hash;
        let params = f.params.clone();
        let ctx = BlockContext {
            height: 11,
            hash: &hash,
            params: &params,
            map: RegionMap::new(params.region_size),
        };
        finish_prospecting(&mut f.state, &ctx, a);
        let region = ctx.map.region_id(&HexCoord::new(0, 0));
        match f.state.regions.get(region).prospection {
            Some(Prospection::Completed { name, .. }) => assert_eq!(name, "domob"),
            other => panic!("unexpected prospection {other:?}"),
        }
        assert!(!f.state.characters.get(a).unwrap().is_busy());
        assert!(!f.start(a, 12));
    }

    #[test]
    fn cancelling_frees_the_region() {
        let mut f = Fixture::new();
        let a = f.spawn("a", HexCoord::new(0, 0));
        let b = f.spawn("b", HexCoord::new(0, 1));
        assert!(f.start(a, 1));
        cancel_prospecting(&mut f.state, a);
        f.state.characters.remove(a);
        let region = f.ctx(2).map.region_id(&HexCoord::new(0, 0));
        assert_eq!(f.state.regions.get(region).prospection, None);
        assert!(f.start(b, 2));
    }

    #[test]
    fn prospecting_while_moving_stops_movement() {
        let mut f = Fixture::new();
        let a = f.spawn("a", HexCoord::new(0, 0));
        f.state
            .characters
            .get_mut(a)
            .unwrap()
            .waypoints
            .push_back(HexCoord::new(10, 0));
        assert!(f.start(a, 1));
        assert!(!f.state.characters.get(a).unwrap().is_moving());
    }
}
