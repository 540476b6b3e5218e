//! Region map and the write-once prospection records keyed by region.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::character::CharacterId;
use crate::coord::HexCoord;
use crate::error::RegionError;
use crate::prizes::PrizeTier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Groups map tiles into square cells of `region_size` tiles per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionMap {
    region_size: u32,
}

impl RegionMap {
    pub fn new(region_size: u32) -> Self {
        Self {
            region_size: region_size.max(1),
        }
    }

    pub fn region_id(&self, pos: &HexCoord) -> RegionId {
        let size = i64::from(self.region_size);
        let cx = i64::from(pos.x).div_euclid(size) as i32 as u32;
        let cy = i64::from(pos.y).div_euclid(size) as i32 as u32;
        RegionId((u64::from(cx) << 32) | u64::from(cy))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prospection {
    InProgress {
        #[serde(rename = "inprogress")]
        in_progress: CharacterId,
    },
    Completed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prize: Option<PrizeTier>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prospection: Option<Prospection>,
}

impl Region {
    fn empty(id: RegionId) -> Self {
        Self {
            id,
            prospection: None,
        }
    }

    pub fn claimant(&self) -> Option<CharacterId> {
        match self.prospection {
            Some(Prospection::InProgress { in_progress }) => Some(in_progress),
            _ => None,
        }
    }

    pub fn is_prospected(&self) -> bool {
        matches!(self.prospection, Some(Prospection::Completed { .. }))
    }
}

/// Only regions that were ever touched are stored; everything else reads
/// back as never prospected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStore {
    regions: BTreeMap<RegionId, Region>,
}

impl RegionStore {
    pub fn get(&self, id: RegionId) -> Region {
        self.regions
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Region::empty(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn set_in_progress(
        &mut self,
        id: RegionId,
        character: CharacterId,
    ) -> Result<(), RegionError> {
        let region = self
            .regions
            .entry(id)
            .or_insert_with(|| Region::empty(id));
        match &region.prospection {
            Some(Prospection::InProgress { in_progress }) => Err(RegionError::AlreadyClaimed {
                region: id,
                by: *in_progress,
            }),
            Some(Prospection::Completed { .. }) => Err(RegionError::AlreadyProspected { region: id }),
            None => {
                region.prospection = Some(Prospection::InProgress {
                    in_progress: character,
                });
                info!(target: "prospect_core.region", region = %id, character = %character, "region claimed");
                Ok(())
            }
        }
    }

    pub fn complete(
        &mut self,
        id: RegionId,
        character: CharacterId,
        name: &str,
        prize: Option<PrizeTier>,
    ) -> Result<(), RegionError> {
        let region = self.regions.get_mut(&id);
        match region {
            Some(region) if region.claimant() == Some(character) => {
                region.prospection = Some(Prospection::Completed {
                    name: name.to_owned(),
                    prize,
                });
                info!(target: "prospect_core.region", region = %id, name, ?prize, "region prospected");
                Ok(())
            }
            _ => Err(RegionError::NotClaimedBy {
                region: id,
                character,
            }),
        }
    }

    /// Drops an in-progress claim; completed records are left alone.
    pub fn clear_claim(&mut self, id: RegionId) {
        let remove = self
            .regions
            .get(&id)
            .is_some_and(|r| r.claimant().is_some());
        if remove {
            self.regions.remove(&id);
            debug!(target: "prospect_core.region", region = %id, "claim released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_positions_share_a_region() {
        let map = RegionMap::new(16);
        let origin = HexCoord::new(-1050, 1272);
        let a = map.region_id(&origin);
        assert_eq!(a, map.region_id(&HexCoord::new(-1049, 1273)));
        assert_ne!(a, map.region_id(&HexCoord::new(-1030, 1272)));
        assert_ne!(
            map.region_id(&HexCoord::new(-1, 0)),
            map.region_id(&HexCoord::new(0, 0))
        );
    }

    #[test]
    fn claim_is_exclusive() {
        let mut store = RegionStore::default();
        let id = RegionId(7);
        store.set_in_progress(id, CharacterId(1)).unwrap();
        assert_eq!(
            store.set_in_progress(id, CharacterId(2)),
            Err(RegionError::AlreadyClaimed {
                region: id,
                by: CharacterId(1)
            })
        );
        assert_eq!(store.get(id).claimant(), Some(CharacterId(1)));
    }

    #[test]
    fn completion_requires_the_claimant() {
        let mut store = RegionStore::default();
        let id = RegionId(3);
        assert!(store.complete(id, CharacterId(1), "domob", None).is_err());
        store.set_in_progress(id, CharacterId(1)).unwrap();
        assert!(store.complete(id, CharacterId(2), "andy", None).is_err());
        store
            .complete(id, CharacterId(1), "domob", Some(PrizeTier::Silver))
            .unwrap();
        assert_eq!(
            store.get(id).prospection,
            Some(Prospection::Completed {
                name: "domob".into(),
                prize: Some(PrizeTier::Silver)
            })
        );
        assert_eq!(
            store.set_in_progress(id, CharacterId(2)),
            Err(RegionError::AlreadyProspected { region: id })
        );
    }

    #[test]
    fn clearing_deletes_the_record() {
        let mut store = RegionStore::default();
        store.set_in_progress(RegionId(1), CharacterId(5)).unwrap();
        store.clear_claim(RegionId(1));
        assert_eq!(store.get(RegionId(1)).prospection, None);
        assert_eq!(store.iter().count(), 0);

        store.set_in_progress(RegionId(2), CharacterId(5)).unwrap();
        store.complete(RegionId(2), CharacterId(5), "x", None).unwrap();
        store.clear_claim(RegionId(2));
        assert!(store.get(RegionId(2)).is_prospected());
    }
}
