use std::fmt;

use serde::{Deserialize, Serialize};

/// Axial coordinate on the hex map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HexCoord {
    pub x: i32,
    pub y: i32,
}

const NEIGHBOUR_OFFSETS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

impl HexCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &HexCoord) -> u64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        (dx.unsigned_abs() + dy.unsigned_abs() + (dx + dy).unsigned_abs()) / 2
    }

    /// Adjacent tiles; those beyond the `i32` range are left out.
    pub fn neighbours(&self) -> impl Iterator<Item = HexCoord> + '_ {
        NEIGHBOUR_OFFSETS.iter().filter_map(move |(dx, dy)| {
            Some(HexCoord::new(self.x.checked_add(*dx)?, self.y.checked_add(*dy)?))
        })
    }

    /// Next tile on a greedy path to `target`. Ties go to the first
    /// neighbour in offset order so the result never depends on anything
    /// but the two coordinates.
    pub fn step_towards(&self, target: &HexCoord) -> HexCoord {
        if self == target {
            return *self;
        }
        let mut best = *self;
        let mut best_dist = u64::MAX;
        for n in self.neighbours() {
            let d = n.distance(target);
            if d < best_dist {
                best = n;
                best_dist = d;
            }
        }
        best
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_hex_metric() {
        let a = HexCoord::new(0, 0);
        assert_eq!(a.distance(&HexCoord::new(3, 0)), 3);
        assert_eq!(a.distance(&HexCoord::new(2, -2)), 2);
        assert_eq!(a.distance(&HexCoord::new(2, 2)), 4);
        assert_eq!(HexCoord::new(-5, 7).distance(&a), a.distance(&HexCoord::new(-5, 7)));
    }

    #[test]
    fn stepping_reaches_target() {
        let target = HexCoord::new(-4, 9);
        let mut pos = HexCoord::new(3, -2);
        let start = pos.distance(&target);
        for _ in 0..start {
            let next = pos.step_towards(&target);
            assert_eq!(next.distance(&target) + 1, pos.distance(&target));
            pos = next;
        }
        assert_eq!(pos, target);
        assert_eq!(pos.step_towards(&target), target);
    }

    #[test]
    fn stepping_at_the_coordinate_edges() {
        let corner = HexCoord::new(i32::MAX, i32::MIN);
        assert_eq!(corner.neighbours().count(), 3);

        let origin = HexCoord::new(0, 0);
        let next = corner.step_towards(&origin);
        assert_eq!(next.distance(&origin) + 1, corner.distance(&origin));

        let edge = HexCoord::new(i32::MAX, 0);
        assert_eq!(edge.step_towards(&origin), HexCoord::new(i32::MAX - 1, 0));
        let far = HexCoord::new(i32::MIN, 0);
        assert_eq!(far.step_towards(&origin), HexCoord::new(i32::MIN + 1, 0));
        assert_eq!(far.distance(&edge), u64::from(u32::MAX));
    }
}
