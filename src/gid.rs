//! Global tile ids and the flip flags Tiled packs into their upper bits.

/// Tile is flipped horizontally.
pub const FLIP_H: u32 = 0x8000_0000; // bit 31
/// Tile is flipped vertically.
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
/// Tile is flipped anti-diagonally.
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
/// Hexagonal 120° rotation flag.
pub const ROTATE_120: u32 = 0x1000_0000; // bit 28
/// Mask that strips every flag bit.
pub const GID_MASK: u32 = 0x0FFF_FFFF;

/// A global tile id as stored in tile layers and tile objects.
///
/// Zero means "no tile".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    #[inline] pub fn raw(self) -> u32 { self.0 }
    #[inline] pub fn clean(self) -> u32 { self.0 & GID_MASK }
    #[inline] pub fn is_empty(self) -> bool { self.clean() == 0 }
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_flags() {
        let id = TileId(FLIP_H | FLIP_D | 42);
        assert_eq!(id.clean(), 42);
        assert!(id.flip_h());
        assert!(!id.flip_v());
        assert!(id.flip_d());
        assert!(TileId(FLIP_V).is_empty());
    }
}
