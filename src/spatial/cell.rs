/// Bit layout of a packed grid cell:
///
/// ```text
///  31            16 15             0
/// +----------------+----------------+
/// | metadata slot  |  ID-table index|
/// +----------------+----------------+
/// ```
///
/// The slot is 1-based; `0` means the cell carries no metadata.
pub const INDEX_MASK: u32 = 0x0000_FFFF; // bits 0..16
pub const SLOT_MASK: u32 = 0xFFFF_0000; // bits 16..32
pub const SLOT_SHIFT: u32 = 16;

/// Largest ID-table index a cell can address.
pub const MAX_TABLE_INDEX: usize = 0xFFFF;
/// Largest metadata slot a cell can address.
pub const MAX_SLOT: usize = 0xFFFF;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PackedCell(pub u32);

impl PackedCell {
    /// Index 0 ("empty" tile), no metadata.
    pub const EMPTY: PackedCell = PackedCell(0);

    #[inline]
    pub fn new(index: u16, slot: u16) -> Self {
        PackedCell(((slot as u32) << SLOT_SHIFT) | index as u32)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> u16 {
        (self.0 & INDEX_MASK) as u16
    }

    #[inline]
    pub fn slot(self) -> u16 {
        ((self.0 & SLOT_MASK) >> SLOT_SHIFT) as u16
    }

    #[inline]
    pub fn has_metadata(self) -> bool {
        (self.0 & SLOT_MASK) != 0
    }

    #[inline]
    pub fn with_slot(self, slot: u16) -> Self {
        PackedCell((self.0 & INDEX_MASK) | ((slot as u32) << SLOT_SHIFT))
    }

    #[inline]
    pub fn with_index(self, index: u16) -> Self {
        PackedCell((self.0 & SLOT_MASK) | index as u32)
    }
}
