//! Wide-form hex rows.

use reach_core::UNREACH_U16;

/// Borrowed-provenance bit in a slot's `flags` byte.
pub const FLAG_BORROWED: u8 = 0b1;

/// One occupied (or sentinel) slot of a hex row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexSlot {
    /// Anchor id, `-1` when the slot is unused.
    pub anchor_id: i32,
    /// Seconds, `UNREACH_U16` when the slot is unused.
    pub seconds: u16,
    /// Bit 0 set when the slot was filled from a neighboring hex.
    pub flags: u8,
}

impl HexSlot {
    pub const EMPTY: HexSlot = HexSlot {
        anchor_id: -1,
        seconds: UNREACH_U16,
        flags: 0,
    };

    pub fn is_occupied(&self) -> bool {
        self.anchor_id >= 0
    }

    pub fn is_borrowed(&self) -> bool {
        self.flags & FLAG_BORROWED != 0
    }
}

/// One hex at one resolution with its K best anchors.
///
/// Slots are sorted ascending by `(seconds, anchor_id)`; `k` counts the
/// occupied prefix.  `prov` mirrors the borrow flags of the first eight
/// slots (the artifact schema keeps it a single byte); `flags` on each slot
/// is authoritative at any K.
#[derive(Debug, Clone)]
pub struct HexRow {
    pub h3_id: u64,
    pub res: u8,
    pub k: u8,
    pub slots: Vec<HexSlot>,
    pub prov: u8,
}

impl HexRow {
    /// Assemble a row from chosen slots, deriving `k` and `prov`.
    pub fn new(h3_id: u64, res: u8, slots: Vec<HexSlot>) -> Self {
        let k = slots.iter().filter(|s| s.is_occupied()).count() as u8;
        let mut prov = 0u8;
        for (i, slot) in slots.iter().take(8).enumerate() {
            if slot.is_occupied() && slot.is_borrowed() {
                prov |= 1 << i;
            }
        }
        Self {
            h3_id,
            res,
            k,
            slots,
            prov,
        }
    }
}
