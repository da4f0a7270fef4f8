//! Layout planning for the receipt image.
//!
//! One counting pass over the groups produces a plain-data [`LayoutPlan`]:
//! every y coordinate the rasterizer will use, the final canvas height and
//! the truncation flag. The rasterizer consumes the plan read-only, so both
//! phases see exactly the same rows and the output dimensions are
//! deterministic for a given cart.

use crate::cart::Group;

// Fixed receipt geometry, in pixels.
pub const WIDTH: u32 = 420;
pub const MARGIN: i32 = 24;
pub const ITEM_LINE: i32 = 30;
pub const HEADER_LINE: i32 = 36;
pub const TITLE_HEIGHT: i32 = 64;
pub const TITLE_GAP: i32 = 26;
pub const HEADER_GAP: i32 = 6;
pub const NOTE_LINE: i32 = 18;
pub const GROUP_GAP: i32 = 4;
pub const TOTAL_BLOCK: i32 = 40;
pub const FOOTER_BLOCK: i32 = 40;

/// Item and note lines rendered before the list is cut off.
pub const MAX_LINES: usize = 200;

/// One item row: where it starts and whether its note line made the cut.
#[derive(Clone, Copy, Debug)]
pub struct RowPlan {
    /// Index into the group's `items`.
    pub item: usize,
    /// Top of the 30px item row.
    pub y: i32,
    /// True when the item's non-empty note is printed beneath it.
    pub note: bool,
}

#[derive(Clone, Debug)]
pub struct GroupPlan {
    /// Index into the normalized group list.
    pub group: usize,
    /// Top of the 36px header band.
    pub header_y: i32,
    pub rows: Vec<RowPlan>,
}

#[derive(Clone, Debug)]
pub struct LayoutPlan {
    pub width: u32,
    pub height: u32,
    /// y where the grand-total row starts (below the last content line).
    pub total_y: i32,
    /// True iff at least one printable line fell past [`MAX_LINES`].
    pub truncated: bool,
    pub groups: Vec<GroupPlan>,
}

/// Compute the full geometry plan for `groups`.
///
/// An empty group list still yields a valid near-empty receipt: title block,
/// total block and footer only.
pub fn plan(groups: &[Group]) -> LayoutPlan {
    let mut y = MARGIN + TITLE_HEIGHT + TITLE_GAP;
    let mut printed = 0usize;
    let mut truncated = false;
    let mut planned = Vec::with_capacity(groups.len());

    for (gi, group) in groups.iter().enumerate() {
        if printed >= MAX_LINES {
            // Normalized groups are never empty, so anything left is cut off.
            truncated = true;
            break;
        }

        let header_y = y;
        y += HEADER_LINE + HEADER_GAP;

        let mut rows = Vec::with_capacity(group.items.len());
        for (i, item) in group.items.iter().enumerate() {
            if printed >= MAX_LINES {
                truncated = true;
                break;
            }
            let row_y = y;
            y += ITEM_LINE;
            printed += 1;

            let mut note = false;
            if !item.note.is_empty() {
                if printed < MAX_LINES {
                    y += NOTE_LINE;
                    printed += 1;
                    note = true;
                } else {
                    // The note would be the line past the cap: neither
                    // measured nor drawn.
                    truncated = true;
                }
            }
            rows.push(RowPlan { item: i, y: row_y, note });
        }

        y += GROUP_GAP;
        planned.push(GroupPlan { group: gi, header_y, rows });
    }

    LayoutPlan {
        width: WIDTH,
        height: (y + TOTAL_BLOCK + FOOTER_BLOCK) as u32,
        total_y: y,
        truncated,
        groups: planned,
    }
}
