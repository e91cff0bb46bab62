//! Pure drop-geometry arithmetic, independent of any input system.

use serde::{Deserialize, Serialize};

use crate::foundation::error::{CardError, CardResult};

/// Fraction of the target height that forms the leading and trailing bands.
pub const EDGE_BAND: f64 = 0.3;

/// Where a dragged item lands relative to its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
    /// Appended as the last child of a container.
    Inside,
}

/// Drop position for a pointer at `pointer_y` over a target spanning
/// `[target_top, target_top + target_height)`, using [`EDGE_BAND`].
pub fn drop_position(
    pointer_y: f64,
    target_top: f64,
    target_height: f64,
    accepts_children: bool,
) -> CardResult<DropPosition> {
    drop_position_in_band(
        pointer_y,
        target_top,
        target_height,
        accepts_children,
        EDGE_BAND,
    )
}

/// [`drop_position`] with an explicit edge band.
///
/// The leading `band` of the height is `Before`, the trailing `band` is `After`. The middle
/// band is `Inside` for containers and otherwise split at the midpoint.
pub fn drop_position_in_band(
    pointer_y: f64,
    target_top: f64,
    target_height: f64,
    accepts_children: bool,
    band: f64,
) -> CardResult<DropPosition> {
    if !pointer_y.is_finite() || !target_top.is_finite() || !target_height.is_finite() {
        return Err(CardError::drag("drop geometry must be finite"));
    }
    if target_height <= 0.0 {
        return Err(CardError::drag(format!(
            "drop target has no height ({target_height})"
        )));
    }
    if !band.is_finite() || !(0.0..0.5).contains(&band) {
        return Err(CardError::drag(format!("edge band {band} outside [0, 0.5)")));
    }

    let relative_y = pointer_y - target_top;
    let threshold = band * target_height;
    if relative_y < threshold {
        return Ok(DropPosition::Before);
    }
    if relative_y > target_height - threshold {
        return Ok(DropPosition::After);
    }
    if accepts_children {
        return Ok(DropPosition::Inside);
    }
    if relative_y < target_height / 2.0 {
        Ok(DropPosition::Before)
    } else {
        Ok(DropPosition::After)
    }
}

/// Index to insert at within the target's list.
///
/// `After` lands one past the target. When the dragged item comes from the same list
/// (`source_index` is set) and sits before the landing slot, the index shifts down by one to
/// account for the source being removed first. `Inside` keeps the target index; containers
/// append instead.
pub fn insertion_index(
    target_index: usize,
    position: DropPosition,
    source_index: Option<usize>,
) -> usize {
    let base = match position {
        DropPosition::After => target_index + 1,
        DropPosition::Before | DropPosition::Inside => target_index,
    };
    match source_index {
        Some(source) if base > source => base - 1,
        _ => base,
    }
}

/// Move the item at `from` to `to` (an index into the list after removal).
///
/// An out-of-range `from` returns an equal list; `to` is clamped.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = list.to_vec();
    if from >= out.len() {
        return out;
    }
    let item = out.remove(from);
    let to = to.min(out.len());
    out.insert(to, item);
    out
}

#[cfg(test)]
#[path = "../../tests/unit/drag/geometry.rs"]
mod tests;
