//! Page placement in world space
//!
//! Shows one page at the origin, or two pages side by side with equal
//! heights. Manga reading order is produced by swapping which loaded item is
//! placed first, so placement itself is always left to right.

use log::{debug, warn};

use crate::engine::World;
use crate::geometry::Point;

/// Display mode flags read from the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutMode {
    /// Two pages side by side
    pub book_mode: bool,
    /// Right-to-left reading order
    pub manga_mode: bool,
}

impl LayoutMode {
    pub const SINGLE: LayoutMode = LayoutMode {
        book_mode: false,
        manga_mode: false,
    };

    pub const BOOK: LayoutMode = LayoutMode {
        book_mode: true,
        manga_mode: false,
    };

    pub const MANGA_BOOK: LayoutMode = LayoutMode {
        book_mode: true,
        manga_mode: true,
    };

    fn mirrored(self) -> bool {
        self.book_mode && self.manga_mode
    }

    /// Index of the leftmost displayed item
    #[must_use]
    pub fn first_index(self, item_count: usize) -> usize {
        if self.mirrored() && item_count > 1 { 1 } else { 0 }
    }

    /// Index of the item placed right of the first one
    #[must_use]
    pub fn next_index(self) -> usize {
        if self.mirrored() { 0 } else { 1 }
    }
}

/// Summary of a layout pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spread {
    pub first: usize,
    pub next: Option<usize>,
    /// Total displayed width
    pub width: f64,
    /// Shared page height
    pub height: f64,
}

/// Position the displayed pages of `world` for `mode`.
///
/// Returns `None` when the world is empty. Items other than the first and
/// next ones are left where they are.
pub fn layout<W: World + ?Sized>(world: &mut W, mode: LayoutMode) -> Option<Spread> {
    let count = world.item_count();
    if count == 0 {
        return None;
    }

    let first = mode.first_index(count);
    let Some(mut first_bounds) = world.item_bounds(first) else {
        warn!("Layout: no bounds for item {first} of {count}");
        return None;
    };

    if count == 1 {
        world.set_item_position(first, Point::ORIGIN);
        return Some(Spread {
            first,
            next: None,
            width: first_bounds.width,
            height: first_bounds.height,
        });
    }

    let next = mode.next_index();
    let Some(mut next_bounds) = world.item_bounds(next) else {
        warn!("Layout: no bounds for item {next} of {count}");
        return None;
    };

    // Only the shorter page grows
    if first_bounds.height > next_bounds.height {
        world.set_item_height(next, first_bounds.height);
        next_bounds = world.item_bounds(next)?;
    } else if next_bounds.height > first_bounds.height {
        world.set_item_height(first, next_bounds.height);
        first_bounds = world.item_bounds(first)?;
    }

    let mut cursor = Point::ORIGIN;
    world.set_item_position(first, cursor);
    cursor.x += first_bounds.width;
    world.set_item_position(next, cursor);
    cursor.x += next_bounds.width;

    debug!(
        "Layout: items {first} and {next} ({mode:?}), spread {:.3}x{:.3}",
        cursor.x, first_bounds.height
    );

    Some(Spread {
        first,
        next: Some(next),
        width: cursor.x,
        height: first_bounds.height,
    })
}
