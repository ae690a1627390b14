use spreadview::headless::HeadlessWorld;
use spreadview::{LayoutMode, PageSource, Rect, World, layout};

const SIZES: [(u32, u32); 4] = [(4000, 3000), (2000, 3000), (1200, 1800), (3000, 3000)];

fn world_with(count: usize) -> HeadlessWorld {
    let mut world = HeadlessWorld::new(800.0);
    for (i, &(w, h)) in SIZES.iter().take(count).enumerate() {
        world.push_page(PageSource::new(format!("page-{i}")), w, h);
    }
    world
}

fn all_modes() -> Vec<LayoutMode> {
    let mut modes = Vec::new();
    for book_mode in [false, true] {
        for manga_mode in [false, true] {
            modes.push(LayoutMode {
                book_mode,
                manga_mode,
            });
        }
    }
    modes
}

fn bounds(world: &HeadlessWorld, index: usize) -> Rect {
    world.item_bounds(index).expect("item exists")
}

#[test]
fn test_first_page_always_at_origin() {
    for mode in all_modes() {
        for count in 1..=4 {
            let mut world = world_with(count);
            let spread = layout(&mut world, mode).expect("pages present");
            let first = bounds(&world, spread.first);
            assert_eq!((first.x, first.y), (0.0, 0.0), "{mode:?} with {count} pages");
        }
    }
}

#[test]
fn test_spread_pages_share_height_and_touch() {
    for mode in all_modes() {
        for count in 2..=4 {
            let mut world = world_with(count);
            let spread = layout(&mut world, mode).expect("pages present");
            let next = spread.next.expect("two pages displayed");

            let first = bounds(&world, spread.first);
            let second = bounds(&world, next);
            assert_eq!(first.height, second.height, "{mode:?} with {count} pages");
            assert_eq!(second.y, 0.0);
            // No gap and no overlap
            assert_eq!(second.x, first.right());
            assert_eq!(spread.width, first.width + second.width);
        }
    }
}

#[test]
fn test_pages_keep_their_aspect_ratio() {
    for mode in all_modes() {
        let mut world = world_with(2);
        layout(&mut world, mode);

        for (index, &(w, h)) in SIZES.iter().take(2).enumerate() {
            let b = bounds(&world, index);
            let expected = f64::from(w) / f64::from(h);
            assert!((b.width / b.height - expected).abs() < 1e-12, "{mode:?}");
        }
    }
}

#[test]
fn test_manga_swap_keeps_spread_width() {
    let mut book = world_with(2);
    let mut manga = world_with(2);

    let book_spread = layout(&mut book, LayoutMode::BOOK).expect("pages present");
    let manga_spread = layout(&mut manga, LayoutMode::MANGA_BOOK).expect("pages present");

    assert_eq!(book_spread.width, manga_spread.width);
    assert_eq!(book_spread.height, manga_spread.height);
    // Same sizes, mirrored positions
    assert_eq!(bounds(&book, 0).x, 0.0);
    assert_eq!(bounds(&manga, 1).x, 0.0);
    assert_eq!(bounds(&manga, 0).x, bounds(&manga, 1).width);
}

#[test]
fn test_manga_flag_without_book_mode_keeps_order() {
    let mut world = world_with(2);
    let mode = LayoutMode {
        book_mode: false,
        manga_mode: true,
    };

    let spread = layout(&mut world, mode).expect("pages present");
    assert_eq!(spread.first, 0);
    assert_eq!(spread.next, Some(1));
}

#[test]
fn test_layout_is_idempotent() {
    for mode in all_modes() {
        let mut world = world_with(2);
        let first_pass = layout(&mut world, mode);
        let placed: Vec<Rect> = (0..2).map(|i| bounds(&world, i)).collect();

        let second_pass = layout(&mut world, mode);
        assert_eq!(first_pass, second_pass);
        for (i, rect) in placed.iter().enumerate() {
            assert_eq!(bounds(&world, i), *rect);
        }
    }
}
