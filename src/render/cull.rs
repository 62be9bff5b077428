use crate::command::CellRegion;
use macroquad::prelude::*;

const CULL_MARGIN_CELLS: i32 = 1;

/// Cells of a `width` x `height` map that touch the world-pixel rectangle
/// `view_min..view_max`, padded by one cell so that sprites reaching into the
/// view from outside (tall trees, offset lamps) are still drawn.
pub fn visible_cells_rect(
    view_min: Vec2,
    view_max: Vec2,
    tile_size: f32,
    width: u32,
    height: u32,
) -> CellRegion {
    let ts = tile_size.max(1.0);
    let mut cx_min = (view_min.x / ts).floor() as i32;
    let mut cy_min = (view_min.y / ts).floor() as i32;
    let mut cx_max = (view_max.x / ts).floor() as i32;
    let mut cy_max = (view_max.y / ts).floor() as i32;

    if cx_min > cx_max {
        std::mem::swap(&mut cx_min, &mut cx_max);
    }
    if cy_min > cy_max {
        std::mem::swap(&mut cy_min, &mut cy_max);
    }

    cx_min -= CULL_MARGIN_CELLS;
    cy_min -= CULL_MARGIN_CELLS;
    cx_max += CULL_MARGIN_CELLS;
    cy_max += CULL_MARGIN_CELLS;

    let (w, h) = (width.min(i32::MAX as u32) as i32, height.min(i32::MAX as u32) as i32);
    CellRegion {
        x0: cx_min.clamp(0, w),
        y0: cy_min.clamp(0, h),
        x1: (cx_max + 1).clamp(0, w),
        y1: (cy_max + 1).clamp(0, h),
    }
}

/// World-pixel rectangle a `Camera2D` shows. Rotation is ignored.
pub fn camera_view_rect(cam: &Camera2D) -> Rect {
    // Camera2D maps the view onto -1..1 on both axes.
    let half_w = 1.0 / cam.zoom.x.abs().max(f32::EPSILON);
    let half_h = 1.0 / cam.zoom.y.abs().max(f32::EPSILON);
    let min = cam.target - vec2(half_w, half_h);
    Rect::new(min.x, min.y, half_w * 2.0, half_h * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_is_padded_by_one_cell_and_clamped() {
        let r = visible_cells_rect(vec2(32.0, 32.0), vec2(63.0, 47.0), 16.0, 10, 10);
        assert_eq!(r, CellRegion { x0: 1, y0: 1, x1: 5, y1: 4 });

        let r = visible_cells_rect(vec2(-100.0, -100.0), vec2(10_000.0, 5.0), 16.0, 10, 10);
        assert_eq!(r, CellRegion { x0: 0, y0: 0, x1: 10, y1: 2 });
    }

    #[test]
    fn swapped_corners_are_normalised() {
        let a = visible_cells_rect(vec2(0.0, 0.0), vec2(40.0, 40.0), 16.0, 8, 8);
        let b = visible_cells_rect(vec2(40.0, 40.0), vec2(0.0, 0.0), 16.0, 8, 8);
        assert_eq!(a, b);
    }

    #[test]
    fn view_entirely_off_the_map_is_empty() {
        let r = visible_cells_rect(vec2(500.0, 0.0), vec2(600.0, 10.0), 16.0, 4, 4);
        assert!(r.is_empty());
    }

    #[test]
    fn camera_rect_is_centred_on_target() {
        let cam = Camera2D {
            target: vec2(100.0, 50.0),
            zoom: vec2(1.0 / 80.0, 1.0 / 40.0),
            ..Default::default()
        };
        let r = camera_view_rect(&cam);
        assert!((r.x - 20.0).abs() < 1e-3 && (r.y - 10.0).abs() < 1e-3);
        assert!((r.w - 160.0).abs() < 1e-3 && (r.h - 80.0).abs() < 1e-3);
    }

    #[test]
    fn region_iterates_rows_top_to_bottom() {
        let r = CellRegion { x0: 1, y0: 0, x1: 3, y1: 2 };
        let cells: Vec<_> = r.iter().collect();
        assert_eq!(cells, [(1, 0), (2, 0), (1, 1), (2, 1)]);
    }
}
