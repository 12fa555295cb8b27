//! Frame renderer for the live map. Every call clears the surface and redraws it from the
//! scene; nothing is carried over between frames.

use shared::domain::Point;

use crate::scene::SceneModel;

pub const GRID_SPACING: f64 = 50.0;
pub const GRID_LINE_WIDTH: f64 = 1.0;
pub const PATH_LINE_WIDTH: f64 = 4.0;
pub const PATH_DOT_RADIUS: f64 = 3.0;
pub const MARKER_OUTER_RADIUS: f64 = 10.0;
pub const MARKER_INNER_RADIUS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::hex(0xffffff);

    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub grid: Color,
    pub wall: Color,
    pub path: Color,
    pub task_outer: Color,
    pub task_inner: Color,
    pub robot_outer: Color,
    pub robot_inner: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            grid: Color::hex(0xe9ecef),
            wall: Color::hex(0x6c757d),
            path: Color::hex(0x3513e1),
            task_outer: Color::hex(0x28a745),
            task_inner: Color::WHITE,
            robot_outer: Color::hex(0xdc3545),
            robot_inner: Color::WHITE,
        }
    }
}

/// Pixel size of a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Screen-space rectangle occupied by the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub min: Point,
    pub size: Viewport,
}

impl ScreenRect {
    pub fn contains(&self, pos: Point) -> bool {
        pos.x >= self.min.x
            && pos.y >= self.min.y
            && pos.x < self.min.x + self.size.width
            && pos.y < self.min.y + self.size.height
    }
}

/// The drawing surface's own dimensions, kept equal to its container's.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawingSurface {
    size: Viewport,
}

impl DrawingSurface {
    pub fn size(&self) -> Viewport {
        self.size
    }

    /// Adopts the container's current client size. Returns true when it changed.
    pub fn fit_to(&mut self, container: Viewport) -> bool {
        if self.size == container {
            return false;
        }
        self.size = container;
        true
    }
}

/// Screen-space drawing primitives. Implemented over egui's painter in the desktop app.
pub trait Canvas {
    fn viewport(&self) -> Viewport;
    fn clear(&mut self);
    fn line(&mut self, from: Point, to: Point, width: f64, color: Color);
    fn polyline(&mut self, points: &[Point], width: f64, color: Color);
    fn fill_rect(&mut self, min: Point, width: f64, height: f64, color: Color);
    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);
}

/// What a frame ended up drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub skipped: bool,
    pub grid_lines: usize,
    pub walls: usize,
    pub path_vertices: usize,
    pub task_marker: bool,
    pub robot_marker: bool,
}

impl FrameReport {
    pub fn marker_layers(&self) -> usize {
        usize::from(self.path_vertices > 0)
            + usize::from(self.task_marker)
            + usize::from(self.robot_marker)
    }
}

/// Screen positions of grid lines along one axis. The first line sits at
/// `offset mod GRID_SPACING` (Euclidean), so the grid slides continuously for offsets
/// of either sign.
pub fn grid_lines(offset: f64, extent: f64) -> Vec<f64> {
    let mut lines = Vec::new();
    let mut at = offset.rem_euclid(GRID_SPACING);
    while at < extent {
        lines.push(at);
        at += GRID_SPACING;
    }
    lines
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    palette: Palette,
}

impl Renderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Draws one full frame. A missing canvas skips the frame; a scene without map
    /// geometry leaves the surface cleared.
    pub fn draw<C: Canvas + ?Sized>(&self, scene: &SceneModel, canvas: Option<&mut C>) -> FrameReport {
        let mut report = FrameReport::default();
        let Some(canvas) = canvas else {
            report.skipped = true;
            return report;
        };

        canvas.clear();
        let Some(map) = scene.map_data() else {
            return report;
        };

        let viewport = canvas.viewport();
        let offset = scene.view_offset();

        for x in grid_lines(offset.x, viewport.width) {
            canvas.line(
                Point::new(x, 0.0),
                Point::new(x, viewport.height),
                GRID_LINE_WIDTH,
                self.palette.grid,
            );
            report.grid_lines += 1;
        }
        for y in grid_lines(offset.y, viewport.height) {
            canvas.line(
                Point::new(0.0, y),
                Point::new(viewport.width, y),
                GRID_LINE_WIDTH,
                self.palette.grid,
            );
            report.grid_lines += 1;
        }

        // Map-space layers from here on.
        for wall in &map.walls {
            canvas.fill_rect(
                Point::new(wall.x, wall.y) + offset,
                wall.w,
                wall.h,
                self.palette.wall,
            );
            report.walls += 1;
        }

        let path = scene.path();
        if !path.is_empty() {
            let screen_path: Vec<Point> = path.iter().map(|p| *p + offset).collect();
            if screen_path.len() >= 2 {
                canvas.polyline(&screen_path, PATH_LINE_WIDTH, self.palette.path);
            }
            for vertex in &screen_path {
                canvas.fill_circle(*vertex, PATH_DOT_RADIUS, self.palette.path);
            }
            report.path_vertices = screen_path.len();
        }

        if let Some(task) = scene.task() {
            self.marker(
                canvas,
                task.destination + offset,
                self.palette.task_outer,
                self.palette.task_inner,
            );
            report.task_marker = true;
        }

        if let Some(position) = scene.position() {
            self.marker(
                canvas,
                position + offset,
                self.palette.robot_outer,
                self.palette.robot_inner,
            );
            report.robot_marker = true;
        }

        report
    }

    fn marker<C: Canvas + ?Sized>(&self, canvas: &mut C, at: Point, outer: Color, inner: Color) {
        canvas.fill_circle(at, MARKER_OUTER_RADIUS, outer);
        canvas.fill_circle(at, MARKER_INNER_RADIUS, inner);
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
