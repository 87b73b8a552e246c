//! Viewport-based render filtering.
//!
//! Culling only decides what gets drawn. Hit testing and editing always work
//! on the full state.

use tracing::trace;

use crate::config::CullingConfig;
use crate::math::{Aabb, Point2, Vector2};
use crate::model::{Polygon, SegmentationState};

/// Screen-space view onto the image, `screen = world * zoom + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Pan, in screen pixels.
    pub offset: Vector2,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Unpanned, unzoomed viewport of the given size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            offset: Vector2::zeros(),
            zoom: 1.0,
            width,
            height,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, dx: f64, dy: f64) -> Self {
        self.offset = Vector2::new(dx, dy);
        self
    }

    #[must_use]
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    #[must_use]
    pub fn screen_to_world(&self, screen: &Point2) -> Point2 {
        Point2::from((screen.coords - self.offset) / self.zoom)
    }

    #[must_use]
    pub fn world_to_screen(&self, world: &Point2) -> Point2 {
        Point2::from(world.coords * self.zoom + self.offset)
    }

    /// World-space rectangle covered by the viewport, grown by `margin`.
    #[must_use]
    pub fn world_rect(&self, margin: f64) -> Aabb {
        let top_left = self.screen_to_world(&Point2::origin());
        let bottom_right = self.screen_to_world(&Point2::new(self.width, self.height));
        Aabb::new(top_left, bottom_right).expanded(margin)
    }
}

/// Polygons selected for drawing.
#[derive(Debug, Clone)]
pub struct CullResult<'a> {
    drawn: Vec<&'a Polygon>,
    total: usize,
}

impl<'a> CullResult<'a> {
    /// Polygons to draw, in draw order.
    #[must_use]
    pub fn drawn(&self) -> &[&'a Polygon] {
        &self.drawn
    }

    #[must_use]
    pub fn into_drawn(self) -> Vec<&'a Polygon> {
        self.drawn
    }

    /// Number of polygons in the state.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn culled(&self) -> usize {
        self.total - self.drawn.len()
    }
}

/// Filters a state down to the polygons whose bounds meet the viewport.
#[derive(Debug, Clone, Default)]
pub struct VisibilityCuller {
    config: CullingConfig,
}

impl VisibilityCuller {
    #[must_use]
    pub fn new(config: CullingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CullingConfig {
        &self.config
    }

    /// Returns the polygons of `state` worth drawing in `viewport`.
    ///
    /// Small states, and viewports with a non-positive zoom, are returned
    /// whole. Hidden polygons are kept; hiding is up to the renderer.
    #[must_use]
    pub fn cull<'a>(&self, state: &'a SegmentationState, viewport: &Viewport) -> CullResult<'a> {
        let total = state.len();
        if total < self.config.threshold || viewport.zoom.is_nan() || viewport.zoom <= 0.0 {
            return CullResult {
                drawn: state.iter().collect(),
                total,
            };
        }

        let rect = viewport.world_rect(self.config.margin);
        let drawn: Vec<_> = state
            .iter()
            .filter(|polygon| polygon.bounds().intersects(&rect))
            .collect();
        trace!(total, drawn = drawn.len(), "culled");
        CullResult { drawn, total }
    }
}
