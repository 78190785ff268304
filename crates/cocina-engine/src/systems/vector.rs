//! CPU-side tessellation of the chart's decorative shapes.
//!
//! Filled and stroked paths go through lyon and come out as a flat
//! triangle list (6 floats per vertex) that the canvas layer draws as-is.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, FillVertexConstructor,
    StrokeOptions, StrokeTessellator, StrokeVertex, StrokeVertexConstructor, VertexBuffers,
};

use crate::core::palette::Color;

const TOLERANCE: f32 = 0.5;

/// 6 floats = 24 bytes per vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct VectorVertex {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl VectorVertex {
    pub const FLOATS: usize = 6;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// RGBA color for vector drawing operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl VectorColor {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl From<Color> for VectorColor {
    fn from(c: Color) -> Self {
        Self::new(c.r, c.g, c.b, 1.0)
    }
}

struct FillVertexCtor {
    color: VectorColor,
}

impl FillVertexConstructor<VectorVertex> for FillVertexCtor {
    fn new_vertex(&mut self, vertex: FillVertex) -> VectorVertex {
        let p = vertex.position();
        let c = self.color;
        VectorVertex { x: p.x, y: p.y, r: c.r, g: c.g, b: c.b, a: c.a }
    }
}

struct StrokeVertexCtor {
    color: VectorColor,
}

impl StrokeVertexConstructor<VectorVertex> for StrokeVertexCtor {
    fn new_vertex(&mut self, vertex: StrokeVertex) -> VectorVertex {
        let p = vertex.position();
        let c = self.color;
        VectorVertex { x: p.x, y: p.y, r: c.r, g: c.g, b: c.b, a: c.a }
    }
}

/// Lyon tessellators plus the output buffer, bounded to `max_vertices`.
///
/// A shape that does not fit in the remaining space is dropped whole.
pub struct VectorState {
    fill_tess: FillTessellator,
    stroke_tess: StrokeTessellator,
    geometry: VertexBuffers<VectorVertex, u32>,
    buffer: Vec<f32>,
    max_vertices: usize,
    dropped: usize,
}

impl VectorState {
    pub fn with_capacity(max_vertices: usize) -> Self {
        Self {
            fill_tess: FillTessellator::new(),
            stroke_tess: StrokeTessellator::new(),
            geometry: VertexBuffers::new(),
            buffer: Vec::with_capacity(max_vertices * VectorVertex::FLOATS),
            max_vertices,
            dropped: 0,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.dropped = 0;
    }

    pub fn vertex_count(&self) -> usize {
        self.buffer.len() / VectorVertex::FLOATS
    }

    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Shapes dropped since the last `clear` for lack of space.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn as_floats(&self) -> &[f32] {
        &self.buffer
    }

    pub fn buffer_ptr(&self) -> *const f32 {
        self.buffer.as_ptr()
    }

    /// Expand indexed geometry into the flat triangle list.
    fn flush_geometry(&mut self) {
        if self.vertex_count() + self.geometry.indices.len() > self.max_vertices {
            self.dropped += 1;
        } else {
            for idx in &self.geometry.indices {
                let v = &self.geometry.vertices[*idx as usize];
                self.buffer.extend_from_slice(&[v.x, v.y, v.r, v.g, v.b, v.a]);
            }
        }
        self.geometry.vertices.clear();
        self.geometry.indices.clear();
    }

    /// Fill a closed polygon. Fewer than three points draws nothing.
    pub fn fill_polygon(&mut self, points: &[Vec2], color: VectorColor) {
        if points.len() < 3 {
            return;
        }
        let mut builder = Path::builder();
        builder.begin(point(points[0].x, points[0].y));
        for p in &points[1..] {
            builder.line_to(point(p.x, p.y));
        }
        builder.close();
        self.fill_path(&builder.build(), color);
    }

    pub fn fill_rect(&mut self, pos: Vec2, width: f32, height: f32, color: VectorColor) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let points = [
            pos,
            Vec2::new(pos.x + width, pos.y),
            Vec2::new(pos.x + width, pos.y + height),
            Vec2::new(pos.x, pos.y + height),
        ];
        self.fill_polygon(&points, color);
    }

    pub fn fill_path(&mut self, path: &Path, color: VectorColor) {
        let result = self.fill_tess.tessellate_path(
            path,
            &FillOptions::tolerance(TOLERANCE),
            &mut BuffersBuilder::new(&mut self.geometry, FillVertexCtor { color }),
        );
        match result {
            Ok(()) => self.flush_geometry(),
            Err(err) => {
                log::warn!("fill tessellation failed: {err:?}");
                self.geometry.vertices.clear();
                self.geometry.indices.clear();
            }
        }
    }

    /// Stroke an open polyline.
    pub fn stroke_polyline(&mut self, points: &[Vec2], width: f32, color: VectorColor) {
        if points.len() < 2 || width <= 0.0 {
            return;
        }
        let mut builder = Path::builder();
        builder.begin(point(points[0].x, points[0].y));
        for p in &points[1..] {
            builder.line_to(point(p.x, p.y));
        }
        builder.end(false);
        self.stroke_path(&builder.build(), width, color);
    }

    pub fn stroke_path(&mut self, path: &Path, width: f32, color: VectorColor) {
        let result = self.stroke_tess.tessellate_path(
            path,
            &StrokeOptions::tolerance(TOLERANCE).with_line_width(width),
            &mut BuffersBuilder::new(&mut self.geometry, StrokeVertexCtor { color }),
        );
        match result {
            Ok(()) => self.flush_geometry(),
            Err(err) => {
                log::warn!("stroke tessellation failed: {err:?}");
                self.geometry.vertices.clear();
                self.geometry.indices.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: VectorColor = VectorColor::new(1.0, 0.0, 0.0, 1.0);

    #[test]
    fn vector_vertex_is_24_bytes() {
        assert_eq!(std::mem::size_of::<VectorVertex>(), 24);
        assert_eq!(VectorVertex::STRIDE_BYTES, 24);
    }

    #[test]
    fn rect_is_two_triangles() {
        let mut state = VectorState::with_capacity(64);
        state.fill_rect(Vec2::ZERO, 100.0, 50.0, RED);
        assert_eq!(state.vertex_count(), 6);
        assert_eq!(state.as_floats()[2..6], [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn degenerate_shapes_draw_nothing() {
        let mut state = VectorState::with_capacity(64);
        state.fill_polygon(&[Vec2::ZERO, Vec2::ONE], RED);
        state.fill_rect(Vec2::ZERO, 0.0, 10.0, RED);
        state.stroke_polyline(&[Vec2::ZERO], 2.0, RED);
        assert_eq!(state.vertex_count(), 0);
    }

    #[test]
    fn stroke_produces_vertices() {
        let mut state = VectorState::with_capacity(64);
        state.stroke_polyline(&[Vec2::ZERO, Vec2::new(100.0, 0.0)], 2.0, RED);
        assert!(state.vertex_count() > 0);
        assert_eq!(state.vertex_count() % 3, 0);
    }

    #[test]
    fn shapes_past_capacity_are_dropped_whole() {
        let mut state = VectorState::with_capacity(8);
        state.fill_rect(Vec2::ZERO, 10.0, 10.0, RED);
        state.fill_rect(Vec2::new(20.0, 0.0), 10.0, 10.0, RED);
        assert_eq!(state.vertex_count(), 6);
        assert_eq!(state.dropped(), 1);

        state.clear();
        assert_eq!(state.vertex_count(), 0);
        assert_eq!(state.dropped(), 0);
    }

    #[test]
    fn palette_color_converts_opaque() {
        let c: VectorColor = Color::new(0.2, 0.4, 0.6).into();
        assert_eq!(c.a, 1.0);
        assert_eq!(c.with_alpha(0.5).a, 0.5);
    }
}
