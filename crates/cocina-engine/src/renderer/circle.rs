use bytemuck::{Pod, Zeroable};

use crate::core::bar::Particle;

/// One particle as the canvas draws it.
/// 8 floats = 32 bytes per instance.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CircleInstance {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub alpha: f32,
    /// Index of the owning bar, for hover lookups on the JS side.
    pub bar: f32,
}

impl CircleInstance {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;

    pub fn from_particle(p: &Particle, bar: u32, alpha: f32) -> Self {
        Self {
            x: p.pos.x,
            y: p.pos.y,
            radius: p.radius,
            r: p.color.r,
            g: p.color.g,
            b: p.color.b,
            alpha,
            bar: bar as f32,
        }
    }
}

/// Fixed-capacity list of circles, read by JS through a raw pointer.
///
/// Pushes past capacity are dropped so the backing allocation never moves
/// while JS holds a view on it.
pub struct CircleBuffer {
    instances: Vec<CircleInstance>,
    capacity: usize,
}

impl CircleBuffer {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(max: usize) -> Self {
        Self {
            instances: Vec::with_capacity(max),
            capacity: max,
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Returns false when the buffer is full.
    pub fn push(&mut self, instance: CircleInstance) -> bool {
        if self.instances.len() >= self.capacity {
            return false;
        }
        self.instances.push(instance);
        true
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn instances(&self) -> &[CircleInstance] {
        &self.instances
    }

    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.instances)
    }

    pub fn instances_ptr(&self) -> *const f32 {
        self.instances.as_ptr() as *const f32
    }
}

impl Default for CircleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_instance_is_32_bytes() {
        assert_eq!(std::mem::size_of::<CircleInstance>(), 32);
        assert_eq!(CircleInstance::STRIDE_BYTES, 32);
    }

    #[test]
    fn push_stops_at_capacity() {
        let mut buf = CircleBuffer::with_capacity(2);
        assert!(buf.push(CircleInstance::default()));
        assert!(buf.push(CircleInstance::default()));
        assert!(!buf.push(CircleInstance::default()));
        assert_eq!(buf.instance_count(), 2);

        buf.clear();
        assert_eq!(buf.instance_count(), 0);
    }

    #[test]
    fn floats_follow_field_order() {
        let mut buf = CircleBuffer::with_capacity(1);
        buf.push(CircleInstance { x: 1.0, y: 2.0, radius: 3.0, bar: 7.0, ..Default::default() });
        let floats = buf.as_floats();
        assert_eq!(floats.len(), CircleInstance::FLOATS);
        assert_eq!(&floats[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(floats[7], 7.0);
    }
}
