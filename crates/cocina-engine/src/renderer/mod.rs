pub mod circle;

pub use circle::{CircleBuffer, CircleInstance};
