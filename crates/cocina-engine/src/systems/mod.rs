pub mod render;
#[cfg(feature = "vectors")]
pub mod ground;
#[cfg(feature = "vectors")]
pub mod vector;
