pub mod bar;
pub mod chart;
pub mod palette;
pub mod rng;
pub mod spatial;
pub mod time;
