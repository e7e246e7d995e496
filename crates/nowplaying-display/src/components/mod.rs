// Animated parts of the frame. Both draw into any BinaryColor DrawTarget.

pub mod marquee;
pub mod starfield;
