pub mod emoji;
pub mod round;
