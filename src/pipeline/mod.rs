pub mod codec;
pub mod pattern;
pub mod persistence;
