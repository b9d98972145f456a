//! Single-pass pivot scan for support/resistance and daily-close breakouts.

pub mod breakout;
pub mod levels;

pub use breakout::*;
pub use levels::*;
