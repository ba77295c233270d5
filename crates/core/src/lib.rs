#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod model;
pub mod navigation;
pub mod time;

pub use countdown::{Countdown, CountdownTick};
pub use error::Error;
pub use time::Clock;
