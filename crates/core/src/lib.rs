#![forbid(unsafe_code)]

pub mod badges;
pub mod calculator;
pub mod model;
pub mod time;

pub use time::Clock;
