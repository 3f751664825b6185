//! Data model module
//!
//! OHLCV records, bar intervals and the time ranges requests are made over.

pub mod candle;
pub mod interval;
pub mod range;
pub mod timestamp;

pub use candle::*;
pub use interval::*;
pub use range::*;
pub use timestamp::*;
