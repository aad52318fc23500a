//! Domain layer - pure logic independent of transport and store
//!
//! This module turns raw bytes into validated readings. It knows nothing
//! about serial ports, files or signals.

pub mod framer;
pub mod reading;

pub use framer::{LineFramer, LINE_TERMINATOR};
pub use reading::{parse_line, parse_reading, Reading, ReadingError};
