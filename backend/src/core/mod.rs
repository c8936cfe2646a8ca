//! Core engine primitives: the virtual calendar clock.

pub mod time;
