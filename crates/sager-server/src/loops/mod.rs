//! Background loops feeding the engine.

pub mod feed_loop;
pub mod session_loop;
