//! Common cursor types, encode/decode error kinds, and padding helpers
//! shared by every NCP wire-format crate.

mod cursor;
mod decode;
mod encode;
mod padding;

pub use self::cursor::*;
pub use self::decode::*;
pub use self::encode::*;
pub use self::padding::*;
