#[cfg(feature = "bytes")]
pub mod bytes;
#[cfg(feature = "duration")]
pub mod duration;
