//! Input transports used by the loader (filesystem today; object stores later).

mod fs;

pub use fs::FileStream;
