//! Log output destinations

pub mod compress;
pub mod console;
pub mod file;
pub mod rotating_file;

pub use compress::compress_file;
pub use console::ConsoleSink;
pub use file::FileSink;
pub use rotating_file::{FileTransport, RotationPolicy, DEFAULT_FILE_PREFIX, WRITE_LOCK_TIMEOUT};
