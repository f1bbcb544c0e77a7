/// Filesystem transport for origin files and JSON artifacts.
pub mod fs;
