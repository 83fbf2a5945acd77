//! Destination path derivation.

use std::path::{Path, PathBuf};

/// Extension of every file the encoder produces.
pub const TARGET_EXTENSION: &str = "flac";

/// Derives the output path for `source`.
///
/// Only the final extension is replaced (`song.tar.wav` becomes `song.tar.flac`).
/// A source without an extension gets `.flac` appended. The result always sits
/// next to the source.
pub fn destination_path_for(source: &Path) -> PathBuf {
    source.with_extension(TARGET_EXTENSION)
}
