//! Per-GCP result files.

use std::fs;
use std::path::Path;

use log::error;

use crate::assoc::AssociationMap;
use crate::error::{Error, Result};
use crate::pattern;

const OUTPUT_SUFFIX: &str = "-GCP2IMGS.txt";

/// Writes one `<GCPName>-GCP2IMGS.txt` per map entry, in key order, either
/// as a compact alternation pattern or as a literal newline-joined image
/// list (no trailing newline).
///
/// The output directory is created when absent. A write failure for one
/// GCP is logged and skipped; the remaining entries are still written.
/// Returns the number of files written.
pub fn write_associations(
    map: &AssociationMap,
    output_dir: &Path,
    pattern_mode: bool,
) -> Result<usize> {
    if !output_dir.is_dir() {
        fs::create_dir_all(output_dir).map_err(|source| Error::OutputDirUnavailable {
            path: output_dir.to_path_buf(),
            source,
        })?;
    }
    let mut written = 0;
    for (gcp, images) in map {
        let content = if pattern_mode {
            pattern::compress(images)
        } else {
            images.join("\n")
        };
        let path = output_dir.join(format!("{}{}", gcp, OUTPUT_SUFFIX));
        match fs::write(&path, content) {
            Ok(()) => written += 1,
            Err(source) => error!("{}", Error::OutputWriteFailed { path, source }),
        }
    }
    Ok(written)
}
