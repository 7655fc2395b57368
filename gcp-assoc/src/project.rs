//! Projection of catalog points into one image's pixel space via the
//! external orientation solver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::process::{self, InvokeError};

const SOLVER_TOOL: &str = "mm3d";
const SOLVER_COMMAND: &str = "XYZ2Im";

/// `Orientation-<imageFileName>.xml` beneath the orientation directory.
pub fn orientation_file(orientation_dir: &Path, image: &str) -> PathBuf {
    orientation_dir.join(format!("Orientation-{}.xml", image))
}

/// Name of the solver's per-image output file: `-GCP` is inserted before the
/// image name's final extension dot and `.txt` appended, so `DSC_6443.jpg`
/// becomes `DSC_6443-GCP.jpg.txt`.
pub fn coordinates_file_name(image: &str) -> String {
    match image.rfind('.') {
        Some(dot) => format!("{}-GCP{}.txt", &image[..dot], &image[dot..]),
        None => format!("{}-GCP.txt", image),
    }
}

/// Resolves the solver executable beneath the tool base path, falling back
/// to the search path. Unlike the metadata tool this is not verified up
/// front: a failed solver invocation only costs the affected image.
pub fn locate_solver(base: &Path) -> PathBuf {
    let candidate = base.join(SOLVER_TOOL);
    if candidate.is_file() {
        candidate
    } else {
        PathBuf::from(SOLVER_TOOL)
    }
}

/// Produces the per-image projected-coordinates file for one image.
///
/// The production implementation shells out to the reconstruction suite;
/// tests substitute an in-process stand-in.
pub trait OrientationSolver {
    fn project(
        &self,
        orientation_file: &Path,
        ground_coordinates: &Path,
        output_file: &Path,
    ) -> Result<()>;
}

/// Invokes `mm3d XYZ2Im` synchronously, streaming its diagnostics to the
/// log.
pub struct Mm3dSolver {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Mm3dSolver {
    pub fn new(tool_base: &Path, timeout: Option<Duration>) -> Self {
        Self {
            program: locate_solver(tool_base),
            timeout,
        }
    }
}

impl OrientationSolver for Mm3dSolver {
    fn project(
        &self,
        orientation_file: &Path,
        ground_coordinates: &Path,
        output_file: &Path,
    ) -> Result<()> {
        let args = vec![
            SOLVER_COMMAND.to_string(),
            orientation_file.display().to_string(),
            ground_coordinates.display().to_string(),
            output_file.display().to_string(),
        ];
        match process::invoke(&self.program, &args, self.timeout, |line| {
            debug!("{}: {}", SOLVER_TOOL, line)
        }) {
            Ok(_) => Ok(()),
            Err(InvokeError::Timeout { timeout, .. }) => Err(Error::ExternalToolTimeout {
                tool: SOLVER_TOOL.to_string(),
                seconds: timeout.as_secs(),
            }),
            // The solver's own diagnostics are advisory; a missing output
            // file is the failure signal, detected when the coordinates are
            // read back.
            Err(err) => {
                warn!("{} invocation failed: {}", SOLVER_TOOL, err);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn orientation_files_follow_the_naming_convention() {
        let path = orientation_file(Path::new("Ori-GcpInit"), "DSC_6443.jpg");
        assert_eq!(path, Path::new("Ori-GcpInit/Orientation-DSC_6443.jpg.xml"));
    }

    #[test_case("DSC_6443.jpg", "DSC_6443-GCP.jpg.txt"; "with extension")]
    #[test_case("scan", "scan-GCP.txt"; "without extension")]
    #[test_case("a.b.c", "a.b-GCP.c.txt"; "postfix lands before the final dot")]
    fn coordinate_file_names(image: &str, expected: &str) {
        assert_eq!(coordinates_file_name(image), expected);
    }

    #[test]
    fn solver_falls_back_to_the_search_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(locate_solver(dir.path()), PathBuf::from(SOLVER_TOOL));
        std::fs::write(dir.path().join(SOLVER_TOOL), b"").unwrap();
        assert_eq!(locate_solver(dir.path()), dir.path().join(SOLVER_TOOL));
    }
}
