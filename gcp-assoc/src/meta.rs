//! Image metadata through the external `exiv2` tool.
//!
//! The tool prints line-oriented `key: value` text; only the canonical
//! filename and the pixel dimensions are consumed, everything else is
//! ignored.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::process::{self, InvokeError};

const METADATA_TOOL: &str = "exiv2";
const PRINT_COMMAND: &str = "pr";

/// Pixel dimensions and canonical filename of one image, as reported by the
/// metadata tool. Resolved per image and discarded once the image has been
/// processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMeta {
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl ImageMeta {
    /// Folds one line of tool output into the metadata.
    ///
    /// Key comparison ignores case and embedded whitespace. `filename`
    /// values keep only the base name; `imagesize` values are
    /// `WIDTHxHEIGHT` with surrounding spaces tolerated. Unrecognized keys
    /// and lines without a `:` separator are ignored.
    pub fn apply_line(&mut self, line: &str) {
        let (key, value) = match line.split_once(':') {
            Some(pair) => pair,
            None => return,
        };
        let key: String = key
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "filename" => {
                let value = value.trim();
                self.filename = Path::new(value)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(value)
                    .to_string();
            }
            "imagesize" => {
                let value: String = value.chars().filter(|ch| *ch != ' ').collect();
                if let Some((width, height)) = value.split_once('x') {
                    self.width = width.trim().parse().unwrap_or(0);
                    self.height = height.trim().parse().unwrap_or(0);
                }
            }
            _ => {}
        }
    }
}

/// Resolves the metadata tool executable.
///
/// The tool is searched beneath the configured base path first (both the
/// flat layout and the `binaire-aux` layout the reconstruction suite ships
/// with), then on the search path. Failing all of that is
/// `MetadataToolUnavailable`, which is fatal before the per-image loop ever
/// starts.
pub fn locate_metadata_tool(base: &Path) -> Result<PathBuf> {
    let candidates = [
        base.join(METADATA_TOOL),
        base.join("binaire-aux").join(METADATA_TOOL),
    ];
    for candidate in candidates {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            let candidate = dir.join(METADATA_TOOL);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(Error::MetadataToolUnavailable(base.join(METADATA_TOOL)))
}

/// Runs the metadata tool on `image_path` and extracts filename and pixel
/// dimensions from its output.
pub fn read_metadata(tool: &Path, image_path: &Path, timeout: Option<Duration>) -> Result<ImageMeta> {
    if !image_path.is_file() {
        return Err(Error::ImageUnreadable(image_path.to_path_buf()));
    }
    let args = vec![PRINT_COMMAND.to_string(), image_path.display().to_string()];
    let mut meta = ImageMeta::default();
    let outcome = process::invoke(tool, &args, timeout, |line| meta.apply_line(line));
    match outcome {
        Ok(_) => {}
        Err(InvokeError::Timeout { timeout, .. }) => {
            return Err(Error::ExternalToolTimeout {
                tool: METADATA_TOOL.to_string(),
                seconds: timeout.as_secs(),
            })
        }
        Err(_) => return Err(Error::MetadataToolUnavailable(tool.to_path_buf())),
    }
    if meta.filename.is_empty() {
        // Tools that omit the filename key still identify the image.
        meta.filename = image_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
    }
    Ok(meta)
}

/// Supplies per-image metadata to the association builder.
pub trait MetadataSource {
    fn read(&self, image_path: &Path) -> Result<ImageMeta>;
}

/// Production metadata source backed by the external tool.
pub struct Exiv2Reader {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Exiv2Reader {
    /// Locates the tool beneath `tool_base`; failing to find it anywhere is
    /// fatal for the run.
    pub fn new(tool_base: &Path, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            program: locate_metadata_tool(tool_base)?,
            timeout,
        })
    }
}

impl MetadataSource for Exiv2Reader {
    fn read(&self, image_path: &Path) -> Result<ImageMeta> {
        read_metadata(&self.program, image_path, self.timeout)
    }
}
