//! The GCP dictionary: an XML document listing surveyed ground control
//! points, plus the plain-text coordinate export consumed by the projection
//! solver.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Name of the shared ground-coordinates file written once per run.
pub const COORDINATES_FILE_NAME: &str = "GCP-Coordinates.txt";

const ROOT_NODE: &str = "DicoAppuisFlottant";
const RECORD_NODE: &str = "OneAppuisDAF";
const COORD_NODE: &str = "Pt";
const NAME_NODE: &str = "NamePt";

/// One surveyed ground control point with known ground coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct GcpPoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// The ground control points of one dataset, in document order.
///
/// The catalog owns its points for the whole run; everything downstream
/// refers to them by index, because the solver's per-image output is
/// positional (line N belongs to point N).
#[derive(Debug, Clone, Default)]
pub struct GcpCatalog {
    points: Vec<GcpPoint>,
}

impl GcpCatalog {
    /// Parses the GCP dictionary at `path`.
    ///
    /// Parsing is strict: the first malformed record fails the whole load,
    /// since a partial catalog would silently shift the positional
    /// correspondence with the solver output. The only leniency kept from
    /// the upstream format is numeric: an unparsable coordinate token maps
    /// to `0.0` instead of failing.
    pub fn load(path: &Path) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedCatalog {
            path: path.to_path_buf(),
            reason,
        };
        let text =
            fs::read_to_string(path).map_err(|err| malformed(format!("cannot open: {}", err)))?;
        let document = roxmltree::Document::parse(&text)
            .map_err(|err| malformed(format!("invalid XML: {}", err)))?;
        let root = document
            .descendants()
            .find(|node| node.has_tag_name(ROOT_NODE))
            .ok_or_else(|| malformed(format!("missing root node {}", ROOT_NODE)))?;

        let mut points = Vec::new();
        for record in root.children().filter(|node| node.has_tag_name(RECORD_NODE)) {
            let coord = record
                .children()
                .find(|node| node.has_tag_name(COORD_NODE))
                .ok_or_else(|| {
                    malformed(format!(
                        "record {} is missing its {} coordinate field",
                        points.len() + 1,
                        COORD_NODE
                    ))
                })?;
            let name = record
                .children()
                .find(|node| node.has_tag_name(NAME_NODE))
                .ok_or_else(|| {
                    malformed(format!(
                        "record {} is missing its {} name field",
                        points.len() + 1,
                        NAME_NODE
                    ))
                })?;
            let coord_text = coord.text().unwrap_or("").trim();
            let (x_text, rest) = coord_text.split_once(' ').ok_or_else(|| {
                malformed(format!("coordinate field {:?} has no first space", coord_text))
            })?;
            let (y_text, z_text) = rest.split_once(' ').ok_or_else(|| {
                malformed(format!("coordinate field {:?} has no second space", coord_text))
            })?;
            points.push(GcpPoint {
                name: name.text().unwrap_or("").trim().to_string(),
                x: parse_coordinate(x_text),
                y: parse_coordinate(y_text),
                z: parse_coordinate(z_text),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[GcpPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Writes the shared ground-coordinates file consumed by the projection
    /// solver: one `x y z` line per point in catalog order, fixed 3-decimal
    /// formatting, no trailing newline.
    pub fn write_coordinates(&self, path: &Path) -> Result<()> {
        let lines: Vec<String> = self
            .points
            .iter()
            .map(|point| format!("{:.3} {:.3} {:.3}", point.x, point.y, point.z))
            .collect();
        fs::write(path, lines.join("\n")).map_err(|source| Error::CoordinatesExport {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A coordinate token that does not parse maps to `0.0`, matching the
/// lenient numeric handling the dictionary format has always had. Extra
/// tokens after the third are ignored.
fn parse_coordinate(text: &str) -> f64 {
    let token = text.split(' ').next().unwrap_or("");
    token.trim().parse().unwrap_or(0.0)
}
