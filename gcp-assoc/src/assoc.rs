//! The per-image association pipeline: project, measure, bound-check,
//! accumulate.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::*;

use crate::catalog::GcpCatalog;
use crate::error::{Error, Result};
use crate::meta::{ImageMeta, MetadataSource};
use crate::project::{self, OrientationSolver};

/// GCP name mapped to the images that contain an in-bounds projection of
/// it. Keys iterate in lexicographic order; each image list follows the
/// selection iteration order.
pub type AssociationMap = BTreeMap<String, Vec<String>>;

/// Drives the selected images through the pipeline, one image at a time.
///
/// Processing is strictly sequential: the per-image artifacts are named by
/// convention from the image name, so interleaving two images could make
/// their solver outputs collide. The solver and metadata source are
/// injected so tests can run the whole pipeline without the external
/// tools.
pub struct Associator<'a, S, M> {
    catalog: &'a GcpCatalog,
    dataset_root: &'a Path,
    orientation_dir: &'a Path,
    ground_coordinates: &'a Path,
    solver: S,
    metadata: M,
}

impl<'a, S, M> Associator<'a, S, M>
where
    S: OrientationSolver,
    M: MetadataSource,
{
    pub fn new(
        catalog: &'a GcpCatalog,
        dataset_root: &'a Path,
        orientation_dir: &'a Path,
        ground_coordinates: &'a Path,
        solver: S,
        metadata: M,
    ) -> Self {
        Self {
            catalog,
            dataset_root,
            orientation_dir,
            ground_coordinates,
            solver,
            metadata,
        }
    }

    /// Processes every selected image and accumulates the association map.
    ///
    /// Per-image failures are logged and the image skipped; the shared
    /// ground-coordinates file is removed once all images are done. A run
    /// in which no GCP was visible anywhere is `EmptyAssociation`.
    pub fn run(&self, images: &BTreeSet<String>) -> Result<AssociationMap> {
        let mut map = AssociationMap::new();
        for image in images {
            self.process_image(image, &mut map);
        }
        if let Err(err) = fs::remove_file(self.ground_coordinates) {
            warn!(
                "cannot remove {}: {}",
                self.ground_coordinates.display(),
                err
            );
        }
        if map.is_empty() {
            return Err(Error::EmptyAssociation);
        }
        Ok(map)
    }

    fn process_image(&self, image: &str, map: &mut AssociationMap) {
        let orientation = project::orientation_file(self.orientation_dir, image);
        if !orientation.is_file() {
            warn!(
                "{}: {}, skipped",
                image,
                Error::OrientationFileMissing(orientation)
            );
            return;
        }
        let coordinates = self
            .dataset_root
            .join(project::coordinates_file_name(image));
        if let Err(err) = self
            .solver
            .project(&orientation, self.ground_coordinates, &coordinates)
        {
            warn!("{}: {}, skipped", image, err);
            let _ = fs::remove_file(&coordinates);
            return;
        }
        match self.metadata.read(&self.dataset_root.join(image)) {
            Ok(meta) => self.associate(image, &meta, &coordinates, map),
            Err(err) => warn!("{}: {}, skipped", image, err),
        }
        // The coordinates file never outlives its image, even on failure.
        let _ = fs::remove_file(&coordinates);
    }

    /// Reads the solver's output one line per GCP, in catalog order, and
    /// records the image under every GCP whose projection lands inside the
    /// image. Bounds are inclusive: `x == width` and `y == height` still
    /// count as visible.
    fn associate(&self, image: &str, meta: &ImageMeta, coordinates: &Path, map: &mut AssociationMap) {
        let content = match fs::read_to_string(coordinates) {
            Ok(content) => content,
            Err(_) => {
                warn!(
                    "{}: no projected coordinates at {}, skipped",
                    image,
                    coordinates.display()
                );
                return;
            }
        };
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() != self.catalog.len() {
            // Alignment from line zero still holds, so the aligned prefix
            // is kept; the mismatch itself must never pass silently.
            warn!(
                "{}",
                Error::ProjectionCountMismatch {
                    image: image.to_string(),
                    expected: self.catalog.len(),
                    actual: lines.len(),
                }
            );
        }
        for (point, line) in self.catalog.points().iter().zip(&lines) {
            let (x_text, rest) = match line.split_once(' ') {
                Some(pair) => pair,
                None => continue,
            };
            let y_text = rest.split(' ').next().unwrap_or("");
            let x: f64 = match x_text.trim().parse() {
                Ok(x) => x,
                Err(_) => continue,
            };
            let y: f64 = match y_text.trim().parse() {
                Ok(y) => y,
                Err(_) => continue,
            };
            if x < 0.0 || x > f64::from(meta.width) {
                continue;
            }
            if y < 0.0 || y > f64::from(meta.height) {
                continue;
            }
            map.entry(point.name.clone())
                .or_default()
                .push(meta.filename.clone());
        }
    }
}
