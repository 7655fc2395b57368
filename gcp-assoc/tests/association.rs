//! End-to-end pipeline tests with in-process stand-ins for the external
//! orientation solver and metadata tool.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gcp_assoc::catalog::COORDINATES_FILE_NAME;
use gcp_assoc::{
    select_images, write_associations, Associator, Error, GcpCatalog, ImageMeta, MetadataSource,
    OrientationSolver,
};
use tempfile::TempDir;

/// Writes a scripted coordinates file per image, keyed by the solver's
/// output file name.
struct ScriptedSolver {
    outputs: BTreeMap<String, String>,
}

impl ScriptedSolver {
    fn new<const N: usize>(outputs: [(&str, &str); N]) -> Self {
        Self {
            outputs: outputs
                .into_iter()
                .map(|(name, lines)| (name.to_string(), lines.to_string()))
                .collect(),
        }
    }
}

impl OrientationSolver for ScriptedSolver {
    fn project(
        &self,
        _orientation_file: &Path,
        _ground_coordinates: &Path,
        output_file: &Path,
    ) -> gcp_assoc::Result<()> {
        let name = output_file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if let Some(lines) = self.outputs.get(name) {
            fs::write(output_file, lines).unwrap();
        }
        Ok(())
    }
}

/// Reports a fixed image size and the path's base name.
struct FixedSizeReader {
    width: u32,
    height: u32,
}

impl MetadataSource for FixedSizeReader {
    fn read(&self, image_path: &Path) -> gcp_assoc::Result<ImageMeta> {
        Ok(ImageMeta {
            filename: image_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string(),
            width: self.width,
            height: self.height,
        })
    }
}

const TWO_POINT_CATALOG: &str = "<DicoAppuisFlottant>\
   <OneAppuisDAF><Pt>10.0 20.0 30.0</Pt><NamePt>A</NamePt></OneAppuisDAF>\
   <OneAppuisDAF><Pt>11.0 21.0 31.0</Pt><NamePt>B</NamePt></OneAppuisDAF>\
 </DicoAppuisFlottant>";

/// Builds a dataset root containing the images, their orientation files and
/// the catalog, and exports the shared ground-coordinates file.
fn dataset(images: &[&str]) -> (TempDir, GcpCatalog) {
    let _ = pretty_env_logger::try_init_timed();
    let root = tempfile::tempdir().unwrap();
    let ori_dir = root.path().join("Ori-GcpInit");
    fs::create_dir(&ori_dir).unwrap();
    for image in images {
        fs::write(root.path().join(image), b"jpeg bytes").unwrap();
        fs::write(
            ori_dir.join(format!("Orientation-{}.xml", image)),
            b"<OrientationConique/>",
        )
        .unwrap();
    }
    let catalog_path = root.path().join("gcps.xml");
    fs::write(&catalog_path, TWO_POINT_CATALOG).unwrap();
    let catalog = GcpCatalog::load(&catalog_path).unwrap();
    catalog
        .write_coordinates(&root.path().join(COORDINATES_FILE_NAME))
        .unwrap();
    (root, catalog)
}

fn run_pipeline<S: OrientationSolver, M: MetadataSource>(
    root: &TempDir,
    catalog: &GcpCatalog,
    images: &[&str],
    solver: S,
    metadata: M,
) -> gcp_assoc::Result<gcp_assoc::AssociationMap> {
    let selected = select_images(&root.path().join("*.jpg").display().to_string()).unwrap();
    for image in images {
        assert!(selected.contains(*image));
    }
    let ground = root.path().join(COORDINATES_FILE_NAME);
    let ori_gcp_init = root.path().join("Ori-GcpInit");
    let associator = Associator::new(
        catalog,
        root.path(),
        &ori_gcp_init,
        &ground,
        solver,
        metadata,
    );
    associator.run(&selected)
}

#[test]
fn associates_and_writes_patterns_end_to_end() {
    let images = ["P1.jpg", "P2.jpg"];
    let (root, catalog) = dataset(&images);
    // A is visible only in P1; B is visible in both.
    let solver = ScriptedSolver::new([
        ("P1-GCP.jpg.txt", "100.0 100.0\n200.0 200.0"),
        ("P2-GCP.jpg.txt", "-5.0 100.0\n300.0 300.0"),
    ]);
    let reader = FixedSizeReader {
        width: 1000,
        height: 1000,
    };
    let map = run_pipeline(&root, &catalog, &images, solver, reader).unwrap();
    assert_eq!(map["A"], ["P1.jpg"]);
    assert_eq!(map["B"], ["P1.jpg", "P2.jpg"]);

    let out_dir = root.path().join("GCP-IMG");
    let written = write_associations(&map, &out_dir, true).unwrap();
    assert_eq!(written, 2);
    assert_eq!(
        fs::read_to_string(out_dir.join("A-GCP2IMGS.txt")).unwrap(),
        "P1.jpg"
    );
    assert_eq!(
        fs::read_to_string(out_dir.join("B-GCP2IMGS.txt")).unwrap(),
        "P(1|2).jpg"
    );

    // Scoped artifacts must be gone after the run.
    assert!(!root.path().join(COORDINATES_FILE_NAME).exists());
    assert!(!root.path().join("P1-GCP.jpg.txt").exists());
    assert!(!root.path().join("P2-GCP.jpg.txt").exists());
}

#[test]
fn every_gcp_maps_to_the_single_image_when_all_lines_are_in_bounds() {
    let images = ["P1.jpg"];
    let (root, catalog) = dataset(&images);
    let solver = ScriptedSolver::new([("P1-GCP.jpg.txt", "0.0 0.0\n50.0 50.0")]);
    let reader = FixedSizeReader {
        width: 100,
        height: 100,
    };
    let map = run_pipeline(&root, &catalog, &images, solver, reader).unwrap();
    assert_eq!(map.len(), catalog.len());
    for point in catalog.points() {
        assert_eq!(map[&point.name], ["P1.jpg"]);
    }
}

#[test]
fn bounds_are_inclusive_at_the_image_edges() {
    let images = ["P1.jpg"];
    let (root, catalog) = dataset(&images);
    // A sits exactly on the far corner; B is one tenth past it.
    let solver = ScriptedSolver::new([("P1-GCP.jpg.txt", "640.0 480.0\n640.1 480.0")]);
    let reader = FixedSizeReader {
        width: 640,
        height: 480,
    };
    let map = run_pipeline(&root, &catalog, &images, solver, reader).unwrap();
    assert_eq!(map["A"], ["P1.jpg"]);
    assert!(!map.contains_key("B"));
}

#[test]
fn negative_coordinates_are_never_associated() {
    let images = ["P1.jpg"];
    let (root, catalog) = dataset(&images);
    let solver = ScriptedSolver::new([("P1-GCP.jpg.txt", "-0.1 100.0\n100.0 -0.1")]);
    let reader = FixedSizeReader {
        width: 1000,
        height: 1000,
    };
    let result = run_pipeline(&root, &catalog, &images, solver, reader);
    assert!(matches!(result, Err(Error::EmptyAssociation)));
}

#[test]
fn malformed_and_surplus_lines_are_skipped_without_losing_the_rest() {
    let images = ["P1.jpg"];
    let (root, catalog) = dataset(&images);
    // Line one has no separating space; the third line has no catalog
    // counterpart. Only B survives.
    let solver = ScriptedSolver::new([("P1-GCP.jpg.txt", "garbage\n10.0 10.0\n5.0 5.0")]);
    let reader = FixedSizeReader {
        width: 100,
        height: 100,
    };
    let map = run_pipeline(&root, &catalog, &images, solver, reader).unwrap();
    assert!(!map.contains_key("A"));
    assert_eq!(map["B"], ["P1.jpg"]);
}

#[test]
fn image_without_orientation_file_is_skipped() {
    let images = ["P1.jpg", "P2.jpg"];
    let (root, catalog) = dataset(&images);
    fs::remove_file(
        root.path()
            .join("Ori-GcpInit")
            .join("Orientation-P2.jpg.xml"),
    )
    .unwrap();
    let solver = ScriptedSolver::new([
        ("P1-GCP.jpg.txt", "10.0 10.0\n20.0 20.0"),
        ("P2-GCP.jpg.txt", "10.0 10.0\n20.0 20.0"),
    ]);
    let reader = FixedSizeReader {
        width: 100,
        height: 100,
    };
    let map = run_pipeline(&root, &catalog, &images, solver, reader).unwrap();
    assert_eq!(map["A"], ["P1.jpg"]);
    assert_eq!(map["B"], ["P1.jpg"]);
}

#[test]
fn image_whose_solver_output_never_appears_is_skipped() {
    let images = ["P1.jpg", "P2.jpg"];
    let (root, catalog) = dataset(&images);
    // No scripted output for P2: projection "succeeds" but leaves nothing
    // behind, which is the real failure signal.
    let solver = ScriptedSolver::new([("P1-GCP.jpg.txt", "10.0 10.0\n20.0 20.0")]);
    let reader = FixedSizeReader {
        width: 100,
        height: 100,
    };
    let map = run_pipeline(&root, &catalog, &images, solver, reader).unwrap();
    assert_eq!(map["A"], ["P1.jpg"]);
    assert_eq!(map["B"], ["P1.jpg"]);
}

#[test]
fn failing_metadata_source_skips_the_image() {
    struct Unreadable;
    impl MetadataSource for Unreadable {
        fn read(&self, image_path: &Path) -> gcp_assoc::Result<ImageMeta> {
            Err(Error::ImageUnreadable(image_path.to_path_buf()))
        }
    }
    let images = ["P1.jpg"];
    let (root, catalog) = dataset(&images);
    let solver = ScriptedSolver::new([("P1-GCP.jpg.txt", "10.0 10.0\n20.0 20.0")]);
    let result = run_pipeline(&root, &catalog, &images, solver, Unreadable);
    assert!(matches!(result, Err(Error::EmptyAssociation)));
    // The dangling coordinates file is still cleaned up.
    assert!(!root.path().join("P1-GCP.jpg.txt").exists());
}
