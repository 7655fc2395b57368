use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use gcp_assoc::catalog::COORDINATES_FILE_NAME;
use gcp_assoc::{
    select_images, write_associations, Associator, Exiv2Reader, GcpCatalog, Mm3dSolver, Settings,
};
use log::*;
use structopt::StructOpt;

const ORI_DIR_PREFIX: &str = "Ori-";

#[derive(StructOpt, Clone)]
#[structopt(
    name = "gcp2imgs",
    about = "Maps ground control points to the survey images that observe them"
)]
struct Opt {
    /// Directory plus filename glob selecting the working image set,
    /// e.g. "dataset/IMG_*.jpg".
    pattern: String,
    /// Orientation directory name; the "Ori-" prefix is prepended when
    /// missing.
    orientations: String,
    /// GCP dictionary file, relative to the dataset root.
    gcp_file: String,
    /// Settings file overriding the built-in defaults.
    ///
    /// This is in the format of `gcp_assoc::Settings`. Individual flags
    /// below take precedence over its fields.
    #[structopt(short, long, parse(from_os_str))]
    settings: Option<PathBuf>,
    /// Directory the per-GCP result files are written to, relative to the
    /// dataset root.
    #[structopt(short, long)]
    out: Option<String>,
    /// Write literal image lists instead of compact patterns.
    #[structopt(long)]
    list: bool,
    /// Base path the external tools are resolved beneath.
    #[structopt(long, parse(from_os_str))]
    tool_path: Option<PathBuf>,
    /// Kill an external tool that runs longer than this many seconds.
    #[structopt(long)]
    timeout: Option<u64>,
}

/// Dataset root is the parent of the image pattern.
fn dataset_root(pattern: &str) -> PathBuf {
    match Path::new(pattern).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn with_ori_prefix(name: &str) -> String {
    if name.starts_with(ORI_DIR_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", ORI_DIR_PREFIX, name)
    }
}

fn settings_from(opt: &Opt) -> Settings {
    let mut settings = opt
        .settings
        .as_ref()
        .and_then(|path| {
            let loaded: Option<Settings> = File::open(path)
                .ok()
                .and_then(|file| serde_json::from_reader(file).ok());
            if loaded.is_none() {
                warn!("cannot read settings from {}, using defaults", path.display());
            }
            loaded
        })
        .unwrap_or_default();
    if let Some(out) = &opt.out {
        settings.output_dir = out.clone();
    }
    if opt.list {
        settings.pattern_output = false;
    }
    if let Some(tool_path) = &opt.tool_path {
        settings.tool_path = tool_path.clone();
    } else if settings.tool_path == Path::new(".") {
        if let Ok(cwd) = std::env::current_dir() {
            settings.tool_path = cwd;
        }
    }
    if opt.timeout.is_some() {
        settings.tool_timeout_secs = opt.timeout;
    }
    settings
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();
    let settings = settings_from(&opt);
    let root = dataset_root(&opt.pattern);
    let orientation_dir = root.join(with_ori_prefix(&opt.orientations));
    if !orientation_dir.is_dir() {
        return Err(format!(
            "cannot find orientations directory {}",
            orientation_dir.display()
        )
        .into());
    }
    let gcp_path = root.join(&opt.gcp_file);
    if !gcp_path.is_file() {
        return Err(format!(
            "cannot find ground control points file {}",
            gcp_path.display()
        )
        .into());
    }

    let images = select_images(&opt.pattern)?;
    info!("{} image(s) selected", images.len());
    let catalog = GcpCatalog::load(&gcp_path)?;
    info!("{} ground control point(s) loaded", catalog.len());
    let ground_coordinates = root.join(COORDINATES_FILE_NAME);
    catalog.write_coordinates(&ground_coordinates)?;

    let timeout = settings.timeout();
    let solver = Mm3dSolver::new(&settings.tool_path, timeout);
    let metadata = Exiv2Reader::new(&settings.tool_path, timeout)?;
    let associator = Associator::new(
        &catalog,
        &root,
        &orientation_dir,
        &ground_coordinates,
        solver,
        metadata,
    );
    let map = associator.run(&images)?;

    let output_dir = root.join(&settings.output_dir);
    let written = write_associations(&map, &output_dir, settings.pattern_output)?;
    info!(
        "{} result file(s) written to {}",
        written,
        output_dir.display()
    );
    Ok(())
}

fn main() {
    pretty_env_logger::init_timed();
    if let Err(err) = try_main() {
        error!("{}", err);
        std::process::exit(1);
    }
}
