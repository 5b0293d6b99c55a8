use clap::{Parser, Subcommand};
use slider_media::config::SliderConfig;
use slider_media::generator::ResponsiveImageGenerator;
use slider_media::store::{BreakpointRepository, CropRepository, JsonStore};
use slider_media::types::ResponsiveCrop;
use slider_media::upload::{UploadCompressedImages, UploadFiles, UploadParams, UploadedFile};
use slider_media::{breakpoints, config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slider-media")]
#[command(about = "Responsive images for banner sliders")]
#[command(long_about = "\
Responsive images for banner sliders

Each banner crop is cut out of its source image per breakpoint, resized to
the breakpoint width, and converted to WebP and AVIF when an encoder is
available. Generated files land in the media directory:

  media/banner_slider/responsive/<banner id>/<breakpoint>_<hash>.<ext>

Optional cwebp/cavif binaries are picked up from <root>/vendor/bin.
Set RUST_LOG (e.g. RUST_LOG=debug) to change log verbosity.

Run 'slider-media gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Application root (holds config.toml, the media directory, vendor/bin)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Crop parameters submitted with an upload.
#[derive(clap::Args, Clone)]
struct CropArgs {
    #[arg(long)]
    crop_x: Option<u32>,
    #[arg(long)]
    crop_y: Option<u32>,
    #[arg(long)]
    crop_width: Option<u32>,
    #[arg(long)]
    crop_height: Option<u32>,
    #[arg(long)]
    webp_quality: Option<u32>,
    #[arg(long)]
    avif_quality: Option<u32>,
}

impl From<CropArgs> for UploadParams {
    fn from(args: CropArgs) -> Self {
        UploadParams {
            crop_x: args.crop_x,
            crop_y: args.crop_y,
            crop_width: args.crop_width,
            crop_height: args.crop_height,
            webp_quality: args.webp_quality,
            avif_quality: args.avif_quality,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Show which crop adapter and derivative formats are available
    Formats,
    /// Create the default desktop/tablet/mobile breakpoints for a slider
    SeedBreakpoints {
        #[arg(long)]
        slider: u32,
    },
    /// Regenerate every crop of a banner
    Generate {
        #[arg(long)]
        banner: u32,
    },
    /// Regenerate a single crop
    GenerateCrop {
        #[arg(long)]
        crop: u32,
    },
    /// Store client-compressed images for a crop
    Upload {
        #[arg(long)]
        crop: u32,
        /// Cropped primary image
        #[arg(long)]
        cropped: Option<PathBuf>,
        /// MIME type of the cropped image (default image/jpeg)
        #[arg(long, requires = "cropped")]
        mime: Option<String>,
        #[arg(long)]
        webp: Option<PathBuf>,
        #[arg(long)]
        avif: Option<PathBuf>,
        #[command(flatten)]
        params: CropArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Formats => {
            let app = App::load(&cli.root)?;
            let converter = app.generator.converter();
            output::print_formats(
                converter.supported_formats(),
                app.generator.crop_processor().available_adapter_name(),
                converter.bin_dir(),
            );
        }
        Command::SeedBreakpoints { slider } => {
            let app = App::load(&cli.root)?;
            let created = breakpoints::create_for_slider(&app.store, slider);
            output::print_breakpoints(&created);
        }
        Command::Generate { banner } => {
            let app = App::load(&cli.root)?;
            let total = app.store.crops_for_banner(banner)?.len();
            let crops = app
                .generator
                .generate_for_banner(&app.store, &app.store, banner)?;
            output::print_generate_output(banner, &crops, total);
        }
        Command::GenerateCrop { crop } => {
            let app = App::load(&cli.root)?;
            let generated = app.generate_one(crop)?;
            output::print_crop(&generated);
        }
        Command::Upload {
            crop,
            cropped,
            mime,
            webp,
            avif,
            params,
        } => {
            let app = App::load(&cli.root)?;
            let files = UploadFiles {
                cropped: cropped.map(|p| UploadedFile::new(p, mime.as_deref())),
                webp: webp.map(|p| UploadedFile::new(p, None)),
                avif: avif.map(|p| UploadedFile::new(p, None)),
            };
            let uploader = UploadCompressedImages::new(&app.generator)
                .with_max_file_size(app.config.upload.max_file_size);
            let stored = uploader.upload(&app.store, &app.store, crop, &files, &params.into())?;
            output::print_crop(&stored);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Everything a command needs, wired from `config.toml`.
struct App {
    config: SliderConfig,
    generator: ResponsiveImageGenerator,
    store: JsonStore,
}

impl App {
    fn load(root: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config = config::load_config(root)?;
        let generator = ResponsiveImageGenerator::from_config(root, &config);
        let store = JsonStore::open(config.store_path(root))?;
        Ok(Self {
            config,
            generator,
            store,
        })
    }

    fn generate_one(&self, crop_id: u32) -> Result<ResponsiveCrop, Box<dyn std::error::Error>> {
        let mut crop = self
            .store
            .get_crop(crop_id)?
            .ok_or_else(|| format!("Crop {crop_id} not found"))?;
        let breakpoint = self
            .store
            .get_breakpoint(crop.breakpoint_id)?
            .ok_or_else(|| format!("Breakpoint {} not found", crop.breakpoint_id))?;
        self.generator.generate(&mut crop, &breakpoint)?;
        self.store.save_crop(&mut crop)?;
        Ok(crop)
    }
}

/// Compact logs on stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
