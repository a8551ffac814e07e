use clap::{Parser, Subcommand};
use ngx_resizer::host::{InMemoryMediaLibrary, NoMedia};
use ngx_resizer::imaging::{DimensionFetcher, FetchError, ReqwestClient};
use ngx_resizer::types::{Dimensions, ImageSource, SizeSpec};
use ngx_resizer::{ImageResizer, config, output, srcset};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ngx-resizer")]
#[command(about = "Rewrite image URLs for an nginx resizing proxy")]
#[command(long_about = "\
Rewrite image URLs for an nginx resizing proxy

Images are never resized here. Instead every image URL is rewritten to ask
the proxy for the right size:

  http://site/wp-content/uploads/a.jpg?w=300&h=200&crop=1&d=<signature>
  http://site/safe_image?url=<encoded remote URL>&w=300

Local images (under uploads.base_url) are addressed directly, remote images
go through /safe_image. With a secure_link template every URL is signed the
way nginx's secure_link_md5 expects.

Run 'ngx-resizer gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Attachment data for commands that look images up.
#[derive(clap::Args, Clone)]
struct MediaArgs {
    /// JSON media library: {"<id>": {"url": ..., "width": ..., "height": ...}}
    #[arg(long)]
    media: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the proxy URL and display size of an image
    Resolve {
        /// Image URL
        url: String,
        /// Named size (thumbnail, medium, large, full, or an extra size)
        #[arg(long, conflicts_with_all = ["width", "height"])]
        size: Option<String>,
        /// Requested width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Requested height in pixels
        #[arg(long)]
        height: Option<u32>,
        /// Known width of the original
        #[arg(long, requires = "orig_height")]
        orig_width: Option<u32>,
        /// Known height of the original
        #[arg(long, requires = "orig_width")]
        orig_height: Option<u32>,
        /// Read the original size from the remote image header
        #[arg(long, conflicts_with = "orig_width")]
        fetch: bool,
    },
    /// Rewrite <img> tags in HTML read from a file or stdin
    Rewrite {
        /// HTML file, stdin when omitted
        file: Option<PathBuf>,
        /// Content width, overrides the config
        #[arg(long)]
        content_width: Option<u32>,
        #[command(flatten)]
        media: MediaArgs,
    },
    /// Rewrite the candidates of a srcset attribute
    Srcset {
        /// Attribute value, e.g. "a-300x200.jpg 300w, a-600x400.jpg 600w"
        srcset: String,
        /// Attachment the candidates belong to
        #[arg(long, requires = "media")]
        attachment: Option<u64>,
        #[command(flatten)]
        media: MediaArgs,
    },
    /// Read the dimensions of a remote image from its header
    Dimensions {
        /// Image URL
        url: String,
    },
    /// List the registered image sizes
    Sizes,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Resolve {
            url,
            size,
            width,
            height,
            orig_width,
            orig_height,
            fetch,
        } => {
            let resizer = load_resizer(&cli.config_dir)?;
            let spec = match size {
                Some(name) => SizeSpec::named(name),
                None => SizeSpec::explicit(width, height),
            };
            let dimensions = if fetch {
                let fetcher = fetcher_for(&resizer)?;
                Some(fetcher.fetch(&url)?)
            } else {
                orig_width.zip(orig_height).map(|(w, h)| Dimensions::new(w, h))
            };
            let source = ImageSource::ExternalThumbnail { url, dimensions };
            let image = resizer.resolve_downsized_image(&source, &spec, &NoMedia)?;
            output::print_resolved(&spec, &image);
        }
        Command::Rewrite {
            file,
            content_width,
            media,
        } => {
            let resizer = load_resizer(&cli.config_dir)?;
            let html = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let media = load_media(media.media.as_deref())?;
            let content_width = content_width.or(resizer.config().content_width);
            print!(
                "{}",
                resizer.rewrite_content_with_width(&html, content_width, &media)
            );
        }
        Command::Srcset {
            srcset: attr,
            attachment,
            media,
        } => {
            let resizer = load_resizer(&cli.config_dir)?;
            let media = load_media(media.media.as_deref())?;
            let candidates = srcset::parse_srcset(&attr);
            let rewritten = resizer.rewrite_srcset(&candidates, attachment, &media);
            output::print_srcset_output(&rewritten);
        }
        Command::Dimensions { url } => {
            let fetcher = fetcher_for(&load_resizer(&cli.config_dir)?)?;
            let dims = fetcher.fetch(&url)?;
            println!("{}", output::format_dimensions(&url, dims));
        }
        Command::Sizes => {
            let resizer = load_resizer(&cli.config_dir)?;
            output::print_sizes(resizer.registry());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_resizer(config_dir: &Path) -> Result<ImageResizer, config::ConfigError> {
    Ok(ImageResizer::new(config::load_config(config_dir)?))
}

fn fetcher_for(resizer: &ImageResizer) -> Result<DimensionFetcher<ReqwestClient>, FetchError> {
    let client = ReqwestClient::new(resizer.config().fetch.timeout())?;
    Ok(DimensionFetcher::new(client))
}

fn load_media(path: Option<&Path>) -> Result<InMemoryMediaLibrary, ngx_resizer::host::HostError> {
    match path {
        Some(path) => InMemoryMediaLibrary::load(path),
        None => Ok(InMemoryMediaLibrary::new()),
    }
}
