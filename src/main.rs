//! Arcsys CLI - Command-line tool for Arc System Works game files.
//!
//! This is the main entry point for the arcsys command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use arcsys::pac::DEFAULT_MIN_NAME_WIDTH;
use arcsys::prelude::*;
use arcsys::vfs::{obfuscation, PATH_SEPARATOR};

/// Arcsys - Arc System Works archive, image and palette tool
#[derive(Parser)]
#[command(name = "arcsys")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON tree options (byte caching, MD5 key table)
    #[arg(long, global = true, env = "ARCSYS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the members of a container
    List {
        /// Container file
        #[arg(short, long, env = "INPUT_PAC")]
        input: PathBuf,

        /// Descend into nested containers
        #[arg(short, long)]
        recursive: bool,
    },

    /// Extract the members of a container
    Extract {
        /// Container file
        #[arg(short, long, env = "INPUT_PAC")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, env = "OUTPUT_FOLDER")]
        output: PathBuf,

        /// Filter pattern (glob) on member paths, e.g. "*.hip"
        #[arg(short, long)]
        filter: Option<String>,

        /// Unpack nested containers into folders
        #[arg(short, long)]
        nested: bool,

        /// Also write the member order to this manifest
        #[arg(long)]
        order: Option<PathBuf>,
    },

    /// Pack a folder into a container
    Pack {
        /// Input folder; sub-folders become nested containers
        #[arg(short, long)]
        input: PathBuf,

        /// Output container file
        #[arg(short, long)]
        output: PathBuf,

        /// File-order manifest
        #[arg(long)]
        order: Option<PathBuf>,

        /// Store a name hash with every entry
        #[arg(long)]
        name_id: bool,

        /// Store name hashes with 64-byte name fields
        #[arg(long, conflicts_with = "name_id")]
        extended_name_id: bool,

        /// Minimum name field width
        #[arg(long, default_value_t = DEFAULT_MIN_NAME_WIDTH)]
        min_name_width: usize,

        /// Write a big-endian container
        #[arg(long)]
        big_endian: bool,
    },

    /// Write the member order of a container as a manifest
    Order {
        /// Container file
        #[arg(short, long)]
        input: PathBuf,

        /// Output manifest (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a HIP image to PNG
    HipExport {
        /// HIP file, or the container holding it
        #[arg(short, long)]
        input: PathBuf,

        /// Member path inside the container, e.g. "chr.pac:chr_00.hip"
        #[arg(short, long)]
        member: Option<String>,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Keep the full canvas instead of the image rectangle
        #[arg(long)]
        canvas: bool,

        /// HPL palette to use instead of the embedded one
        #[arg(long)]
        palette: Option<PathBuf>,
    },

    /// Convert a PNG to a HIP image
    HipImport {
        /// Input PNG file
        #[arg(short, long)]
        input: PathBuf,

        /// Output HIP file
        #[arg(short, long)]
        output: PathBuf,

        /// Pixel encoding
        #[arg(short, long, value_enum, default_value_t = Encoding::RawRepeat)]
        encoding: Encoding,

        /// Copy layer placement and byte order from this HIP
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Place the image on a canvas
        #[arg(long)]
        layered: bool,

        #[arg(long, default_value_t = 0, requires = "layered")]
        offset_x: i32,

        #[arg(long, default_value_t = 0, requires = "layered")]
        offset_y: i32,

        /// Canvas width (rounded up from the image when 0)
        #[arg(long, default_value_t = 0, requires = "layered")]
        canvas_width: i32,

        /// Canvas height (rounded up from the image when 0)
        #[arg(long, default_value_t = 0, requires = "layered")]
        canvas_height: i32,

        /// Write a big-endian image
        #[arg(long)]
        big_endian: bool,
    },

    /// Save the palette of an indexed HIP image as HPL
    Palette {
        /// HIP file, or the container holding it
        #[arg(short, long)]
        input: PathBuf,

        /// Member path inside the container
        #[arg(short, long)]
        member: Option<String>,

        /// Output HPL file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove every obfuscation layer from a file
    Decrypt {
        /// Input file; its name selects the layers that apply
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply an obfuscation cipher to a file
    Encrypt {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum)]
        cipher: Cipher,

        /// Name the cipher is keyed by (defaults to the output file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Decompress a SEGS blob
    Segs {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Raw,
    RawRepeat,
}

impl From<Encoding> for HipEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Raw => HipEncoding::Raw,
            Encoding::RawRepeat => HipEncoding::RawRepeat,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Cipher {
    /// Whole-container FPAC cipher
    Fpac,
    /// MD5-keyed XOR stream
    Md5,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::List { input, recursive } => {
            cmd_list(options, &input, recursive)?;
        }
        Commands::Extract {
            input,
            output,
            filter,
            nested,
            order,
        } => {
            cmd_extract(options, &input, &output, filter.as_deref(), nested, order.as_deref())?;
        }
        Commands::Pack {
            input,
            output,
            order,
            name_id,
            extended_name_id,
            min_name_width,
            big_endian,
        } => {
            let mut parameters = Parameters::DEFAULT;
            if extended_name_id {
                parameters |= Parameters::GENERATE_EXTENDED_NAME_ID;
            } else if name_id {
                parameters |= Parameters::GENERATE_NAME_ID;
            }
            let order = order
                .map(|path| {
                    FileOrder::read(&path)
                        .with_context(|| format!("Failed to read manifest {}", path.display()))
                })
                .transpose()?;
            let build = BuildOptions {
                parameters,
                min_name_width,
                endian: endian(big_endian),
                order,
            };
            cmd_pack(&input, &output, &build)?;
        }
        Commands::Order { input, output } => {
            cmd_order(options, &input, output.as_deref())?;
        }
        Commands::HipExport {
            input,
            member,
            output,
            canvas,
            palette,
        } => {
            cmd_hip_export(
                options,
                &input,
                member.as_deref(),
                &output,
                canvas,
                palette.as_deref(),
            )?;
        }
        Commands::HipImport {
            input,
            output,
            encoding,
            reference,
            layered,
            offset_x,
            offset_y,
            canvas_width,
            canvas_height,
            big_endian,
        } => {
            let encode = match reference {
                Some(path) => {
                    let data = fs::read(&path).context("Failed to read reference HIP")?;
                    let header = HipHeader::parse(&data, None, data.len())
                        .context("Reference is not a HIP image")?;
                    EncodeOptions::from_reference(&header, encoding.into())
                }
                None => EncodeOptions {
                    encoding: encoding.into(),
                    layered,
                    offset_x,
                    offset_y,
                    canvas_width,
                    canvas_height,
                    palette: None,
                    endian: endian(big_endian),
                },
            };
            cmd_hip_import(&input, &output, &encode)?;
        }
        Commands::Palette {
            input,
            member,
            output,
        } => {
            cmd_palette(options, &input, member.as_deref(), &output)?;
        }
        Commands::Decrypt { input, output } => {
            cmd_decrypt(options, &input, &output)?;
        }
        Commands::Encrypt {
            input,
            output,
            cipher,
            name,
        } => {
            cmd_encrypt(&options, &input, &output, cipher, name.as_deref())?;
        }
        Commands::Segs { input, output } => {
            cmd_segs(options, &input, &output)?;
        }
    }

    Ok(())
}

fn endian(big: bool) -> Endian {
    if big {
        Endian::Big
    } else {
        Endian::Little
    }
}

fn load_options(config: Option<&Path>) -> Result<TreeOptions> {
    match config {
        Some(path) => TreeOptions::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(TreeOptions::default()),
    }
}

/// Open `input` as a tree root and find `member` below it.
fn open_node(tree: &mut VirtualTree, input: &Path, member: Option<&str>) -> Result<NodeId> {
    let root = tree
        .open_file(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    match member {
        Some(path) => tree
            .lookup(root, path)?
            .with_context(|| format!("No member {path} in {}", input.display())),
        None => Ok(root),
    }
}

fn cmd_list(mut options: TreeOptions, input: &Path, recursive: bool) -> Result<()> {
    options.cache_bytes = true;
    let mut tree = VirtualTree::new(options)?;
    let root = open_node(&mut tree, input, None)?;

    let nodes = if recursive {
        tree.walk(root)?
    } else {
        tree.children(root)?.into_iter().map(|id| (id, 1)).collect()
    };

    let mut count = 0;
    for (id, depth) in nodes {
        if id == root {
            continue;
        }
        let info = tree.info(id);
        println!(
            "{:indent$}{:<32} {:>10} {:<10} {}",
            "",
            info.name,
            info.length,
            info.kind.as_str(),
            info.obfuscation,
            indent = (depth - 1) * 2
        );
        count += 1;
    }

    println!("\nTotal: {} entries", count);

    Ok(())
}

/// Output path of a member: container names become folders, minus `.pac`.
fn member_path(tree: &VirtualTree, root: NodeId, id: NodeId) -> PathBuf {
    let relative = tree.path(id)[tree.path(root).len()..].trim_start_matches(PATH_SEPARATOR);
    let mut parts: Vec<&str> = relative.split(PATH_SEPARATOR).collect();
    let file = parts.pop().unwrap_or_default();

    let mut path: PathBuf = parts
        .into_iter()
        .map(|part| part.strip_suffix(".pac").unwrap_or(part))
        .collect();
    path.push(file);
    path
}

/// Extraction reads members in parallel; container bytes are cached so that
/// each container is decrypted once.
fn cmd_extract(
    mut options: TreeOptions,
    input: &Path,
    output: &Path,
    filter: Option<&str>,
    nested: bool,
    order: Option<&Path>,
) -> Result<()> {
    println!("Opening container: {}", input.display());

    let start = Instant::now();
    options.cache_bytes = true;
    let mut tree = VirtualTree::new(options)?;
    let root = open_node(&mut tree, input, None)?;

    let pattern = filter
        .map(glob::Pattern::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let nodes = if nested {
        tree.walk(root)?
    } else {
        tree.children(root)?.into_iter().map(|id| (id, 1)).collect()
    };

    let mut leaves = Vec::new();
    for (id, depth) in nodes {
        if depth == 0 {
            continue;
        }
        let is_folder = nested
            && tree.kind(id).is_container()
            && tree.children(id).map(|c| !c.is_empty()).unwrap_or(false);
        if is_folder {
            continue;
        }
        let relative = member_path(&tree, root, id);
        let matches = pattern.as_ref().map_or(true, |p| {
            p.matches(&relative.to_string_lossy().replace('\\', "/"))
        });
        if matches {
            leaves.push((id, output.join(relative)));
        }
    }

    println!("Listed {} members in {:?}", leaves.len(), start.elapsed());
    println!("Extracting {} members...", leaves.len());

    let pb = ProgressBar::new(leaves.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    fs::create_dir_all(output)?;

    let start = Instant::now();
    let errors = AtomicUsize::new(0);
    leaves.par_iter().for_each(|(id, path)| {
        let result = tree.read(*id).map_err(anyhow::Error::from).and_then(|data| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &data)?;
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(member = tree.path(*id), error = %e, "extraction failed");
            errors.fetch_add(1, Ordering::Relaxed);
        }
        pb.inc(1);
    });

    pb.finish_with_message("Done");
    println!(
        "Extraction completed in {:?} ({} errors)",
        start.elapsed(),
        errors.load(Ordering::Relaxed)
    );

    if let Some(order_path) = order {
        let manifest = tree.file_order(root)?;
        manifest
            .write(order_path)
            .with_context(|| format!("Failed to write manifest {}", order_path.display()))?;
        println!("Member order written to {}", order_path.display());
    }

    Ok(())
}

fn cmd_pack(input: &Path, output: &Path, options: &BuildOptions) -> Result<()> {
    println!("Packing: {} -> {}", input.display(), output.display());

    let start = Instant::now();
    let data = arcsys::pac::pack_folder(input, options).context("Failed to pack folder")?;
    fs::write(output, &data).context("Failed to write output file")?;

    println!("Packed {} bytes in {:?}", data.len(), start.elapsed());

    Ok(())
}

fn cmd_order(options: TreeOptions, input: &Path, output: Option<&Path>) -> Result<()> {
    let mut tree = VirtualTree::new(options)?;
    let root = open_node(&mut tree, input, None)?;
    let manifest = tree.file_order(root)?;

    match output {
        Some(path) => manifest.write(path).context("Failed to write manifest")?,
        None => print!("{}", manifest.to_text()),
    }

    Ok(())
}

fn cmd_hip_export(
    options: TreeOptions,
    input: &Path,
    member: Option<&str>,
    output: &Path,
    canvas: bool,
    palette: Option<&Path>,
) -> Result<()> {
    let palette_override = palette
        .map(|path| -> Result<Vec<Argb>> {
            let data = fs::read(path).context("Failed to read palette file")?;
            let hpl = HplPalette::parse(&data, None, data.len()).context("Not an HPL palette")?;
            Ok(hpl.palette)
        })
        .transpose()?;

    let mut tree = VirtualTree::new(options)?;
    let id = open_node(&mut tree, input, member)?;
    let decode = DecodeOptions {
        keep_canvas: canvas,
        palette_override,
    };
    let bitmap = tree.image(id, &decode).context("Failed to decode HIP image")?;

    println!(
        "Decoded {}: {}x{} {:?}",
        tree.path(id),
        bitmap.width,
        bitmap.height,
        bitmap.format
    );

    let png = image::RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.to_rgba8())
        .context("Pixel buffer does not match the image size")?;
    png.save(output).context("Failed to write PNG")?;

    Ok(())
}

fn cmd_hip_import(input: &Path, output: &Path, options: &EncodeOptions) -> Result<()> {
    let png = image::open(input).context("Failed to read PNG")?.to_rgba8();
    let bitmap = Bitmap::from_rgba8(png.width(), png.height(), png.as_raw())?;
    let data = arcsys::image::hip::encode(&bitmap, options).context("Failed to encode HIP")?;
    fs::write(output, &data).context("Failed to write output file")?;

    println!(
        "Encoded {}x{} as {:?}: {} bytes",
        bitmap.width,
        bitmap.height,
        options.encoding,
        data.len()
    );

    Ok(())
}

fn cmd_palette(
    options: TreeOptions,
    input: &Path,
    member: Option<&str>,
    output: &Path,
) -> Result<()> {
    let mut tree = VirtualTree::new(options)?;
    let id = open_node(&mut tree, input, member)?;
    let header = tree.hip_header(id).context("Not a HIP image")?;
    let palette = tree.hip_palette(id).context("Failed to read palette")?;

    fs::write(output, HplPalette::encode(&palette, header.endian))
        .context("Failed to write output file")?;
    println!("Wrote {} colors to {}", palette.len(), output.display());

    Ok(())
}

fn cmd_decrypt(options: TreeOptions, input: &Path, output: &Path) -> Result<()> {
    let mut tree = VirtualTree::new(options)?;
    let id = open_node(&mut tree, input, None)?;
    let data = tree.read(id).context("Failed to resolve file")?;

    fs::write(output, &data).context("Failed to write output file")?;
    println!(
        "Removed {} ({} -> {} bytes)",
        tree.obfuscation(id),
        tree.length(id),
        data.len()
    );

    Ok(())
}

fn cmd_encrypt(
    options: &TreeOptions,
    input: &Path,
    output: &Path,
    cipher: Cipher,
    name: Option<&str>,
) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;
    let name = match name {
        Some(name) => name.to_string(),
        None => output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Output has no file name to key the cipher with")?,
    };

    let sealed = match cipher {
        Cipher::Fpac => obfuscation::fpac_encrypt(&data, &name),
        Cipher::Md5 => {
            let key = options.md5_key()?;
            obfuscation::md5_encrypt(&data, &name, &key)?
                .with_context(|| format!("{name} does not name an MD5-keyed file"))?
        }
    };

    fs::write(output, sealed).context("Failed to write output file")?;
    println!("Encrypted {} as {}", input.display(), name);

    Ok(())
}

fn cmd_segs(options: TreeOptions, input: &Path, output: &Path) -> Result<()> {
    let mut tree = VirtualTree::new(options)?;
    let id = open_node(&mut tree, input, None)?;
    let data = tree.segs(id).context("Failed to decompress SEGS blob")?;

    fs::write(output, &data).context("Failed to write output file")?;
    println!("Decompressed {} -> {} bytes", tree.length(id), data.len());

    Ok(())
}
