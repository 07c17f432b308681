use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser};
use globset::{Glob, GlobSetBuilder};
use serde::Deserialize;
use tracing::{error, info, warn};
use treepack_core::{
    ImageDescriptor, PackOutput, PackerConfig, SortOrder, open_descriptor, pack_images,
    pack_layout, path_key,
};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "treepack",
    about = "Pack a directory of images into fixed-size atlas pages",
    version,
    author
)]
struct Cli {
    // Input/Output
    /// Root directory of source images (a single image file is also accepted)
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = ".", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Page base name; files are <name>-<page>.png/.txt [default: media-<page width>]
    #[arg(short, long, help_heading = "Input/Output")]
    name: Option<String>,
    /// YAML config file path (flags given on the command line win)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Layout
    /// Page width [default: 2048]
    #[arg(long, help_heading = "Layout")]
    page_width: Option<u32>,
    /// Page height [default: 2048]
    #[arg(long, help_heading = "Layout")]
    page_height: Option<u32>,
    /// Gap between packed images [default: 0]
    #[arg(long, help_heading = "Layout")]
    padding: Option<u32>,
    /// Sort order: area_desc|max_side_desc|height_desc|width_desc|name_asc|none [default: area_desc]
    #[arg(long, help_heading = "Layout")]
    sort_order: Option<String>,
    /// Decode images in parallel (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    parallel: bool,

    // Export
    /// Layout-only: read image sizes, write indices (no PNGs)
    #[arg(long, default_value_t = false, help_heading = "Export")]
    layout_only: bool,
    /// Also write <name>.json with every page and placement
    #[arg(long, default_value_t = false, help_heading = "Export")]
    json: bool,
    /// Export packing stats and skipped images (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print every page index to stdout
    #[arg(long, default_value_t = true, action = ArgAction::Set, help_heading = "Export")]
    print: bool,
    /// Exit with status 2 if any image could not be placed
    #[arg(long, default_value_t = false, help_heading = "Export")]
    strict: bool,
    /// Print the merged configuration (after YAML/flags) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: compute layout and stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,

    // Logging/UX
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action = ArgAction::Set, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(short, long, default_value_t = false, help_heading = "Logging/UX")]
    quiet: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    run(&cli, cli.progress && !cli.quiet)
}

fn run(cli: &Cli, show_progress: bool) -> anyhow::Result<ExitCode> {
    let cfg = build_config(cli)?;
    cfg.validate()?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.dry_run {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    }

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)
        .with_context(|| format!("scan {}", cli.input.display()))?;
    if paths.is_empty() {
        anyhow::bail!("no image files found under {}", cli.input.display());
    }
    info!(count = paths.len(), "discovered image files");

    let started = Instant::now();
    let out = if cli.layout_only {
        let sizes = read_sizes_with_progress(&paths, show_progress);
        pack_layout(sizes, cfg.clone())?
    } else {
        let inputs = load_images(&paths, &cfg, show_progress);
        info!(count = inputs.len(), "loaded input images");
        pack_images(inputs, cfg.clone())?
    };
    info!(elapsed = %fmt_dur(started.elapsed()), "packed");

    let name = cli
        .name
        .clone()
        .unwrap_or_else(|| format!("media-{}", cfg.page_width));
    if !cli.dry_run {
        write_pages(&out, &cli.out_dir, &name, !cli.layout_only)?;
    }

    if cli.print && !cli.quiet {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        for p in &out.pages {
            treepack_core::write_index(&p.page, &mut lock)?;
        }
        lock.flush()?;
    }

    let stats = out.stats();
    info!(
        pages = stats.num_pages,
        placed = out.report.placed,
        skipped = out.report.skipped.len(),
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        "stats"
    );

    if cli.json && !cli.dry_run {
        let json_path = cli.out_dir.join(format!("{}.json", name));
        let json = serde_json::to_string_pretty(&treepack_core::to_json(&out.atlas))?;
        fs::write(&json_path, json).with_context(|| format!("write {}", json_path.display()))?;
        info!(?json_path, pages = out.pages.len(), "atlas written");
    }

    if let Some(stats_path) = &cli.export_stats {
        let value = serde_json::json!({ "stats": stats, "report": &out.report });
        fs::write(stats_path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
        info!(?stats_path, "stats exported");
    }

    Ok(exit_code(&out, cli.strict))
}

fn exit_code(out: &PackOutput, strict: bool) -> ExitCode {
    if let Err(e) = out.report.check() {
        error!(error = %e, "packing defect");
        return ExitCode::from(2);
    }
    if strict && !out.report.all_placed() {
        warn!(skipped = out.report.skipped.len(), "not every image was placed");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

fn write_pages(out: &PackOutput, out_dir: &Path, name: &str, images: bool) -> anyhow::Result<()> {
    for p in &out.pages {
        if images {
            let png_path = out_dir.join(format!("{}-{}.png", name, p.page.id));
            p.save_image(&png_path)
                .with_context(|| format!("write {}", png_path.display()))?;
            info!(?png_path, id = p.page.id, "wrote page");
        }
        let txt_path = out_dir.join(format!("{}-{}.txt", name, p.page.id));
        p.save_index(&txt_path)
            .with_context(|| format!("write {}", txt_path.display()))?;
        info!(?txt_path, id = p.page.id, "wrote index");
    }
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<PackerConfig> {
    let mut cfg = PackerConfig::default();
    if let Some(path) = &cli.config {
        let file =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_packer_config(cfg)?;
    }
    if let Some(v) = cli.page_width {
        cfg.page_width = v;
    }
    if let Some(v) = cli.page_height {
        cfg.page_height = v;
    }
    if let Some(v) = cli.padding {
        cfg.padding = v;
    }
    if let Some(v) = &cli.sort_order {
        cfg.sort_order = parse_sort_order(v)?;
    }
    if cli.parallel {
        cfg.parallel = true;
    }
    cfg.compose = !cli.layout_only;
    Ok(cfg)
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("input {} does not exist", path.display());
    }
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        // Descending names, depth-first: a directory's files follow it directly.
        let walker = WalkDir::new(path).sort_by(|a, b| b.file_name().cmp(a.file_name()));
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = path_key(p);
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

fn progress_bar(len: usize, what: &str, show: bool) -> Option<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};
    if !show {
        return None;
    }
    let b = ProgressBar::new(len as u64);
    let template = format!(
        "{{spinner:.green}} {} {{pos}}/{{len}} [{{elapsed_precise}}] {{wide_msg}}",
        what
    );
    if let Ok(style) = ProgressStyle::with_template(&template) {
        b.set_style(style);
    }
    Some(b)
}

fn load_images(paths: &[PathBuf], cfg: &PackerConfig, progress: bool) -> Vec<ImageDescriptor> {
    if cfg.parallel {
        return treepack_core::load_descriptors(paths, true);
    }
    let bar = progress_bar(paths.len(), "loading", progress);
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        if let Some(b) = &bar {
            let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
            b.set_message(msg.to_string());
        }
        match open_descriptor(p, path_key(p)) {
            Ok(d) => list.push(d),
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    list
}

fn read_sizes_with_progress(paths: &[PathBuf], progress: bool) -> Vec<(String, u32, u32)> {
    let bar = progress_bar(paths.len(), "reading", progress);
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        match image::image_dimensions(p) {
            Ok((w, h)) => list.push((path_key(p), w, h)),
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    list
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_millis();
    if ms >= 1000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format!("{}ms", ms)
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    page_width: Option<u32>,
    page_height: Option<u32>,
    padding: Option<u32>,
    sort_order: Option<String>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn into_packer_config(self, mut cfg: PackerConfig) -> anyhow::Result<PackerConfig> {
        if let Some(v) = self.page_width {
            cfg.page_width = v;
        }
        if let Some(v) = self.page_height {
            cfg.page_height = v;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.sort_order {
            cfg.sort_order = parse_sort_order(&v)?;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        Ok(cfg)
    }
}

fn parse_sort_order(s: &str) -> anyhow::Result<SortOrder> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown sort order: {}", s))
}
