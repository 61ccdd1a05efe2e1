mod logger;
mod order;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use lopdf::Document;
use pdf_async_runtime::{LopdfBackend, Runner, SessionContext, UserProfile};
use pdf_planner::constants::{
    DEFAULT_SIGNATURE_HEIGHT, DEFAULT_SIGNATURE_WIDTH, DEFAULT_SIGNATURE_X, DEFAULT_SIGNATURE_Y,
};
use pdf_planner::{
    Operation, PagePlan, PagePlanner, RangeSpec, SignatureOptions, ToolOptions, WatermarkOptions,
    compile_range_job, load_multiple_pdfs, load_pdf, save_outputs,
};
use std::path::{Path, PathBuf};

use logger::CliLogger;

#[derive(Parser)]
#[command(name = "pdft", about = "PDF page tools CLI", version)]
struct Cli {
    /// Run with the Pro entitlement (unlocks premium tools)
    #[arg(long, global = true)]
    pro: bool,

    /// JSON options file; command line flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory the output file(s) are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output file stem (".pdf" is appended)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show page count and size of a PDF
    Info {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Combine several PDFs in the given order
    Merge {
        /// Input PDF files
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Split a PDF into page ranges
    Split {
        #[arg(short, long)]
        input: PathBuf,

        /// Ranges such as "1-3,5,8-10"
        #[arg(short, long)]
        ranges: String,

        /// Write all ranges into a single file
        #[arg(long, overrides_with = "no_merge")]
        merge: bool,

        /// Write one file per range, even if the config says to merge
        #[arg(long, overrides_with = "merge")]
        no_merge: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Remove the listed pages
    Remove {
        #[arg(short, long)]
        input: PathBuf,

        /// Pages to remove, e.g. "2,4-6"
        #[arg(short, long)]
        pages: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Keep only the listed pages
    Extract {
        #[arg(short, long)]
        input: PathBuf,

        /// Pages to keep, e.g. "1,3-4"
        #[arg(short, long)]
        pages: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Reorder, duplicate and rotate pages
    Organize {
        #[arg(short, long)]
        input: PathBuf,

        /// New page order, e.g. "3,1@90,2"
        #[arg(long, conflicts_with = "plan")]
        order: Option<String>,

        /// Load the page order from a plan file
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Save the resulting page order to a plan file
        #[arg(long)]
        save_plan: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rotate pages clockwise by a multiple of 90 degrees
    Rotate {
        #[arg(short, long)]
        input: PathBuf,

        /// Rotation in degrees (negative turns counter-clockwise)
        #[arg(short, long, allow_hyphen_values = true)]
        degrees: i64,

        /// Only rotate these pages (default: all)
        #[arg(short, long)]
        pages: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Convert JPG / PNG images into a PDF, one page per image
    Images {
        /// Input image files, in page order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Stamp a signature image on one page
    Sign {
        #[arg(short, long)]
        input: PathBuf,

        /// Signature image (PNG or JPEG)
        #[arg(long)]
        image: PathBuf,

        /// Page to sign, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Distance from the left edge in points
        #[arg(long, default_value_t = DEFAULT_SIGNATURE_X)]
        x: f32,

        /// Distance from the bottom edge in points
        #[arg(long, default_value_t = DEFAULT_SIGNATURE_Y)]
        y: f32,

        /// Drawn width in points
        #[arg(long, default_value_t = DEFAULT_SIGNATURE_WIDTH)]
        width: f32,

        /// Drawn height in points
        #[arg(long, default_value_t = DEFAULT_SIGNATURE_HEIGHT)]
        height: f32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Stamp a text watermark on every page
    Watermark {
        #[arg(short, long)]
        input: PathBuf,

        /// Watermark text
        #[arg(short, long)]
        text: Option<String>,

        /// Font size in points
        #[arg(long)]
        font_size: Option<f32>,

        /// Text color as hex, e.g. "#E6E6E6"
        #[arg(long)]
        color: Option<String>,

        /// Opacity between 0 and 1
        #[arg(long)]
        opacity: Option<f32>,

        /// Counter-clockwise angle in degrees
        #[arg(long, allow_hyphen_values = true)]
        angle: Option<f32>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Everything a tool invocation needs besides its own arguments
struct ToolContext {
    session: SessionContext,
    runner: Runner<LopdfBackend>,
    config: Option<ToolOptions>,
}

impl ToolContext {
    /// Config or the tool's default stem, overridden by `--name`
    fn options_for(&self, operation: &Operation, output: &OutputArgs) -> Result<ToolOptions> {
        let mut options = match &self.config {
            Some(config) => config.clone(),
            None => ToolOptions {
                output_name: operation.default_output_name().to_string(),
                ..Default::default()
            },
        };
        if let Some(name) = &output.name {
            options.output_name = name.clone();
        }
        options.validate()?;
        Ok(options)
    }

    /// `--merge` / `--no-merge` win over the config's default
    fn merge_ranges(&self, merge: bool, no_merge: bool) -> bool {
        merge_choice(
            merge,
            no_merge,
            self.config.as_ref().is_some_and(|c| c.merge_ranges),
        )
    }

    fn watermark_defaults(&self) -> WatermarkOptions {
        self.config
            .as_ref()
            .map(|c| c.watermark.clone())
            .unwrap_or_default()
    }

    async fn run(
        &self,
        operation: Operation,
        planner: &PagePlanner,
        sources: Vec<Document>,
        output: &OutputArgs,
    ) -> Result<Vec<PathBuf>> {
        self.session.authorize(&operation)?;
        let options = self.options_for(&operation, output)?;
        let job = operation.compile(planner)?;

        let outputs = self.runner.run(sources, job).await?;
        tokio::fs::create_dir_all(&output.output_dir)
            .await
            .with_context(|| format!("Creating {}", output.output_dir.display()))?;
        let paths = save_outputs(outputs, &output.output_dir, &options).await?;

        println!("{} → {} file(s)", operation.name(), paths.len());
        for path in &paths {
            println!("  {}", path.display());
        }
        Ok(paths)
    }
}

/// Load one document and seed a planner with its real page count
async fn load_planned(input: &Path) -> Result<(Document, PagePlanner)> {
    let source = load_pdf(input)
        .await
        .with_context(|| format!("Loading {}", input.display()))?;
    let mut planner = PagePlanner::new();
    planner.initialize(source.page_count())?;
    Ok((source.document, planner))
}

fn merge_choice(merge: bool, no_merge: bool, config_default: bool) -> bool {
    match (merge, no_merge) {
        (true, _) => true,
        (false, true) => false,
        (false, false) => config_default,
    }
}

/// Select every page named by a list like "1,3-5".
///
/// Ranges are clamped to the document the same way split ranges are.
fn select_pages(planner: &mut PagePlanner, pages: &str) -> Result<()> {
    let specs = RangeSpec::parse_list(pages)?;
    if specs.is_empty() {
        bail!("No pages given");
    }
    let job = compile_range_job(&specs, true, planner.page_count()?)?;
    for range in job.ranges() {
        for position in range.indices() {
            if !planner.is_selected(position)? {
                planner.toggle_select(position)?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    CliLogger::init(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Some(
            ToolOptions::load(path)
                .await
                .with_context(|| format!("Loading config {}", path.display()))?,
        ),
        None => None,
    };
    let ctx = ToolContext {
        session: SessionContext::new(UserProfile {
            is_pro: cli.pro,
            ..Default::default()
        }),
        runner: Runner::new(LopdfBackend),
        config,
    };

    match cli.command {
        Commands::Info { input } => {
            let source = load_pdf(&input)
                .await
                .with_context(|| format!("Loading {}", input.display()))?;
            println!("{}", input.display());
            println!("  Version: {}", source.document.version);
            println!("  Pages: {}", source.page_count());
            println!("  Size: {} bytes", source.info.size_bytes);
        }

        Commands::Merge { input, output } => {
            let sources = load_multiple_pdfs(&input).await?;
            let documents = sources.into_iter().map(|s| s.document).collect();
            ctx.run(Operation::Merge, &PagePlanner::new(), documents, &output)
                .await?;
        }

        Commands::Split {
            input,
            ranges,
            merge,
            no_merge,
            output,
        } => {
            let (document, mut planner) = load_planned(&input).await?;
            planner.set_ranges(RangeSpec::parse_list(&ranges)?)?;
            let operation = Operation::Split {
                ranges: planner.ranges()?.to_vec(),
                merge_ranges: ctx.merge_ranges(merge, no_merge),
            };
            ctx.run(operation, &planner, vec![document], &output).await?;
        }

        Commands::Remove {
            input,
            pages,
            output,
        } => {
            let (document, mut planner) = load_planned(&input).await?;
            select_pages(&mut planner, &pages)?;
            ctx.run(Operation::RemovePages, &planner, vec![document], &output)
                .await?;
        }

        Commands::Extract {
            input,
            pages,
            output,
        } => {
            let (document, mut planner) = load_planned(&input).await?;
            select_pages(&mut planner, &pages)?;
            ctx.run(Operation::ExtractPages, &planner, vec![document], &output)
                .await?;
        }

        Commands::Organize {
            input,
            order,
            plan,
            save_plan,
            output,
        } => {
            let (document, mut planner) = load_planned(&input).await?;
            let page_count = planner.page_count()?;

            if let Some(order) = order {
                planner.load_plan(&order::parse_order(&order, page_count)?)?;
            } else if let Some(path) = plan {
                let saved = PagePlan::load(&path)
                    .await
                    .with_context(|| format!("Loading plan {}", path.display()))?;
                planner.load_plan(&saved)?;
            }

            if let Some(path) = save_plan {
                planner.snapshot()?.save(&path).await?;
                println!("Saved page plan → {}", path.display());
            }

            ctx.run(Operation::Organize, &planner, vec![document], &output)
                .await?;
        }

        Commands::Rotate {
            input,
            degrees,
            pages,
            output,
        } => {
            let (document, mut planner) = load_planned(&input).await?;
            match pages {
                Some(pages) => {
                    select_pages(&mut planner, &pages)?;
                    for position in planner.selection()? {
                        planner.rotate_entry(position, degrees)?;
                    }
                }
                None => planner.rotate_all(degrees)?,
            }
            ctx.run(Operation::Rotate, &planner, vec![document], &output)
                .await?;
        }

        Commands::Images { input, output } => {
            let mut images = Vec::with_capacity(input.len());
            for path in &input {
                images.push(
                    tokio::fs::read(path)
                        .await
                        .with_context(|| format!("Reading {}", path.display()))?,
                );
            }
            ctx.run(
                Operation::ImagesToPdf { images },
                &PagePlanner::new(),
                Vec::new(),
                &output,
            )
            .await?;
        }

        Commands::Sign {
            input,
            image,
            page,
            x,
            y,
            width,
            height,
            output,
        } => {
            if page == 0 {
                bail!("Page numbers start at 1");
            }
            let image = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Reading {}", image.display()))?;
            let options = SignatureOptions {
                page: page - 1,
                x,
                y,
                width,
                height,
                image,
            };

            let (document, planner) = load_planned(&input).await?;
            ctx.run(Operation::Sign(options), &planner, vec![document], &output)
                .await?;
        }

        Commands::Watermark {
            input,
            text,
            font_size,
            color,
            opacity,
            angle,
            output,
        } => {
            let mut watermark = ctx.watermark_defaults();
            if let Some(text) = text {
                watermark.text = text;
            }
            if let Some(font_size) = font_size {
                watermark.font_size = font_size;
            }
            if let Some(color) = color {
                watermark.color = WatermarkOptions::parse_hex_color(&color)?;
            }
            if let Some(opacity) = opacity {
                watermark.opacity = opacity;
            }
            if let Some(angle) = angle {
                watermark.angle_degrees = angle;
            }

            let (document, planner) = load_planned(&input).await?;
            ctx.run(
                Operation::Watermark(watermark),
                &planner,
                vec![document],
                &output,
            )
            .await?;
        }
    }

    Ok(())
}
