use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use genomeshader_core::{Axis, VariantOrdering};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use config::{Config, Overrides};
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "genomeshader")]
#[command(about = "GenomeShader - haplotype flow diagrams for variant loci")]
#[command(version)]
#[command(long_about = "
GenomeShader draws phased genotypes at a locus as an alluvial flow diagram:
one column of allele nodes per variant, ribbons for haplotypes passing
between neighbouring variants, and expandable gaps for insertions.

Examples:
  genomeshader render --input variants.json.gz --locus chr6:31,972,046-32,055,647 --out flow.svg
  genomeshader render --input variants.json --expand 12 --select 12:alt1 --axis vertical --out flow.png
  genomeshader transitions --input variants.json --src 12 --dst 13
  genomeshader config --example > genomeshader.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the flow diagram for a locus to SVG or PNG
    Render {
        /// Variant payload (.json or .json.gz)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (.svg or .png)
        #[arg(short, long)]
        out: PathBuf,

        /// Output format; detected from the extension when omitted
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Locus as chr:start-end or chr:pos; defaults to the span of the input
        #[arg(short, long)]
        locus: Option<String>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// Flow direction of the track
        #[arg(long)]
        axis: Option<AxisArg>,

        /// Column placement
        #[arg(long)]
        ordering: Option<OrderingArg>,

        /// Insertion variant ids to expand
        #[arg(long, value_delimiter = ',')]
        expand: Vec<u64>,

        /// Alleles to highlight, as id:allele (e.g. 12:alt1)
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        /// Node order for a variant, as id=allele/allele/... (e.g. 15=alt2/ref/alt1)
        #[arg(long)]
        order: Vec<String>,

        /// Ribbon tessellation segments
        #[arg(long)]
        segments: Option<u32>,

        /// Width multiplier for expanded insertions
        #[arg(long)]
        expansion_factor: Option<f64>,

        /// Title drawn at the top (SVG only)
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        no_legend: bool,

        #[arg(long)]
        no_scale_bar: bool,

        /// Omit the timestamped footer, for reproducible output
        #[arg(long)]
        no_footer: bool,

        /// Rasterise PNG output on the GPU when one is available
        #[arg(long)]
        gpu: bool,
    },

    /// Print the transition matrices for two variants as JSON
    Transitions {
        /// Variant payload (.json or .json.gz)
        #[arg(short, long)]
        input: PathBuf,

        /// Source variant id
        #[arg(long)]
        src: u64,

        /// Destination variant id
        #[arg(long)]
        dst: u64,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration helpers
    Config {
        /// Print an example genomeshader.toml
        #[arg(long)]
        example: bool,

        /// Write the example to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Svg,
    Png,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AxisArg {
    Horizontal,
    Vertical,
}

impl From<AxisArg> for Axis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Horizontal => Axis::Horizontal,
            AxisArg::Vertical => Axis::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderingArg {
    Genomic,
    EqualSpacing,
}

impl From<OrderingArg> for VariantOrdering {
    fn from(arg: OrderingArg) -> Self {
        match arg {
            OrderingArg::Genomic => VariantOrdering::Genomic,
            OrderingArg::EqualSpacing => VariantOrdering::EqualSpacing,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => print_error_and_exit(cli_err),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render {
            input,
            out,
            format,
            locus,
            width,
            height,
            axis,
            ordering,
            expand,
            select,
            order,
            segments,
            expansion_factor,
            title,
            no_legend,
            no_scale_bar,
            no_footer,
            gpu,
        } => {
            let mut config = Config::load(cli.config.as_deref())?;
            config.apply_overrides(&Overrides {
                width,
                height,
                axis: axis.map(Axis::from),
                ordering: ordering.map(VariantOrdering::from),
                segments,
                expansion_factor,
                no_legend,
                no_scale_bar,
                no_footer,
            });
            config.validate()?;

            commands::render::execute(
                &config,
                commands::render::RenderArgs {
                    input,
                    output: out,
                    format,
                    locus,
                    expand,
                    select,
                    order,
                    title,
                    gpu,
                },
            )
        }
        Commands::Transitions { input, src, dst, out } => {
            commands::transitions::execute(&input, src, dst, out.as_deref())
        }
        Commands::Config { example, out } => {
            if !example {
                let config = Config::load(cli.config.as_deref())?;
                println!("{}", toml::to_string_pretty(&config).map_err(CliError::from)?);
                return Ok(());
            }
            let text = Config::example_toml()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, text).map_err(CliError::from)?;
                    log::info!("Wrote example configuration to {}", path.display());
                }
                None => print!("{}", text),
            }
            Ok(())
        }
    }
}
