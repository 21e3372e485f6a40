//! Render the publication figures without opening a window.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use bhe_field_viewer::analysis::{
    DEFAULT_OUTLIER_THRESHOLD, daily_means, summarize, vault_outliers,
};
use bhe_field_viewer::config::{DEFAULT_DATA_ROOT, DataLayout};
use bhe_field_viewer::data::loader::{LoadOptions, Period, load_table};
use bhe_field_viewer::data::model::{BheId, Channel, FieldTable, MeasurementSeries, Resolution};
use bhe_field_viewer::figure::{Figure, FigureOptions, FigureRenderer};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "render", version, about = "Render figures of the monitoring data to PNG")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Selected exchangers of one channel on a shared time axis.
    Overlay(OverlayArgs),
    /// Temperatures and flow of one or more exchangers.
    Bhe(BheArgs),
    /// Inlet and outlet temperatures of every exchanger, grouped by vault.
    Vault(VaultArgs),
    /// Mean, spread and range of one channel per exchanger.
    Summary(SummaryArgs),
}

#[derive(Debug, Args)]
struct Source {
    /// Folder holding raw_30s/ and prepared_5min/.
    #[arg(long, default_value = DEFAULT_DATA_ROOT)]
    data_root: PathBuf,

    /// raw or prepared.
    #[arg(long, default_value = "prepared")]
    resolution: Resolution,

    /// First day (YYYY-MM-DD); all files when omitted.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day, inclusive.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Blank out no-flow periods.
    #[arg(long)]
    masked: bool,
}

#[derive(Debug, Args)]
struct Output {
    /// PNG file to write.
    #[arg(short, long)]
    output: PathBuf,

    /// Image size (WIDTHxHEIGHT).
    #[arg(long, default_value = "1200x800")]
    size: String,

    /// Leave out titles, axis labels and legends.
    #[arg(long)]
    no_annotations: bool,
}

#[derive(Debug, Args)]
struct OverlayArgs {
    #[command(flatten)]
    source: Source,
    #[command(flatten)]
    output: Output,

    /// Exchangers, e.g. 1,13,23.
    #[arg(long, value_delimiter = ',', required = true)]
    bhes: Vec<BheId>,

    /// T_in, T_out, V_dot or delta_T.
    #[arg(long, default_value = "T_in")]
    channel: Channel,

    /// Also draw the other resolution tier.
    #[arg(long)]
    compare: bool,
}

#[derive(Debug, Args)]
struct BheArgs {
    #[command(flatten)]
    source: Source,
    #[command(flatten)]
    output: Output,

    #[arg(long, value_delimiter = ',', required = true)]
    bhes: Vec<BheId>,

    /// Temperature axis limits, e.g. 0,20.
    #[arg(long, value_parser = parse_limits, allow_hyphen_values = true)]
    ylim: Option<(f64, f64)>,
}

#[derive(Debug, Args)]
struct VaultArgs {
    #[command(flatten)]
    source: Source,
    #[command(flatten)]
    output: Output,

    #[arg(long, value_parser = parse_limits, allow_hyphen_values = true)]
    ylim: Option<(f64, f64)>,

    #[arg(long, default_value = "Fluid temperatures by vault")]
    title: String,
}

#[derive(Debug, Args)]
struct SummaryArgs {
    #[command(flatten)]
    source: Source,
    #[command(flatten)]
    output: Output,

    /// Exchangers to include; all when omitted.
    #[arg(long, value_delimiter = ',')]
    bhes: Vec<BheId>,

    #[arg(long, default_value = "T_in")]
    channel: Channel,

    /// Also print the daily means of every series as CSV.
    #[arg(long)]
    daily: bool,
}

fn parse_limits(s: &str) -> std::result::Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got '{s}'"))?;
    let lo: f64 = lo.trim().parse().map_err(|_| format!("invalid limit '{lo}'"))?;
    let hi: f64 = hi.trim().parse().map_err(|_| format!("invalid limit '{hi}'"))?;
    if lo.is_nan() || hi.is_nan() || lo >= hi {
        return Err(format!("lower limit {lo} is not below upper limit {hi}"));
    }
    Ok((lo, hi))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl Source {
    fn period(&self) -> Result<Option<Period>> {
        let (start, end) = match (self.start, self.end) {
            (None, None) => return Ok(None),
            (Some(start), Some(end)) => (start, end),
            (Some(day), None) | (None, Some(day)) => (day, day),
        };
        let (Some(start), Some(end)) = (start.and_hms_opt(0, 0, 0), end.and_hms_opt(23, 59, 59))
        else {
            bail!("invalid period {start} to {end}");
        };
        Ok(Some(Period::new(start, end)?))
    }

    fn load(
        &self,
        resolution: Resolution,
        bhes: &[BheId],
        channels: &[Channel],
    ) -> Result<FieldTable> {
        let options = LoadOptions {
            period: self.period()?,
            bhes: (!bhes.is_empty()).then(|| bhes.iter().copied().collect::<BTreeSet<_>>()),
            channels: channels.to_vec(),
            masked: self.masked,
        };
        let table = load_table(&DataLayout::new(&self.data_root), resolution, &options)
            .with_context(|| format!("loading {resolution} data from {}", self.data_root.display()))?;
        Ok(table)
    }

    fn describe(&self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            (Some(day), None) | (None, Some(day)) => day.to_string(),
            (None, None) => "all months".to_string(),
        }
    }
}

impl Output {
    fn renderer(&self) -> Result<FigureRenderer> {
        let mut options = FigureOptions::default().with_size(&self.size)?;
        options.annotate = !self.no_annotations;
        Ok(FigureRenderer::new(options))
    }

    fn save(&self, figure: Result<Figure, bhe_field_viewer::Error>) -> Result<()> {
        figure
            .context("rendering figure")?
            .save(&self.output)
            .with_context(|| format!("writing {}", self.output.display()))?;
        Ok(())
    }
}

fn series_of(table: &FieldTable, bhes: &[BheId], channel: Channel) -> Vec<MeasurementSeries> {
    let series = table.channel_series(channel);
    if bhes.is_empty() {
        return series.into_values().collect();
    }
    bhes.iter().filter_map(|b| series.get(b).cloned()).collect()
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn overlay(args: OverlayArgs) -> Result<()> {
    let mut tiers = vec![args.source.resolution];
    if args.compare {
        tiers.extend(Resolution::ALL.into_iter().filter(|r| *r != args.source.resolution));
    }

    let mut series = Vec::new();
    for resolution in tiers {
        let table = args.source.load(resolution, &args.bhes, &[args.channel])?;
        series.extend(series_of(&table, &args.bhes, args.channel));
    }
    let title = format!("{} ({})", args.channel.axis_label(), args.source.describe());
    let renderer = args.output.renderer()?;
    args.output.save(renderer.overlay(&title, &series))
}

fn bhe(args: BheArgs) -> Result<()> {
    let table = args.source.load(args.source.resolution, &args.bhes, &Channel::MEASURED)?;
    let renderer = args.output.renderer()?;
    args.output
        .save(renderer.single_bhe(&table, &args.bhes, args.ylim))
}

fn vault(args: VaultArgs) -> Result<()> {
    let table = args.source.load(args.source.resolution, &[], &Channel::MEASURED)?;
    for channel in [Channel::InletTemperature, Channel::OutletTemperature] {
        let report = vault_outliers(&table, channel, DEFAULT_OUTLIER_THRESHOLD, &BTreeSet::new());
        for (bhe, misfit) in &report.misfits {
            log::warn!("BHE {bhe} {channel}: {misfit:.2} K off its vault median");
        }
    }
    let renderer = args.output.renderer()?;
    args.output
        .save(renderer.by_vault(&table, &args.title, args.ylim))
}

fn summary(args: SummaryArgs) -> Result<()> {
    let table = args.source.load(args.source.resolution, &args.bhes, &[args.channel])?;
    let series = series_of(&table, &args.bhes, args.channel);
    for s in &series {
        if let Some(stats) = summarize(s) {
            log::info!(
                "{}: mean {:.2}, min {:.2}, max {:.2}, coverage {:.0} %",
                s.label(),
                stats.mean,
                stats.min,
                stats.max,
                stats.coverage() * 100.0
            );
        }
    }
    if args.daily {
        println!("series,day,mean");
        for s in &series {
            for (day, mean) in daily_means(s) {
                println!("{},{day},{mean:.2}", s.label());
            }
        }
    }
    let title = format!("{} ({})", args.channel.axis_label(), args.source.describe());
    let renderer = args.output.renderer()?;
    args.output.save(renderer.summary(&title, &series))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Overlay(args) => overlay(args),
        Commands::Bhe(args) => bhe(args),
        Commands::Vault(args) => vault(args),
        Commands::Summary(args) => summary(args),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}
