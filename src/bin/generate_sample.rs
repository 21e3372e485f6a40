//! Write a synthetic raw month so the tools can be tried without the archive.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use bhe_field_viewer::config::{DEFAULT_DATA_ROOT, DataLayout};
use bhe_field_viewer::data::loader::month_file_name;
use bhe_field_viewer::data::model::{BheId, Channel, ColumnKey, FieldTable, Resolution};
use bhe_field_viewer::data::writer::write_table;
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Parser)]
#[command(name = "generate_sample", version, about = "Write a synthetic raw monthly file")]
struct Args {
    #[arg(long, default_value = DEFAULT_DATA_ROOT)]
    data_root: PathBuf,

    #[arg(long, default_value_t = 2021)]
    year: i32,

    #[arg(long, default_value_t = 8)]
    month: u32,

    /// Number of days to generate; the whole month when omitted.
    #[arg(long)]
    days: Option<u32>,

    /// Exchangers to include, e.g. 1,2,13; all 40 when omitted.
    #[arg(long, value_delimiter = ',')]
    bhes: Vec<BheId>,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Undisturbed ground temperature (°C).
const GROUND: f64 = 11.0;
/// Heat pump cycle: runs for `ON_HOURS` of every `CYCLE_HOURS`.
const CYCLE_HOURS: i64 = 6;
const ON_HOURS: i64 = 2;
/// Share of samples lost by the logger.
const DROPOUT: f64 = 0.001;

struct Exchanger {
    bhe: BheId,
    nominal_flow: f64,
    offset: f64,
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

fn generate(
    start: NaiveDateTime,
    n_samples: usize,
    bhes: &[BheId],
    rng: &mut StdRng,
) -> Result<FieldTable> {
    let step = Resolution::Raw30s.step_seconds();
    let timestamps: Vec<NaiveDateTime> = (0..n_samples as i64)
        .map(|i| start + TimeDelta::seconds(i * i64::from(step)))
        .collect();

    let exchangers: Vec<Exchanger> = bhes
        .iter()
        .map(|bhe| Exchanger {
            bhe: *bhe,
            nominal_flow: rng.random_range(22.0..32.0),
            offset: rng.random_range(-0.3..0.3),
        })
        .collect();

    // one logger outage of 40 samples in the middle of the period
    let outage = n_samples / 2..(n_samples / 2 + 40).min(n_samples);

    let mut columns = BTreeMap::new();
    for ex in &exchangers {
        let mut inlet = Vec::with_capacity(n_samples);
        let mut outlet = Vec::with_capacity(n_samples);
        let mut flow = Vec::with_capacity(n_samples);
        let mut fluid = GROUND + ex.offset;

        for (i, t) in timestamps.iter().enumerate() {
            let running = (t.and_utc().timestamp() / 3600).rem_euclid(CYCLE_HOURS) < ON_HOURS;
            let (t_in, t_out, v_dot) = if running {
                // heat extraction cools the fluid towards 6 °C
                fluid += (6.0 + ex.offset - fluid) * 0.01;
                let v = ex.nominal_flow + rng.random_range(-0.5..0.5);
                (fluid, fluid + 2.5 + rng.random_range(-0.05..0.05), v)
            } else {
                // standing fluid recovers towards the ground temperature
                fluid += (GROUND + ex.offset - fluid) * 0.005;
                let t = fluid + rng.random_range(-0.05..0.05);
                (t, t + rng.random_range(-0.1..0.1), 0.0)
            };

            let lost = outage.contains(&i) || rng.random_bool(DROPOUT);
            let value = |v: f64| if lost { f64::NAN } else { (v * 100.0).round() / 100.0 };
            inlet.push(value(t_in));
            outlet.push(value(t_out));
            flow.push(value(v_dot));
        }

        columns.insert(ColumnKey::new(ex.bhe, Channel::InletTemperature), inlet);
        columns.insert(ColumnKey::new(ex.bhe, Channel::OutletTemperature), outlet);
        columns.insert(ColumnKey::new(ex.bhe, Channel::FlowRate), flow);
    }

    Ok(FieldTable::with_columns(Resolution::Raw30s, timestamps, columns)?)
}

fn run(args: Args) -> Result<()> {
    let Some(first_day) = NaiveDate::from_ymd_opt(args.year, args.month, 1) else {
        bail!("invalid month {}-{}", args.year, args.month);
    };
    let month_days = days_in_month(first_day.year(), first_day.month())
        .context("month length out of range")?;
    let days = args.days.unwrap_or(month_days).min(month_days);
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let bhes: Vec<BheId> = if args.bhes.is_empty() {
        BheId::all().collect()
    } else {
        args.bhes.clone()
    };

    let samples_per_day = 86_400 / Resolution::Raw30s.step_seconds() as usize;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = first_day.and_hms_opt(0, 0, 0).context("midnight out of range")?;
    let table = generate(start, days as usize * samples_per_day, &bhes, &mut rng)?;

    let layout = DataLayout::new(&args.data_root);
    let dir = layout.dir(Resolution::Raw30s);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(month_file_name(Resolution::Raw30s, args.year, args.month, "csv"));
    write_table(&table, &path).with_context(|| format!("writing {}", path.display()))?;

    log::info!(
        "Wrote {} samples for {} exchangers to {}",
        table.len(),
        bhes.len(),
        path.display()
    );
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}
