mod options;
mod progress;

use anyhow::{Context, Result};
use blend::{
    gmtgrid::{create_sink, GridLocation, ReadMode, Registration},
    parse_job, BlendBuilder, BlendJob, BlendSummary, CancelToken, JobRecord, OutputMode,
};
use clap::Parser;
use env_logger::{Builder, Env};
use log::{debug, info};
use options::{Cli, WeightOutput};
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    Builder::from_env(Env::default().default_filter_or(level)).init();

    let records = read_records(&cli.input)?;
    let job = build_job(&cli, records)?;
    let header = job.output_header();
    let mut sink = create_sink(&cli.outgrid, &header, cli.headerless)
        .with_context(|| format!("creating {}", cli.outgrid.display()))?;

    let n_rows = job.spec().n_rows() as u64;
    let pb = progress::bar(format!("Blending {}", cli.outgrid.display()), n_rows);
    let cancel = CancelToken::new();
    let summary = job.run(sink.as_mut(), &cancel, |_| pb.inc(1));
    pb.finish_and_clear();
    let summary = summary?;
    info!(
        "{} written, {} of {} nodes filled",
        cli.outgrid.display(),
        summary.filled,
        summary.total
    );

    if cli.json {
        print_json(&cli.outgrid, &job, &summary)?;
    }
    Ok(())
}

/// Reads the job's records from a job file, stdin, or a list of grids.
fn read_records(inputs: &[PathBuf]) -> Result<Vec<JobRecord>> {
    let records = match inputs {
        [] => parse_job(io::stdin().lock()).context("reading blend job from stdin")?,
        [job] if job.as_path() == Path::new("-") => {
            parse_job(io::stdin().lock()).context("reading blend job from stdin")?
        }
        [job] => {
            let file = File::open(job).with_context(|| format!("opening {}", job.display()))?;
            parse_job(BufReader::new(file)).with_context(|| format!("reading {}", job.display()))?
        }
        grids => grids
            .iter()
            .map(|path| -> Result<JobRecord> { Ok(JobRecord::new(GridLocation::file(path)?)) })
            .collect::<Result<Vec<_>>>()?,
    };
    debug!("{} records in blend job", records.len());
    Ok(records)
}

fn build_job(cli: &Cli, records: Vec<JobRecord>) -> Result<BlendJob> {
    let mut builder = BlendBuilder::new()
        .sources(records)
        .nodata(cli.nodata)
        .geographic(cli.geographic)
        .read_mode(if cli.mmap {
            ReadMode::MemMap
        } else {
            ReadMode::Stream
        })
        .command(std::env::args().collect::<Vec<_>>().join(" "))
        .output_mode(match cli.weights {
            None => OutputMode::Blend,
            Some(WeightOutput::W) => OutputMode::Weights,
            Some(WeightOutput::Z) => OutputMode::WeightedSum,
        });
    if let Some(region) = cli.region {
        builder = builder.region(region);
    }
    if let Some(inc) = cli.increment {
        builder = builder.increment(inc.0);
    }
    if cli.pixel {
        builder = builder.registration(Registration::Pixel);
    }
    if let Some(z) = cli.scale {
        builder = builder.scale(z.scale, z.shift);
    }
    if let Some(rule) = cli.clobber {
        builder = builder.clobber(rule);
    }
    Ok(builder.build()?)
}

fn print_json(outgrid: &Path, job: &BlendJob, summary: &BlendSummary) -> Result<()> {
    #[derive(Serialize)]
    struct JsonSummary<'a> {
        output: String,
        region: [f64; 4],
        increment: [f64; 2],
        registration: String,
        n_columns: usize,
        n_rows: usize,
        sources: Vec<&'a str>,
        skipped: &'a [String],
        filled: u64,
        total: u64,
        z_min: f64,
        z_max: f64,
    }

    let spec = job.spec();
    let region = spec.region();
    let json = JsonSummary {
        output: outgrid.display().to_string(),
        region: [region.west(), region.east(), region.south(), region.north()],
        increment: [spec.inc().x, spec.inc().y],
        registration: spec.registration().to_string(),
        n_columns: summary.n_columns,
        n_rows: summary.n_rows,
        sources: job.sources().iter().map(|source| source.name()).collect(),
        skipped: &summary.skipped,
        filled: summary.filled,
        total: summary.total,
        z_min: summary.z_min,
        z_max: summary.z_max,
    };
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}
