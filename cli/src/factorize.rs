/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{GlobalArgs, GranularityArgs, NumThreadsArg, create_parent_dir, get_thread_pool};
use anyhow::{Context, Result, bail, ensure};
use cfgraph_algo::cf::math::{MAX_RATING, MIN_RATING};
use cfgraph_algo::prelude::*;
use clap::Parser;
use dsi_progress_logger::{ProgressLog, concurrent_progress_logger, progress_logger};
use itertools::Itertools;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

/// The update strategy.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliAlgorithm {
    /// Alternating least squares.
    #[default]
    Als,
    /// Stochastic gradient descent.
    Sgd,
    /// SVD++: gradient descent with biases and implicit feedback.
    Svdpp,
}

impl From<CliAlgorithm> for UpdateStrategy {
    fn from(a: CliAlgorithm) -> Self {
        match a {
            CliAlgorithm::Als => UpdateStrategy::Als,
            CliAlgorithm::Sgd => UpdateStrategy::Sgd,
            CliAlgorithm::Svdpp => UpdateStrategy::Svdpp,
        }
    }
}

/// Formats for the factors.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// One line per vertex with delimited fields: kind, index, latent vector,
    /// and optionally error and number of updates.
    #[default]
    Text,
    /// One JSON object per line with the same fields.
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "factorize",
    about = "Factorize a rating matrix using a bulk-synchronous vertex program.",
    long_about = "Read ratings from a file with one rating per line, formed by a user, an item, and a rating separated by whitespace (u_<index> and i_<index> identifiers, or bare indices). Empty lines and lines starting with # are skipped. Then, factorize the rating matrix with the given algorithm and write the latent vector of each vertex."
)]
pub struct CliArgs {
    #[arg(value_enum)]
    /// The update strategy.
    pub algorithm: CliAlgorithm,

    /// The file containing the ratings.
    pub input: PathBuf,

    #[arg(short, long)]
    /// Where to store the factors.
    pub output: PathBuf,

    #[arg(short = 'k', long, default_value_t = Config::DEFAULT_VECTOR_SIZE)]
    /// The length of latent vectors.
    pub vector_size: usize,

    #[arg(short, long, default_value_t = Config::DEFAULT_LAMBDA)]
    /// The regularization parameter λ.
    pub lambda: f64,

    #[arg(short, long, default_value_t = Config::DEFAULT_GAMMA)]
    /// The learning rate γ (SGD and SVD++ only).
    pub gamma: f64,

    #[arg(short, long, default_value_t = Config::DEFAULT_ITERATIONS)]
    /// The last superstep at which vertices send their factors.
    pub iterations: usize,

    #[arg(short, long, default_value_t = Config::DEFAULT_TOLERANCE)]
    /// The threshold for halting factors and for the global RMSE.
    pub tolerance: f64,

    #[arg(long, default_value_t = HaltFactor::Basic)]
    /// How vertices compute their halting factor (basic, rmse, or l2norm).
    pub halt_factor: HaltFactor,

    #[arg(long)]
    /// Compute the global RMSE after every superstep even if the halting
    /// factor is not rmse.
    pub rmse_aggregator: bool,

    #[arg(long)]
    /// Cache the factors of neighbors and skip SGD updates if no neighbor
    /// changed.
    pub delta_caching: bool,

    #[arg(long)]
    /// Stop after this number of supersteps.
    pub max_supersteps: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    /// The output format.
    pub fmt: OutputFormat,

    #[arg(long, default_value = "   ")]
    /// The field delimiter of the text output format.
    pub delimiter: String,

    #[arg(long)]
    /// Output the absolute value of the last halting factor (with the basic
    /// halting factor, the last prediction error) of each vertex.
    pub print_error: bool,

    #[arg(long)]
    /// Output the number of updates of each vertex.
    pub print_updates: bool,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,

    #[clap(flatten)]
    pub granularity: GranularityArgs,
}

impl CliArgs {
    fn config(&self) -> Config {
        Config {
            vector_size: self.vector_size,
            lambda: self.lambda,
            gamma: self.gamma,
            iterations: self.iterations,
            tolerance: self.tolerance,
            halt_factor: self.halt_factor,
            rmse_aggregator: self.rmse_aggregator,
            delta_caching: self.delta_caching,
        }
    }
}

/// Parses a line of a rating file, returning `None` for empty lines and
/// comments.
///
/// Sources must be users and targets must be items; bare indices are
/// interpreted accordingly.
pub fn parse_rating(line: &str) -> Result<Option<(u64, u64, f64)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let Some((src, dst, rating)) = line.split_whitespace().collect_tuple() else {
        bail!("Expected three fields (user, item, rating), found {line:?}");
    };
    let src = parse_id(src, Kind::User)?;
    let dst = parse_id(dst, Kind::Item)?;
    let rating = rating
        .parse::<f64>()
        .with_context(|| format!("Invalid rating {rating:?}"))?;
    ensure!(rating.is_finite(), "Invalid rating {rating}");
    Ok(Some((src, dst, rating)))
}

fn parse_id(s: &str, kind: Kind) -> Result<u64> {
    if let Ok(index) = s.parse::<u64>() {
        return Ok(index);
    }
    let id = s.parse::<VertexId>()?;
    ensure!(
        id.kind() == kind,
        "Vertex {id} should be a{} {kind}",
        if kind == Kind::Item { "n" } else { "" }
    );
    Ok(id.index())
}

/// Reads ratings, one per line, logging progress on `pl`.
pub fn read_ratings(
    reader: impl BufRead,
    pl: &mut impl ProgressLog,
) -> Result<Vec<(u64, u64, f64)>> {
    let mut ratings = Vec::new();
    let mut out_of_range = 0_usize;
    pl.item_name("line");
    pl.start("Reading ratings...");
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(rating) =
            parse_rating(&line).with_context(|| format!("Error at line {}", line_num + 1))?
        {
            if !(MIN_RATING..=MAX_RATING).contains(&rating.2) {
                out_of_range += 1;
            }
            ratings.push(rating);
        }
        pl.light_update();
    }
    pl.done();

    if out_of_range > 0 {
        log::warn!(
            "{out_of_range} rating(s) outside [{MIN_RATING} . . {MAX_RATING}]: they will be used as they are"
        );
    }
    log::info!("Read {} ratings", ratings.len());
    Ok(ratings)
}

/// The data written for each vertex in JSON format.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VertexRecord {
    pub kind: Kind,
    pub id: u64,
    pub latent: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<usize>,
}

impl VertexRecord {
    pub fn new(id: VertexId, state: &VertexState, print_error: bool, print_updates: bool) -> Self {
        Self {
            kind: id.kind(),
            id: id.index(),
            latent: state.latent().iter().copied().collect(),
            error: print_error.then(|| state.halt_factor().abs()),
            updates: print_updates.then(|| state.update_count()),
        }
    }

    /// Writes the record as a line of text with the given delimiter.
    pub fn write_text(&self, mut writer: impl Write, delimiter: &str) -> std::io::Result<()> {
        write!(
            writer,
            "{}{delimiter}{}{delimiter}[{}]",
            self.kind,
            self.id,
            self.latent.iter().join(", ")
        )?;
        if let Some(error) = self.error {
            write!(writer, "{delimiter}{error}")?;
        }
        if let Some(updates) = self.updates {
            write!(writer, "{delimiter}{updates}")?;
        }
        writeln!(writer)
    }
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    let mut pl = progress_logger![];
    pl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let mut cpl = concurrent_progress_logger![];
    cpl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        cpl.log_interval(log_interval);
    }

    let config = args.config();
    log::debug!("Configuration: {}", serde_json::to_string(&config)?);

    let thread_pool = get_thread_pool(args.num_threads.num_threads)?;

    log::info!("Reading ratings from {}", args.input.display());
    let file = File::open(&args.input)
        .with_context(|| format!("Could not open {}", args.input.display()))?;
    let ratings = read_ratings(BufReader::new(file), &mut pl)?;

    let mut factorization = Factorization::from_ratings(args.algorithm.into(), config, ratings)?;
    factorization.granularity(args.granularity.into_granularity());
    log::info!(
        "{} users, {} items",
        factorization.num_users(),
        factorization.num_items()
    );

    let predicate = args
        .max_supersteps
        .map(preds::MaxSupersteps::from)
        .unwrap_or_default();
    thread_pool.install(|| factorization.run_with_logging(predicate, &mut pl, &mut cpl))?;

    create_parent_dir(&args.output)?;
    let file = File::create(&args.output)
        .with_context(|| format!("Could not create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    for vertex in factorization.vertices() {
        let record = VertexRecord::new(
            *vertex.id(),
            vertex.value(),
            args.print_error,
            args.print_updates,
        );
        match args.fmt {
            OutputFormat::Text => record.write_text(&mut writer, &args.delimiter)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut writer, &record)?;
                writeln!(writer)?;
            }
        }
    }
    writer.flush()?;
    log::info!("Factors written to {}", args.output.display());

    Ok(())
}
