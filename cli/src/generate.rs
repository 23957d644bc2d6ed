/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{GlobalArgs, create_parent_dir};
use anyhow::{Context, Result, ensure};
use cfgraph::graphs::RandomRatings;
use clap::Parser;
use dsi_progress_logger::{ProgressLog, progress_logger};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "generate",
    about = "Write a random rating file, with one user-item-rating triple per line.",
    long_about = None
)]
pub struct CliArgs {
    /// The number of users.
    pub num_users: usize,

    /// The number of items.
    pub num_items: usize,

    #[arg(short, long)]
    /// Where to store the ratings.
    pub output: PathBuf,

    #[arg(short, long, default_value_t = 0.1)]
    /// The probability that a user rated an item.
    pub density: f64,

    #[arg(short, long, default_value_t = 0)]
    /// The seed of the pseudorandom number generator.
    pub seed: u64,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&args.density),
        "The density must be in [0 . . 1], got {}",
        args.density
    );

    let mut pl = progress_logger![item_name = "rating"];
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    create_parent_dir(&args.output)?;
    let file = File::create(&args.output)
        .with_context(|| format!("Could not create {}", args.output.display()))?;
    let written = write_ratings(
        BufWriter::new(file),
        &RandomRatings::new(args.num_users, args.num_items, args.density, args.seed),
        &mut pl,
    )?;
    log::info!("Wrote {written} ratings to {}", args.output.display());
    Ok(())
}

/// Writes the ratings of a random rating graph, returning their number.
pub fn write_ratings(
    mut writer: impl Write,
    ratings: &RandomRatings,
    pl: &mut impl ProgressLog,
) -> Result<usize> {
    writeln!(
        writer,
        "# {} users, {} items",
        ratings.num_users(),
        ratings.num_items()
    )?;
    pl.start("Generating ratings...");
    let mut count = 0;
    for (user, item, rating) in ratings {
        writeln!(writer, "u_{user}\ti_{item}\t{rating}")?;
        count += 1;
        pl.light_update();
    }
    pl.done();
    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factorize::read_ratings;
    use dsi_progress_logger::no_logging;

    #[test]
    fn test_write_read() -> Result<()> {
        let graph = RandomRatings::new(8, 6, 0.5, 42);
        let mut buffer = Vec::new();
        let written = write_ratings(&mut buffer, &graph, no_logging![])?;
        let ratings = read_ratings(buffer.as_slice(), no_logging![])?;
        assert_eq!(ratings.len(), written);
        let expected = graph
            .iter()
            .map(|(u, i, r)| (u as u64, i as u64, r))
            .collect::<Vec<_>>();
        assert_eq!(ratings, expected);
        Ok(())
    }
}
