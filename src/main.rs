use anyhow::Context;
use clap::Parser;
use flate2::read::GzDecoder;
use split_ldif::config::{Cli, ResolvedConfig};
use split_ldif::dispatcher;
use split_ldif::error::SplitError;
use split_ldif::ldif::reader;
use split_ldif::logging;
use split_ldif::parent_map::ParentMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(&cli.log);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Runs the splitter end to end. Returns `Ok(true)` for a clean run, `Ok(false)` when the run
/// completed but recorded at least one in-stream error (§7), and `Err` for anything that prevents
/// the run from starting or a fatal I/O failure mid-run.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = cli.resolve()?;
    let input = open_input(&config)?;

    let parent_map = Arc::new(ParentMap::new());
    let strategy = Arc::new(config.strategy);
    let ordered = reader::spawn(
        input,
        Arc::clone(&strategy),
        Arc::clone(&parent_map),
        config.num_threads,
    );

    let summary = dispatcher::run(
        ordered,
        strategy.as_ref(),
        &parent_map,
        config.target_base_path,
        config.compress_target,
    )
    .context("dispatcher failed")?;

    tracing::info!(
        entries_read = summary.entries_read,
        entries_excluded = summary.entries_excluded,
        "run complete"
    );

    Ok(!summary.had_recoverable_error)
}

/// Opens the configured sources as a single byte stream, decompressing each if requested and
/// joining multiple sources with a blank line so records never run together (§6, "Input").
fn open_input(config: &ResolvedConfig) -> anyhow::Result<Box<dyn BufRead + Send>> {
    if config.sources.is_empty() {
        let stdin = io::stdin();
        let piece: Box<dyn Read + Send> = if config.source_compressed {
            Box::new(GzDecoder::new(stdin))
        } else {
            Box::new(stdin)
        };
        return Ok(Box::new(BufReader::new(piece)));
    }

    let mut combined: Option<Box<dyn Read + Send>> = None;
    for path in &config.sources {
        let file = File::open(path).map_err(|source| SplitError::InputOpen {
            path: path.clone(),
            source,
        })?;
        let piece: Box<dyn Read + Send> = if config.source_compressed {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        combined = Some(match combined {
            None => piece,
            Some(prev) => {
                let separator: Box<dyn Read + Send> = Box::new(io::Cursor::new(b"\n\n".to_vec()));
                Box::new(prev.chain(separator).chain(piece))
            }
        });
    }
    Ok(Box::new(BufReader::new(combined.expect("sources is non-empty"))))
}
