use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use prime_chain::HashMap;

#[derive(Parser, Debug)]
struct Args {
    /// Requested capacity; the bucket array is the largest prime at or below it.
    #[arg(short = 'c', long = "capacity", default_value_t = 101)]
    capacity: usize,

    /// Insert `key_<n> <n>` for n in 0..fill before anything else.
    #[arg(short = 'f', long = "fill", default_value_t = 0)]
    fill: u64,

    /// Load `key value` lines from this file.
    #[arg(short = 'l', long = "load")]
    load: Option<PathBuf>,

    /// Remove these keys after filling and loading.
    #[arg(short = 'r', long = "remove")]
    remove: Vec<String>,

    /// Write the final table to this file.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Print every bucket and its chain to stderr.
    #[arg(short = 'd', long = "dump")]
    dump: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut table: HashMap<String, i64> = HashMap::with_capacity(args.capacity);
    println!(
        "Created table: {} buckets (target capacity {})",
        table.bucket_count(),
        table.target_capacity()
    );

    for n in 0..args.fill {
        table.insert(format!("key_{n}"), n as i64);
    }

    if let Some(path) = &args.load {
        match table.try_load(path) {
            Ok(summary) => println!(
                "Loaded {}: {} inserted, {} duplicate keys, {} malformed lines",
                path.display(),
                summary.inserted,
                summary.duplicates,
                summary.malformed
            ),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }

    for key in &args.remove {
        if !table.remove(key.as_str()) {
            println!("Key not present: {key}");
        }
    }

    println!("Entries: {}", table.len());
    table.stats().print();

    if args.dump
        && let Err(err) = table.dump_to(io::stderr().lock())
    {
        eprintln!("dump failed: {err}");
        return ExitCode::FAILURE;
    }

    if let Some(path) = &args.output {
        match table.try_write_to_file(path) {
            Ok(written) => println!("Wrote {written} entries to {}", path.display()),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
