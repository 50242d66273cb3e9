//! k2geo-gen: CLI tool for generating GeoIP2 country and ASN databases from
//! aggregated JSON sources.

use clap::Parser;
use k2geo::binary::RecordSize;
use k2geo::build::{run_builds, BuildRequest, DatabaseKind};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "k2geo-gen")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Generate GeoIP2 MMDB files from aggregated JSON sources", long_about = None)]
struct Cli {
    /// Country source directory (empty to skip)
    #[arg(long, default_value = "rir-ip/country")]
    country_dir: String,

    /// ASN source directory (empty to skip)
    #[arg(long, default_value = "asn-ip/as")]
    asn_dir: String,

    /// Country database output file
    #[arg(long, default_value = "GeoIP2-Country.mmdb")]
    country_output: PathBuf,

    /// ASN database output file
    #[arg(long, default_value = "GeoIP2-ASN.mmdb")]
    asn_output: PathBuf,

    /// Search tree record size in bits (24, 28 or 32)
    #[arg(long, default_value_t = 24, value_parser = parse_record_size)]
    record_size: u16,

    /// Fixed build epoch for reproducible output
    #[arg(long)]
    build_epoch: Option<u64>,

    /// Re-open each written database with a MaxMind DB reader
    #[arg(long)]
    verify: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_record_size(s: &str) -> Result<u16, String> {
    let bits: u16 = s.parse().map_err(|e| format!("{}", e))?;
    RecordSize::from_bits(bits)
        .map(|_| bits)
        .ok_or_else(|| format!("unsupported record size {}", bits))
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let requests = requests(&cli);
    if requests.is_empty() {
        info!("No source directories given, nothing to do.");
        return;
    }

    let report = run_builds(&requests);

    for outcome in report.successes() {
        println!(
            "{}: {} ({} bytes, {} networks, sha256 {})",
            outcome.kind,
            outcome.output.display(),
            outcome.write.total_size,
            outcome.apply.prefixes_inserted,
            outcome.sha256
        );
    }
    for (kind, e) in report.failures() {
        error!("Failed to generate {} MMDB: {}", kind, e);
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    info!("All requested databases generated successfully.");
}

fn requests(cli: &Cli) -> Vec<BuildRequest> {
    let record_size = RecordSize::from_bits(cli.record_size).unwrap_or_default();
    let targets = [
        (DatabaseKind::Country, &cli.country_dir, &cli.country_output),
        (DatabaseKind::Asn, &cli.asn_dir, &cli.asn_output),
    ];

    targets
        .into_iter()
        .filter(|(_, dir, _)| !dir.is_empty())
        .map(|(kind, dir, output)| {
            let request = BuildRequest::new(kind, dir, output)
                .with_record_size(record_size)
                .with_verify(cli.verify);
            match cli.build_epoch {
                Some(epoch) => request.with_build_epoch(epoch),
                None => request,
            }
        })
        .collect()
}
