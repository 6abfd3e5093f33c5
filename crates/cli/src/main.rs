//! VerusHash CLI
//!
//! A command-line tool for computing and inspecting VerusHash v2.x block proof-of-work
//! hashes: hashing a header, checking merge-mining sub-header consistency, listing or
//! looking up sub-headers, and querying an activation schedule.
//!
//! # Commands
//!
//! - `hash` - compute a block's VerusHash
//! - `check-non-canonical` - verify a header's non-canonical fields against its committed sub-header
//! - `sub-headers` - list or look up merge-mining sub-headers recorded in a solution
//! - `active-version` - look up which solution version is active at a given height

mod input;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use verushash_core::{check_non_canonical, compute_block_hash, get_sub_header, ActivationHeights, Solution};

use input::{header_from_file, load_activation_heights, load_header_file, parse_hex_array};

#[derive(Parser)]
#[command(name = "verushash")]
#[command(author = "Cyberia")]
#[command(version = "0.2.0")]
#[command(about = "Compute and inspect VerusHash v2.x block proof-of-work hashes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all but error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a header's VerusHash
    Hash {
        #[command(flatten)]
        header: HeaderArgs,

        /// Print the result as JSON instead of plain hex
        #[arg(long)]
        json: bool,
    },

    /// Check whether a header's non-canonical fields are consistent with its recorded
    /// sub-header commitment
    CheckNonCanonical {
        #[command(flatten)]
        header: HeaderArgs,

        /// Hex-encoded 20-byte chain id to check; checks every recorded chain if omitted
        #[arg(long)]
        chain_id: Option<String>,
    },

    /// List or look up the merge-mining sub-headers recorded in a header's solution
    SubHeaders {
        #[command(flatten)]
        header: HeaderArgs,

        /// Look up a single chain id instead of listing every recorded sub-header
        #[arg(long)]
        chain_id: Option<String>,
    },

    /// Look up which solution version is active at a given block height
    ActiveVersion {
        /// Block height to query
        #[arg(long)]
        height: i32,

        /// Non-default activation schedule, as a JSON object of version -> height
        #[arg(long)]
        activation_json: Option<PathBuf>,
    },
}

/// Header fields shared by every subcommand that needs a `BlockHeader`: either a
/// `--input-json` fixture, or every field inline as a flag.
#[derive(Args)]
struct HeaderArgs {
    /// Load the header from a JSON fixture instead of the inline flags below
    #[arg(long)]
    input_json: Option<PathBuf>,

    #[arg(long, required_unless_present = "input_json")]
    version: Option<i32>,

    #[arg(long, required_unless_present = "input_json")]
    prev_block: Option<String>,

    #[arg(long, required_unless_present = "input_json")]
    merkle_root: Option<String>,

    #[arg(long, required_unless_present = "input_json")]
    final_sapling_root: Option<String>,

    #[arg(long, required_unless_present = "input_json")]
    time: Option<u32>,

    #[arg(long, required_unless_present = "input_json")]
    bits: Option<u32>,

    #[arg(long, required_unless_present = "input_json")]
    nonce: Option<String>,

    /// Hex-encoded solution blob; omit for an empty solution (e.g. a genesis header)
    #[arg(long)]
    solution: Option<String>,
}

impl HeaderArgs {
    fn build(&self) -> anyhow::Result<verushash_core::BlockHeader> {
        if let Some(path) = &self.input_json {
            let file = load_header_file(path)?;
            return Ok(header_from_file(file)?);
        }

        Ok(verushash_core::BlockHeader {
            version: self.version.expect("clap enforces presence without --input-json"),
            prev_block: parse_hex_array("prev_block", self.prev_block.as_deref().unwrap_or_default())?,
            merkle_root: parse_hex_array("merkle_root", self.merkle_root.as_deref().unwrap_or_default())?,
            final_sapling_root: parse_hex_array(
                "final_sapling_root",
                self.final_sapling_root.as_deref().unwrap_or_default(),
            )?,
            time: self.time.expect("clap enforces presence without --input-json"),
            bits: self.bits.expect("clap enforces presence without --input-json"),
            nonce: parse_hex_array("nonce", self.nonce.as_deref().unwrap_or_default())?,
            solution: match &self.solution {
                Some(hex_str) => hex::decode(hex_str)?,
                None => Vec::new(),
            },
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Hash { header, json } => cmd_hash(&header, json),
        Commands::CheckNonCanonical { header, chain_id } => cmd_check_non_canonical(&header, chain_id.as_deref()),
        Commands::SubHeaders { header, chain_id } => cmd_sub_headers(&header, chain_id.as_deref()),
        Commands::ActiveVersion { height, activation_json } => cmd_active_version(height, activation_json.as_deref()),
    }
}

/// Installs a `tracing_subscriber::fmt` subscriber: `-v`/`-vv` raise verbosity, `-q`
/// silences everything but errors, and `RUST_LOG` overrides both when set.
fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_hash(header: &HeaderArgs, as_json: bool) -> anyhow::Result<()> {
    let header = header.build()?;
    let hash = compute_block_hash(&header);
    tracing::debug!(version = header.version, "computed block hash");

    if as_json {
        println!("{}", json!({ "hash": hex::encode(hash) }));
    } else {
        println!("{}", hex::encode(hash));
    }
    Ok(())
}

fn cmd_check_non_canonical(header: &HeaderArgs, chain_id: Option<&str>) -> anyhow::Result<()> {
    let mut header = header.build()?;
    let chain_id = chain_id.map(|s| parse_hex_array::<20>("chain_id", s)).transpose()?;

    let ok = check_non_canonical(&mut header, chain_id);
    println!("{}", ok);
    if !ok {
        anyhow::bail!("non-canonical data check failed");
    }
    Ok(())
}

fn cmd_sub_headers(header: &HeaderArgs, chain_id: Option<&str>) -> anyhow::Result<()> {
    let mut header = header.build()?;

    if let Some(chain_id_hex) = chain_id {
        let chain_id = parse_hex_array::<20>("chain_id", chain_id_hex)?;
        match get_sub_header(&mut header, &chain_id) {
            Some(sub) => println!("{}", hex::encode(sub.pre_header_hash)),
            None => anyhow::bail!("no sub-header recorded for chain id {chain_id_hex}"),
        }
        return Ok(());
    }

    let count = Solution::new(&mut header.solution).descriptor().num_sub_headers as usize;
    for idx in 0..count {
        if let Some(sub) = Solution::new(&mut header.solution).get_sub_header(idx) {
            println!("{}\t{}", hex::encode(sub.chain_id), hex::encode(sub.pre_header_hash));
        }
    }
    Ok(())
}

fn cmd_active_version(height: i32, activation_json: Option<&std::path::Path>) -> anyhow::Result<()> {
    let table = match activation_json {
        Some(path) => load_activation_heights(path)?,
        None => ActivationHeights::default(),
    };
    println!("{}", table.active_version(height));
    Ok(())
}
