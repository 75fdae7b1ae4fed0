//! RX2 consensus CLI
//!
//! Drives the consensus core over JSON chain fixtures.
//!
//! # Commands
//!
//! - `params` - Show the consensus parameters in effect
//! - `next-work` - Required bits for the next block of a proof kind
//! - `check-pow` - Hash a header at a height and check it against its bits
//! - `seed` - Seed block selected for a height
//! - `hash` - Seeded hash of arbitrary data
//! - `benchmark` - Run performance benchmark

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use rx2pow::chainfile::{load_chain, parse_bits, parse_hash};
use rx2pow::config::NodeConfig;
use rx2pow::consensus::{
    BlockHash, ChainReader, ConsensusParams, HashEngine, Network, PowChecker, ProofKind,
    SeedSelector, next_work_required, target_from_compact, target_to_hex,
};

#[cfg(not(feature = "randomx"))]
type Library = rx2pow::consensus::UHashLibrary;
#[cfg(feature = "randomx")]
type Library = rx2pow::consensus::RandomXLibrary;

#[derive(Parser)]
#[command(name = "rx2pow")]
#[command(author = "Cyberia")]
#[command(version)]
#[command(about = "Difficulty retargeting and proof-of-work tooling for the RX2 hybrid chain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.rx2pow/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Network preset, overriding the config file
    #[arg(long, global = true)]
    network: Option<Network>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Pow,
    Pos,
}

impl From<Kind> for ProofKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Pow => ProofKind::Work,
            Kind::Pos => ProofKind::Stake,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the consensus parameters in effect
    Params {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Required compact bits for the next block
    NextWork {
        /// Chain fixture (JSON)
        #[arg(long)]
        chain: PathBuf,

        /// Proof kind of the next block
        #[arg(long, value_enum, default_value = "pow")]
        kind: Kind,

        /// Timestamp of the next block (default: tip time + target spacing)
        #[arg(long)]
        time: Option<i64>,
    },

    /// Hash a serialized header and check it against compact bits
    CheckPow {
        /// Chain fixture (JSON)
        #[arg(long)]
        chain: PathBuf,

        /// Height of the block being checked
        #[arg(long)]
        height: u32,

        /// Serialized header, hex
        #[arg(long)]
        header: String,

        /// Claimed compact bits, hex
        #[arg(long)]
        bits: String,
    },

    /// Seed block selected for a height
    Seed {
        /// Chain fixture (JSON)
        #[arg(long)]
        chain: PathBuf,

        /// Height to select the seed for
        #[arg(long)]
        height: u32,
    },

    /// Seeded hash of arbitrary data
    Hash {
        /// Seed block hash, display-order hex
        #[arg(long)]
        seed: String,

        /// Data to hash, hex
        #[arg(long)]
        data: String,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of hashes per thread
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Number of threads to use (default: number of CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref(), cli.network).and_then(|config| {
        rx2pow::logging::init(config.log_filter.as_deref())?;
        let params = config.consensus_params()?;
        match cli.command {
            Commands::Params { json } => cmd_params(&params, json),
            Commands::NextWork { chain, kind, time } => cmd_next_work(&params, &chain, kind.into(), time),
            Commands::CheckPow {
                chain,
                height,
                header,
                bits,
            } => cmd_check_pow(&config, params, &chain, height, &header, &bits),
            Commands::Seed { chain, height } => cmd_seed(&config, &params, &chain, height),
            Commands::Hash { seed, data } => cmd_hash(&seed, &data),
            Commands::Benchmark { count, threads } => cmd_benchmark(count, threads),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>, network: Option<Network>) -> anyhow::Result<NodeConfig> {
    let mut config = NodeConfig::load(path)?;
    if let Some(network) = network {
        config.network = network;
    }
    Ok(config)
}

fn cmd_params(params: &ConsensusParams, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(params)?);
    } else {
        println!("{}", params);
    }
    Ok(())
}

fn cmd_next_work(
    params: &ConsensusParams,
    chain: &Path,
    kind: ProofKind,
    time: Option<i64>,
) -> anyhow::Result<()> {
    let store = load_chain(chain)?;
    let view = store.read();
    let tip = view.tip();
    let time = time.unwrap_or_else(|| tip.time + params.target_spacing(tip.height + 1));

    let bits = next_work_required(&view, Some(tip), time, params, kind);
    info!(height = tip.height + 1, %kind, bits = %format!("{:08x}", bits), "Next work");

    println!("Height: {}", tip.height + 1);
    println!("Kind:   {}", kind);
    println!("Bits:   {:08x}", bits);
    println!("Target: {}", target_to_hex(&target_from_compact(bits)));
    Ok(())
}

fn cmd_check_pow(
    config: &NodeConfig,
    params: ConsensusParams,
    chain: &Path,
    height: u32,
    header: &str,
    bits: &str,
) -> anyhow::Result<()> {
    let header = hex::decode(header.trim_start_matches("0x"))?;
    let bits = parse_bits(bits)?;
    let store = load_chain(chain)?;
    let view = store.read();

    let checker = PowChecker::new(params, config.seed_cache, Library::default()).with_memo(config.hash_memo);
    let check = checker.check(&view, height, &header, bits)?;

    println!("Seed:   {} (height {})", check.seed, checker.seeds().seed_block_height(height));
    println!("Hash:   {}", check.hash);
    println!("Target: {}", target_to_hex(&target_from_compact(bits)));

    if !check.valid {
        anyhow::bail!("Proof of work does not meet target {:08x}", bits);
    }
    println!("Valid proof of work");
    Ok(())
}

fn cmd_seed(config: &NodeConfig, params: &ConsensusParams, chain: &Path, height: u32) -> anyhow::Result<()> {
    let store = load_chain(chain)?;
    let view = store.read();
    let selector = SeedSelector::new(params, config.seed_cache);

    let seed = selector.seed_for_height(&view, height);
    println!("Height:      {}", height);
    println!("Seed height: {}", selector.seed_block_height(height));
    println!("Seed:        {}", seed);
    Ok(())
}

fn cmd_hash(seed: &str, data: &str) -> anyhow::Result<()> {
    let seed = parse_hash(seed)?;
    let data = hex::decode(data.trim_start_matches("0x"))?;

    let engine = HashEngine::new(Library::default());
    let out = engine.hash(&data, &seed)?;
    println!("{}", BlockHash(out));
    Ok(())
}

fn cmd_benchmark(count: u32, threads: Option<usize>) -> anyhow::Result<()> {
    let num_threads = threads.unwrap_or_else(num_cpus::get).max(1);
    println!(
        "Running benchmark with {} hashes on {} threads...",
        count, num_threads
    );

    let seed = BlockHash([0x5a; 32]);
    let start = Instant::now();

    // One engine per worker: a context serializes its callers.
    let workers: Vec<_> = (0..num_threads)
        .map(|t| {
            std::thread::spawn(move || -> Result<u32, rx2pow::consensus::EngineError> {
                let engine = HashEngine::new(Library::default());
                let mut input = Vec::with_capacity(80);
                for i in 0..count {
                    input.clear();
                    input.extend_from_slice(b"rx2 benchmark header");
                    input.extend_from_slice(&(t as u32).to_le_bytes());
                    input.extend_from_slice(&i.to_le_bytes());
                    engine.hash(&input, &seed)?;
                }
                Ok(count)
            })
        })
        .collect();

    let mut total: u64 = 0;
    for worker in workers {
        let done = worker
            .join()
            .map_err(|_| anyhow::anyhow!("Benchmark worker panicked"))??;
        total += done as u64;
    }

    let elapsed = start.elapsed();
    let hashrate = total as f64 / elapsed.as_secs_f64();

    println!("\nResults:");
    println!("  Total hashes: {}", total);
    println!("  Time elapsed: {:.2}s", elapsed.as_secs_f64());
    println!("  Hashrate: {:.2} H/s", hashrate);
    Ok(())
}
