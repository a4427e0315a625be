use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mtl",
    about = "Millet Trace Ledger: batch provenance on a shared ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Client configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Node endpoint, overrides the configuration
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Contract address, overrides the configuration
    #[arg(long, global = true)]
    pub contract: Option<String>,

    /// Signing account: index or 0x address
    #[arg(long, global = true)]
    pub account: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a development node hosting the contract in memory
    Serve(ServeArgs),
    /// Create, inspect, or verify batches
    Batch(BatchArgs),
    /// Append stage records
    Record(RecordArgs),
    /// List the stage records of a batch
    Records(RecordsArgs),
    /// Show the number of batches ever created
    Total,
    /// Generate batch identifiers offline
    Id(IdArgs),
    /// Compute the certificate hash of a JSON document
    Hash(HashArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Node configuration file (TOML)
    #[arg(long)]
    pub node_config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub accounts: Option<usize>,
    #[arg(long)]
    pub confirmations: Option<u64>,
}

#[derive(Args)]
pub struct BatchArgs {
    #[command(subcommand)]
    pub action: BatchAction,
}

#[derive(Subcommand)]
pub enum BatchAction {
    /// Register a new batch owned by the signing account
    Create(CreateArgs),
    /// Show a batch and its stage history
    Show { batch_id: String },
    /// Set or revoke the verified flag
    Verify {
        batch_id: String,
        #[arg(long)]
        revoke: bool,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    /// Explicit id; one is generated when omitted
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub farmer_id: String,
    #[arg(long)]
    pub millet_type: String,
    #[arg(long)]
    pub variety: String,
    #[arg(long)]
    pub harvest_date: String,
    #[arg(long)]
    pub quality_grade: String,
    #[arg(long)]
    pub organic: bool,
}

#[derive(Args)]
pub struct RecordArgs {
    #[command(subcommand)]
    pub action: RecordAction,
}

#[derive(Subcommand)]
pub enum RecordAction {
    /// Append a stage record to a batch
    Add(AddRecordArgs),
}

#[derive(Args)]
pub struct AddRecordArgs {
    pub batch_id: String,
    #[arg(long)]
    pub stage: String,
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub operator: String,
    #[arg(long, default_value = "")]
    pub notes: String,
    /// JSON certificate document to hash into the record
    #[arg(long, conflicts_with = "certificate_hash")]
    pub certificate: Option<PathBuf>,
    /// Precomputed certificate hash
    #[arg(long)]
    pub certificate_hash: Option<String>,
}

#[derive(Args)]
pub struct RecordsArgs {
    pub batch_id: String,
}

#[derive(Args)]
pub struct IdArgs {
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,
}

#[derive(Args)]
pub struct HashArgs {
    /// JSON file, or `-` for stdin
    pub path: PathBuf,
}
