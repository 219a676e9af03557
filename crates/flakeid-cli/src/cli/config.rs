use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use flakeid::{GeneratorConfig, GeneratorIdentity, SnowflakeId, TWITTER_EPOCH};

/// Runtime configuration for the `flakeid` binary.
///
/// The generator identity is normally provisioned per host, so every global
/// option can also be supplied through the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "flakeid",
    version,
    about = "Issue and inspect 64-bit Snowflake IDs"
)]
pub struct CliArgs {
    /// Worker ID of this producer (0-31).
    ///
    /// Must be unique among live producers sharing a datacenter ID.
    ///
    /// Environment variable: `FLAKEID_WORKER_ID`
    #[arg(
        long,
        global = true,
        env = "FLAKEID_WORKER_ID",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub worker_id: i64,

    /// Datacenter ID of this producer (0-31).
    ///
    /// Environment variable: `FLAKEID_DATACENTER_ID`
    #[arg(
        long,
        global = true,
        env = "FLAKEID_DATACENTER_ID",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub datacenter_id: i64,

    /// Epoch in milliseconds since 1970-01-01 UTC, subtracted from the clock
    /// before packing. Decoding must use the same epoch that issued the IDs.
    ///
    /// Environment variable: `FLAKEID_EPOCH_MS`
    #[arg(long, global = true, env = "FLAKEID_EPOCH_MS", default_value_t = TWITTER_EPOCH)]
    pub epoch_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Issue new IDs, one per line.
    Generate {
        /// Number of IDs to issue.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Print each ID as a JSON object with its decoded fields.
        #[arg(long)]
        json: bool,
    },

    /// Print the fields packed into existing IDs.
    Decode {
        /// Decimal IDs to decode.
        #[arg(required = true)]
        ids: Vec<SnowflakeId>,

        /// Print JSON objects instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub generator: GeneratorConfig,
    pub command: Command,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let identity = GeneratorIdentity::new(args.worker_id, args.datacenter_id)
            .context("invalid generator identity")?;

        if let Command::Generate { count: 0, .. } = args.command {
            bail!("COUNT must be greater than 0");
        }

        let generator = GeneratorConfig::new(identity)
            .with_epoch(args.epoch_ms)
            .context("invalid epoch")?;

        Ok(Self {
            generator,
            command: args.command,
        })
    }
}
