use std::io::Write;

use anyhow::Context;
use flakeid::{IdGenerator, IdParts, SnowflakeId, SystemClock, TimeSource};
use serde::Serialize;

use super::config::{CliConfig, Command};

/// One line of JSON output.
#[derive(Serialize)]
struct IdRecord {
    id: SnowflakeId,
    #[serde(flatten)]
    parts: IdParts,
}

/// Runs the configured command on the system clock, writing results to `out`.
pub fn run(config: &CliConfig, out: &mut impl Write) -> anyhow::Result<()> {
    match &config.command {
        Command::Generate { count, json } => {
            let generator = IdGenerator::with_config(config.generator, SystemClock);
            generate(&generator, *count, *json, out)
        }
        Command::Decode { ids, json } => decode(config.generator.epoch_ms(), ids, *json, out),
    }
}

/// Issues `count` IDs. A clock regression aborts the run; IDs already
/// written stay valid.
pub fn generate<T: TimeSource>(
    generator: &IdGenerator<T>,
    count: usize,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    tracing::info!(count, "issuing ids");

    for i in 0..count {
        let id = generator
            .next_id()
            .with_context(|| format!("failed to issue id {} of {count}", i + 1))?;
        if json {
            write_json(out, id, generator.decompose(id))?;
        } else {
            writeln!(out, "{id}")?;
        }
    }
    Ok(())
}

pub fn decode(
    epoch_ms: u64,
    ids: &[SnowflakeId],
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    for &id in ids {
        let parts = id.decompose(epoch_ms);
        if json {
            write_json(out, id, parts)?;
        } else {
            writeln!(
                out,
                "{id}: timestamp_ms={} datacenter_id={} worker_id={} sequence={}",
                parts.timestamp_ms, parts.datacenter_id, parts.worker_id, parts.sequence
            )?;
        }
    }
    Ok(())
}

fn write_json(out: &mut impl Write, id: SnowflakeId, parts: IdParts) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, &IdRecord { id, parts })?;
    writeln!(out)?;
    Ok(())
}
