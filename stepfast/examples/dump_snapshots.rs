//! Decodes a file of STEP data and logs every market snapshot.
//!
//! Usage: `cargo run --example dump_snapshots -- <step.dat>`. Without an
//! argument a small generated feed is decoded instead.
use anyhow::Context;
use stepfast::prelude::*;
use tracing::info;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

/// Builds one `W` message carrying two snapshots.
fn sample_feed() -> anyhow::Result<Vec<u8>> {
    let mut fast = FastEncoder::new();
    fast.encode_pmap(&stepfast::fast::PresenceMap::from_bits([true; 6]));
    fast.encode_uint(u64::from(stepfast::SNAPSHOT_TEMPLATE_ID));
    fast.encode_int(20240102093000000);
    fast.encode_uint(2011);
    fast.encode_ascii("010")?;
    fast.encode_ascii("000001")?;
    fast.encode_nullable_ascii(Some("T0"))?;
    fast.encode_nullable_int(Some(105_000));
    fast.encode_int(1200);
    fast.encode_int(3_500_000);
    fast.encode_int(36_750_000_000);

    fast.encode_pmap(&stepfast::fast::PresenceMap::from_bits([false, true, false, false, true, false]));
    fast.encode_int(20240102093003000);
    fast.encode_ascii("000002")?;
    fast.encode_nullable_int(Some(88_100));
    fast.encode_int(-1150);
    fast.encode_int(-3_100_000);
    fast.encode_int(-34_000_000_000);

    let mut step = StepEncoder::new("STEP.1.0.0");
    step.put_str(35, "W");
    step.put_str(49, "SZSE");
    step.put_data(&fast.finish());
    Ok(step.finish().to_vec())
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let buffer = match std::env::args().nth(1) {
        Some(path) => std::fs::read(&path).with_context(|| format!("reading {path}"))?,
        None => sample_feed()?,
    };
    info!("decoding {} bytes", buffer.len());

    let config = FeedConfig::new().with_error_policy(ErrorPolicy::Skip);
    let mut feed = FeedDecoder::snapshot(config)?;
    let mut collector = SnapshotCollector::new();
    feed.decode_buffer(&buffer, &mut collector)?;

    for snapshot in collector.snapshots() {
        info!(
            time = ?snapshot.timestamp(),
            channel = snapshot.channel_no,
            stream = %snapshot.md_stream_id,
            security = %snapshot.security_id,
            source = %snapshot.security_id_source,
            phase = ?snapshot.trading_phase_code,
            prev_close = ?snapshot.prev_close(),
            trades = snapshot.num_trades,
            volume = snapshot.total_volume_trade,
            value = %snapshot.total_value(),
            "snapshot"
        );
    }

    let stats = feed.stats();
    info!(
        outer = stats.outer_messages,
        snapshots = stats.snapshot_messages,
        fast = stats.fast_messages,
        skipped = stats.skipped,
        rejected = collector.rejected(),
        "done"
    );
    Ok(())
}
