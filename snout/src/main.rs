use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use snout::radio::{ReplaySource, StaticRadio};
use snout::scan::{BtleScan, ZigbeeCapture};
use snout::{Args, CancelFlag, Configuration, DeviceRegistry, ScanDriver, ScanReport};
use snout_common::Protocol;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = args.configuration().context("invalid configuration")?;
    let registry = Arc::new(DeviceRegistry::with_fingerprints(config.fingerprinter()));
    let cancel = CancelFlag::new();

    println!("snout scanning {} on channels {:?}", config.protocol(), config.capture.channels);
    println!("Press Ctrl+C to stop\n");

    let mut driver = build_driver(&args, &config, Arc::clone(&registry), cancel.clone())?;
    let started = Utc::now();
    let mut scan = tokio::task::spawn_blocking(move || driver.run());

    let outcome = tokio::select! {
        result = &mut scan => result?,
        _ = signal::ctrl_c() => {
            println!("\nReceived Ctrl+C, stopping capture...");
            cancel.cancel();
            scan.await?
        }
    }?;

    let report = ScanReport::new(&outcome, &registry, started);
    report.print_summary();

    if let Some(path) = &config.output.report_path {
        report.save(path)?;
        info!("Report written to {}", path.display());
    }
    if config.is_verbose() {
        println!("{}", report.to_json()?);
    }

    Ok(())
}

fn build_driver(
    args: &Args,
    config: &Configuration,
    registry: Arc<DeviceRegistry>,
    cancel: CancelFlag,
) -> anyhow::Result<Box<dyn ScanDriver + Send>> {
    match config.protocol() {
        Protocol::Btle => Ok(Box::new(BtleScan::new(config, registry, cancel)?)),
        Protocol::Zigbee => {
            let path = args
                .replay
                .as_ref()
                .context("Zigbee capture needs --replay")?;
            let source = ReplaySource::from_hex_file(path)
                .with_context(|| format!("failed to load frames from {}", path.display()))?;
            if source.remaining() == 0 {
                warn!("{} holds no frames", path.display());
            }
            let capture = ZigbeeCapture::new(config, StaticRadio::new(), source, registry, cancel)?
                .with_fcs(args.fcs);
            Ok(Box::new(capture))
        }
        other => anyhow::bail!("Scanning {other} is not supported"),
    }
}
