//! nm2srv: replay NM2 captures through the bridge and print the store

use anyhow::{Context, Result};
use clap::Parser;
use common::logging::{init_with_config, LogConfig};
use common::shutdown::wait_for_shutdown;
use common::ServiceArgs;
use nm2_store::MemoryStore;
use nm2srv::replay::{render_store, replay, ReplayStats};
use nm2srv::{Engine, Nm2Config};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServiceArgs::parse();

    let config = Nm2Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Config file level applies unless the command line asked for something else
    let level = match &config.logging.level {
        Some(level) if !args.debug && args.log_level == "info" => level.clone(),
        _ => args.effective_log_filter(),
    };
    init_with_config(&LogConfig {
        service_name: config.service.name.clone(),
        level,
        log_dir: config.logging.dir.clone(),
        enable_json: config.logging.json,
        ansi: !args.no_color,
    })
    .context("Failed to initialize logging")?;

    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let store = Arc::new(MemoryStore::new());
    let mut engine = Engine::new(store.clone(), &config.engine).context("Failed to build engine")?;
    info!(
        "{} started, {} subscription filters",
        config.service.name,
        engine.subscriptions().len()
    );

    let reader: Box<dyn AsyncBufRead + Unpin> = match &args.input {
        Some(path) if !args.reads_stdin() => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        },
        _ => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut stats = ReplayStats::default();
    tokio::select! {
        result = replay(&mut engine, reader, &mut stats) => result.context("Failed to read input")?,
        signal = wait_for_shutdown() => {
            warn!("{} received, printing current state", signal);
        }
    }
    info!(
        "Replay finished: {} records, {} accepted, {} rejected, {} invalid, {} alarm passes",
        stats.lines, stats.accepted, stats.rejected, stats.invalid, stats.reconciliations
    );

    let output = render_store(&store.snapshot(), args.format);
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}
