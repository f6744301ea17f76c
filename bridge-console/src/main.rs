//! Strainlink console
//!
//! Hosts voltage-ratio sensor nodes from a terminal: objects are created
//! and messaged with text lines on stdin, and every outlet's samples are
//! printed to stdout as `out<N> <value>`.

mod console;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bridge_node::{ChannelRouteFactory, ClassContext, Sample};
use bridge_sim::{SampleGenerator, SimulatedSdk};
use clap::Parser;
use console::{Console, Outcome};
use settings::Settings;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line options
#[derive(Parser, Debug)]
#[command(
    name = "strainlink",
    about = "Line-oriented host for voltage-ratio sensor nodes",
    version
)]
struct Args {
    /// Settings file to load instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the loaded settings to the default location
    #[arg(long)]
    save_settings: bool,
}

async fn print_outlet(index: usize, mut rx: mpsc::UnboundedReceiver<Sample>) {
    while let Some(sample) = rx.recv().await {
        println!("out{} {:.6}", index, sample.value);
    }
    debug!("Outlet {} closed", index);
}

/// Run one line; returns false when the host should exit
fn run_line(console: &mut Console, outlets: &ChannelRouteFactory, line: &str) -> bool {
    match console.execute(line) {
        Ok(Outcome::Created { .. }) => {
            for (index, rx) in outlets.take_receivers() {
                tokio::spawn(print_outlet(index, rx));
            }
            true
        }
        Ok(Outcome::Quit) => false,
        Ok(Outcome::Continue | Outcome::Destroyed) => true,
        Err(e) => {
            error!("{}", e);
            true
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "strainlink=info,bridge_sdk=info,bridge_node=info,bridge_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    if args.save_settings {
        let path = settings.save()?;
        info!("Settings written to {}", path.display());
    }

    info!("Starting strainlink (simulated device)");
    let sim = Arc::new(SimulatedSdk::with_config(settings.simulation.clone()));
    let outlets = Arc::new(ChannelRouteFactory::new());
    let mut console = Console::new(ClassContext {
        sdk: sim.clone(),
        routes: outlets.clone(),
        config: settings.node.clone(),
    });

    let generator = match settings.generator_interval_ms {
        0 => None,
        ms => Some(SampleGenerator::spawn(
            sim.clone(),
            Duration::from_millis(ms),
        )?),
    };

    let startup = settings.startup_object.trim();
    if !startup.is_empty() {
        run_line(&mut console, &outlets, &format!("new {}", startup));
        if settings.auto_configure {
            run_line(&mut console, &outlets, "config");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !run_line(&mut console, &outlets, &line) {
            break;
        }
    }

    console.shutdown();
    if let Some(generator) = generator {
        let delivered = generator.stop()?;
        info!("Delivered {} simulated sample(s)", delivered);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args =
            Args::try_parse_from(["strainlink", "--config", "/tmp/s.json", "--save-settings"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/s.json")));
        assert!(args.save_settings);

        let args = Args::try_parse_from(["strainlink", "--config=/tmp/t.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/t.json")));
        let args = Args::try_parse_from(["strainlink", "-c", "/tmp/u.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/u.json")));

        assert!(Args::try_parse_from(["strainlink", "--config"]).is_err());
        assert!(Args::try_parse_from(["strainlink", "--bogus"]).is_err());

        let args = Args::try_parse_from(["strainlink"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.save_settings);
    }
}
