use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use segue::config::SegueConfig;
use segue::replay::Replay;
use segue::{AnimatorConfig, FileSessionStore, MemorySessionStore, SessionStore, TransitionEvent};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: segue-replay [--outlet ID] [--config FILE] PAGE.html KEY...";

struct Args {
    outlet: String,
    config: Option<PathBuf>,
    page: PathBuf,
    keys: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut outlet = "outlet".to_string();
    let mut config = None;
    let mut positional = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--outlet" => outlet = args.next().context("--outlet needs a value")?,
            "--config" => {
                let path = args.next().context("--config needs a value")?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(page) = positional.next() else {
        bail!("{USAGE}");
    };
    Ok(Args {
        outlet,
        config,
        page: PathBuf::from(page),
        keys: positional.collect(),
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => {
            let mut config = SegueConfig::load_from_file(path)?;
            config.merge_with_env();
            config
        }
        None => SegueConfig::load(),
    };

    let store: Box<dyn SessionStore> = match &config.session.file {
        Some(path) => Box::new(
            FileSessionStore::open(path)
                .with_context(|| format!("opening session file {}", path.display()))?,
        ),
        None => Box::new(MemorySessionStore::new()),
    };

    let markup = std::fs::read_to_string(&args.page)
        .with_context(|| format!("reading {}", args.page.display()))?;
    let mut replay = Replay::boot(&markup, &args.outlet, AnimatorConfig::from(&config), store)?;
    info!(page = %args.page.display(), steps = args.keys.len(), "replaying");

    for key in &args.keys {
        let step = replay.visit(key)?;
        let direction = match step.direction {
            Some(direction) => format!("{direction:?}"),
            None => "none".to_string(),
        };
        let aborted = step
            .events
            .iter()
            .any(|event| matches!(event, TransitionEvent::Aborted { .. }));
        println!(
            "{key:<16} direction={direction:<8} history={:?}{}",
            replay.history(),
            if aborted { " (aborted)" } else { "" }
        );
    }

    println!("{}", replay.markup());
    Ok(())
}
