use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use portalfolio::{AppConfig, run};

#[derive(Parser, Debug)]
#[command(author, version, about = "A 3D portfolio you walk into through portals")]
struct Args {
    /// Content JSON (splash title, projects). Uses the builtin portfolio when omitted.
    content: Option<PathBuf>,
    /// TTF/OTF font for titles and write-ups
    #[arg(long)]
    font: Option<PathBuf>,
    /// Show camera and transition state in the window title
    #[arg(long)]
    debug: bool,
    /// Initial window size as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x720", value_parser = parse_size)]
    size: (u32, u32),
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("`{v}`: {e}"));
    Ok((parse(w)?, parse(h)?))
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut config = AppConfig::new()
        .size(args.size.0, args.size.1)
        .debug(args.debug);
    if let Some(content) = args.content {
        config = config.content(content);
    }
    if let Some(font) = args.font {
        config = config.font(font);
    }

    run(config).context("portalfolio exited with an error")
}
