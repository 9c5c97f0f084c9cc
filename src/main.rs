mod cli;
mod ffmpeg;
mod filters;
mod mpv;
mod params;
mod progress;
mod script;
mod session;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{AppConfig, Mode};
use filters::Adjustments;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = cli.into_config()?;
    let adjustments =
        Adjustments::with_values(&cfg.initial).context("invalid initial adjustments")?;

    match &cfg.mode {
        Mode::PrintFilter => println!("{}", adjustments.eq_filter()),
        Mode::Script(path) => {
            let input = required_input(&cfg)?;
            let contents = script::encoder_script(&cfg, input, &adjustments)?;
            script::write_script(path, &contents)?;
        }
        Mode::Encode => {
            let input = required_input(&cfg)?;
            let tools = ffmpeg::resolve_tools(cfg.ffmpeg.clone(), cfg.ffprobe.clone())?;
            ffmpeg::encode(&tools, &cfg.encode, input, &cfg.output_for(input), &adjustments)?;
        }
        Mode::Interactive => {
            let adjustments = tui::run_session(&cfg, adjustments)?;
            println!("{}", adjustments.eq_filter());
        }
    }
    Ok(())
}

fn required_input(cfg: &AppConfig) -> Result<&Path> {
    cfg.input
        .as_deref()
        .context("an input file is required for this mode")
}
