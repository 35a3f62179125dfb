use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use mcm_trace::CAPTURE_EXTENSION;

/// Replays a recorded VR input session against an in-memory MCM menu.
#[derive(Parser, Debug)]
#[command(
    about = "Replays a recorded input session against an in-memory MCM menu",
    version
)]
pub struct Args {
    /// Session to replay: a JSON entry list or an .mcmt capture
    #[arg(long)]
    pub trace: PathBuf,

    /// JSON description of the menu movie the session drives
    #[arg(long)]
    pub ui_fixture: PathBuf,

    /// Optional input config JSON (defaults apply when omitted or missing)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to write the replay log (entries, ticks, UI calls) as JSON
    #[arg(long)]
    pub log_json: Option<PathBuf>,

    /// Path to write the events the handler received as an .mcmt capture
    #[arg(long)]
    pub record_capture: Option<PathBuf>,

    /// Print every UI call instead of the summary only
    #[arg(long)]
    pub verbose: bool,
}

pub fn parse() -> Result<Args> {
    Args::parse().validated()
}

impl Args {
    fn validated(self) -> Result<Self> {
        if let Some(capture) = self.record_capture.as_ref() {
            let is_capture = capture
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(CAPTURE_EXTENSION))
                .unwrap_or(false);
            if !is_capture {
                bail!(
                    "--record-capture must name a .{CAPTURE_EXTENSION} file, got {}",
                    capture.display()
                );
            }
            if *capture == self.trace {
                bail!("--record-capture would overwrite the trace being replayed");
            }
        }
        Ok(self)
    }
}
