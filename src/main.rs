//! Flowertui: Flower Lines in the terminal.

mod app;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Options derived from CLI that affect how the game is driven and presented.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub seed: Option<u64>,
    pub no_animation: bool,
    pub frame_rate: f64,
    pub mouse: bool,
    pub bell: bool,
    pub scores_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "theme not loaded, using defaults");
            theme::Theme::default()
        }
    };
    let config = GameConfig {
        seed: args.seed,
        no_animation: args.no_animation,
        frame_rate: args.frame_rate.clamp(5.0, 240.0),
        mouse: !args.no_mouse,
        bell: args.bell,
        scores_path: args.scores.clone(),
    };
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Log to a file so the alternate screen stays clean. Level from RUST_LOG, default info.
fn init_logging(path: &std::path::Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;
    tracing::info!(path = %path.display(), "logging started");
    Ok(())
}

/// Flower Lines puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "flowertui",
    version,
    about = "Flower Lines in the terminal. Move flowers along open paths; five in a row bloom away.",
    long_about = "Flowertui is a terminal take on the classic Lines puzzle.\n\n\
        Pick a flower, then an empty cell it can reach through free cells. Five or more \
        of a kind in a row, column or diagonal are cleared and scored (10 points for five, \
        +5 for each extra). A move that clears nothing lets three new flowers sprout; the \
        game ends when the board is full.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Enter / Space  Pick / place\n  \
        Mouse click    Pick / place  N              New game\n  Q / Esc        Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Seed for flower placement (reproducible games). Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip move / bloom / sprout animations.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Do not capture the mouse (keyboard only).
    #[arg(long)]
    pub no_mouse: bool,

    /// Ring the terminal bell when flowers bloom and on game over.
    #[arg(long)]
    pub bell: bool,

    /// High score file. Defaults to $XDG_CONFIG_HOME/flowertui/highscore.
    #[arg(long, value_name = "FILE")]
    pub scores: Option<PathBuf>,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
