use crate::filters::{parse_brightness, parse_contrast, parse_gamma, parse_saturation};
use crate::params::ParamId;
use anyhow::{Result, bail};
use clap::{ArgAction, ArgGroup, Parser, ValueHint};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// An mpv front-end that previews eq adjustments live and writes an ffmpeg script applying them.
#[derive(Parser, Debug)]
#[command(
    name = "vidfilter_scripter",
    version,
    about = "Preview contrast/brightness/saturation/gamma in mpv and script the ffmpeg encode"
)]
#[command(group(ArgGroup::new("mode").args(["print_filter", "script", "encode"])))]
pub struct Cli {
    /// Video file to set up for re-encoding
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Initial contrast (0.00..2.00, default 1.00)
    #[arg(long, value_parser = parse_contrast)]
    pub contrast: Option<f64>,

    /// Initial brightness (-0.50..0.50, default 0.00)
    #[arg(long, value_parser = parse_brightness, allow_negative_numbers = true)]
    pub brightness: Option<f64>,

    /// Initial saturation (0.00..3.00, default 1.00)
    #[arg(long, value_parser = parse_saturation)]
    pub saturation: Option<f64>,

    /// Initial gamma (0.10..5.00, default 1.00)
    #[arg(long, value_parser = parse_gamma)]
    pub gamma: Option<f64>,

    /// Print the eq filter for the given values and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub print_filter: bool,

    /// Write an ffmpeg encoder script to PATH and exit
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub script: Option<PathBuf>,

    /// Encode FILE right away with the given values
    #[arg(long, action = ArgAction::SetTrue)]
    pub encode: bool,

    /// Encoded output file (default: <file>_adjusted.mp4)
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// x264 CRF (used only if adjustments differ from defaults)
    #[arg(long, default_value = "17")]
    pub crf: u8,

    /// x264 preset (used only if adjustments differ from defaults)
    #[arg(long, default_value = "slow")]
    pub preset: String,

    /// Threads to allow ffmpeg (0 = auto/max)
    #[arg(long, default_value = "0")]
    pub threads: u16,

    /// Path to mpv binary (overrides PATH lookup)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub mpv: Option<PathBuf>,

    /// Path to ffmpeg binary (overrides PATH lookup)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to ffprobe binary (overrides PATH lookup)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub ffprobe: Option<PathBuf>,

    /// Show debug logs and raw mpv/ffmpeg output
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Interactive,
    PrintFilter,
    Script(PathBuf),
    Encode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub crf: u8,
    pub preset: String,
    pub threads: u16,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: Mode,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub initial: Vec<(ParamId, f64)>,
    pub encode: EncodeSettings,
    pub mpv: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig> {
        let mode = if self.print_filter {
            Mode::PrintFilter
        } else if let Some(path) = self.script {
            Mode::Script(path)
        } else if self.encode {
            Mode::Encode
        } else {
            Mode::Interactive
        };

        if let Some(input) = &self.file {
            if !input.exists() {
                bail!("Input not found: {}", input.display());
            }
        } else if matches!(mode, Mode::Script(_) | Mode::Encode) {
            bail!("An input file is required to write a script or encode");
        }

        let initial = [
            (ParamId::Contrast, self.contrast),
            (ParamId::Brightness, self.brightness),
            (ParamId::Saturation, self.saturation),
            (ParamId::Gamma, self.gamma),
        ]
        .into_iter()
        .filter_map(|(id, value)| value.map(|v| (id, v)))
        .collect();

        Ok(AppConfig {
            mode,
            input: self.file,
            output: self.output,
            initial,
            encode: EncodeSettings {
                crf: self.crf,
                preset: self.preset,
                threads: self.threads,
                verbose: self.verbose,
            },
            mpv: self.mpv,
            ffmpeg: self.ffmpeg,
            ffprobe: self.ffprobe,
            verbose: self.verbose,
        })
    }
}

impl AppConfig {
    pub fn output_for(&self, input: &Path) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output(input))
    }
}

fn adjusted_sibling(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("output");
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_adjusted.{extension}"))
}

pub fn default_output(input: &Path) -> PathBuf {
    adjusted_sibling(input, "mp4")
}

pub fn default_script(input: &Path) -> PathBuf {
    adjusted_sibling(input, "sh")
}
