use crate::cli::EncodeSettings;
use crate::filters::Adjustments;
use crate::progress::{ProgressUi, pump_progress};
use anyhow::{Context, Result, anyhow, bail};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, info};
use which::which;

#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

#[derive(Debug)]
pub struct FfmpegSession {
    pub child: Child,
    pub stdout: ChildStdout,
}

pub fn resolve_tools(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> Result<Tools> {
    Ok(Tools {
        ffmpeg: resolve_bin(ffmpeg, "ffmpeg")?,
        ffprobe: resolve_bin(ffprobe, "ffprobe")?,
    })
}

pub fn probe_duration_seconds(tools: &Tools, input: &Path) -> Result<f64> {
    let out = Command::new(&tools.ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input)
        .output()
        .context("failed to run ffprobe")?;
    if !out.status.success() {
        bail!("ffprobe error (status {})", out.status);
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    s.parse::<f64>().context("cannot parse duration")
}

/// The filter to bake into an encode, or `None` when every parameter is at its default.
pub fn video_filter(adjustments: &Adjustments) -> Option<String> {
    (!adjustments.is_identity()).then(|| adjustments.eq_filter())
}

/// ffmpeg arguments from `-i` through the output path.
/// Video is re-encoded with x264 only when a filter is given; audio is always copied.
pub fn encode_args(
    settings: &EncodeSettings,
    input: &Path,
    output: &Path,
    video_filter: Option<&str>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];

    match video_filter {
        Some(vf) => {
            args.extend(["-vf", vf].map(OsString::from));
            args.extend(["-c:v", "libx264", "-crf"].map(OsString::from));
            args.push(settings.crf.to_string().into());
            args.extend(["-preset", settings.preset.as_str()].map(OsString::from));
            args.extend(["-pix_fmt", "yuv420p"].map(OsString::from));
        }
        None => args.extend(["-c:v", "copy"].map(OsString::from)),
    }
    if settings.threads > 0 {
        args.push("-threads".into());
        args.push(settings.threads.to_string().into());
    }
    args.extend(["-c:a", "copy"].map(OsString::from));
    args.push(output.into());
    args
}

pub fn spawn_ffmpeg(
    tools: &Tools,
    settings: &EncodeSettings,
    args: &[OsString],
) -> Result<FfmpegSession> {
    let mut cmd = Command::new(&tools.ffmpeg);
    if !settings.verbose {
        cmd.arg("-hide_banner")
            .arg("-nostats")
            .arg("-loglevel")
            .arg("error");
    }
    cmd.arg("-y").arg("-progress").arg("-").args(args);
    debug!(?cmd, "spawning ffmpeg");

    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(if settings.verbose {
            Stdio::inherit()
        } else {
            Stdio::null()
        })
        .spawn()
        .context("failed to spawn ffmpeg")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("failed to capture ffmpeg stdout"))?;

    Ok(FfmpegSession { child, stdout })
}

pub fn wait_for_completion(mut child: Child) -> Result<()> {
    let status = child.wait()?;
    if !status.success() {
        bail!("ffmpeg failed with status: {}", status);
    }
    Ok(())
}

/// Encodes `input` to `output` with the current adjustments, showing progress.
pub fn encode(
    tools: &Tools,
    settings: &EncodeSettings,
    input: &Path,
    output: &Path,
    adjustments: &Adjustments,
) -> Result<()> {
    let duration_s = probe_duration_seconds(tools, input)?;
    let total_ms = (duration_s * 1000.0).max(1.0) as u64;

    let vf = video_filter(adjustments);
    info!(
        input = %input.display(),
        output = %output.display(),
        filter = vf.as_deref().unwrap_or("copy"),
        "encoding"
    );

    let ui = ProgressUi::new(total_ms, vf.is_some())?;
    let args = encode_args(settings, input, output, vf.as_deref());
    let session = spawn_ffmpeg(tools, settings, &args)?;
    let reader = pump_progress(session.stdout, ui);

    let status = wait_for_completion(session.child);
    match reader.join() {
        Ok(result) => result?,
        Err(_) => bail!("progress reader panicked"),
    }
    status
}

pub fn resolve_bin(bin_opt: Option<PathBuf>, default: &str) -> Result<PathBuf> {
    if let Some(path) = bin_opt {
        if path.is_file() {
            return Ok(path);
        }
        bail!("Provided binary not found: {}", path.display());
    }

    which(default)
        .or_else(|_| {
            if cfg!(windows) {
                let exe = format!("{default}.exe");
                which(&exe)
            } else {
                Err(which::Error::CannotFindBinaryPath)
            }
        })
        .with_context(|| format!("`{default}` not found in PATH"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamId;

    fn settings() -> EncodeSettings {
        EncodeSettings {
            crf: 17,
            preset: "slow".into(),
            threads: 0,
            verbose: false,
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_identity_stream_copies() {
        let adj = Adjustments::new().unwrap();
        assert_eq!(video_filter(&adj), None);

        let args = encode_args(&settings(), Path::new("in.mkv"), Path::new("out.mp4"), None);
        assert_eq!(
            strings(&args),
            ["-i", "in.mkv", "-c:v", "copy", "-c:a", "copy", "out.mp4"]
        );
    }

    #[test]
    fn test_filter_reencodes() {
        let mut adj = Adjustments::new().unwrap();
        adj[ParamId::Contrast].set_value(1.25).unwrap();
        let vf = video_filter(&adj).unwrap();

        let mut s = settings();
        s.threads = 4;
        let args = strings(&encode_args(
            &s,
            Path::new("in.mkv"),
            Path::new("out.mp4"),
            Some(vf.as_str()),
        ));
        assert_eq!(
            args,
            [
                "-i",
                "in.mkv",
                "-vf",
                "eq=contrast=1.25:brightness=0.00:saturation=1.00:gamma=1.00",
                "-c:v",
                "libx264",
                "-crf",
                "17",
                "-preset",
                "slow",
                "-pix_fmt",
                "yuv420p",
                "-threads",
                "4",
                "-c:a",
                "copy",
                "out.mp4",
            ]
        );
    }

    #[test]
    fn test_resolve_bin_rejects_missing_override() {
        let missing = PathBuf::from("/definitely/not/here/ffmpeg");
        let err = resolve_bin(Some(missing), "ffmpeg").unwrap_err();
        assert!(err.to_string().contains("Provided binary not found"));
    }
}
