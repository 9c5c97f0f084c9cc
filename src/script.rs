use crate::cli::AppConfig;
use crate::ffmpeg::{encode_args, video_filter};
use crate::filters::Adjustments;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Quotes a word for POSIX `sh`: wrapped in single quotes, embedded quotes spliced as `'\''`.
pub fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// A `sh` script that runs `ffmpeg` with the given arguments.
/// Fails on words that are not valid UTF-8 rather than writing a mangled path.
pub fn render_script(ffmpeg: &Path, args: &[OsString]) -> Result<String> {
    let words = std::iter::once(ffmpeg.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|w| {
            w.to_str()
                .map(shell_quote)
                .with_context(|| format!("{} is not valid UTF-8", Path::new(w).display()))
        })
        .collect::<Result<Vec<String>>>()?;
    Ok(format!(
        "#!/bin/sh\n# Generated by {} {}\nset -e\nexec {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        words.join(" \\\n    ")
    ))
}

/// Script encoding `input` with the current adjustments and the configured x264 settings.
/// Uses the `--ffmpeg` override when given, otherwise whatever `ffmpeg` is on PATH at run time.
pub fn encoder_script(
    cfg: &AppConfig,
    input: &Path,
    adjustments: &Adjustments,
) -> Result<String> {
    let ffmpeg = cfg.ffmpeg.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"));
    let vf = video_filter(adjustments);
    let args = encode_args(&cfg.encode, input, &cfg.output_for(input), vf.as_deref());
    render_script(&ffmpeg, &args)
}

pub fn write_script(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("failed to write script {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to mark {} executable", path.display()))?;
    }
    info!(path = %path.display(), "wrote encoder script");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's here"), r"'it'\''s here'");
    }

    #[test]
    fn test_render_script() {
        let args: Vec<OsString> = ["-i", "my clip.mkv", "-vf", "eq=contrast=1.20", "out.mp4"]
            .map(OsString::from)
            .to_vec();
        let script = render_script(Path::new("ffmpeg"), &args).unwrap();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("exec 'ffmpeg' \\\n    '-i' \\\n    'my clip.mkv'"));
        assert!(script.contains("'eq=contrast=1.20'"));
        assert!(script.ends_with("'out.mp4'\n"));
    }

    #[test]
    fn test_encoder_script_from_config() {
        use crate::cli::Cli;
        use crate::params::ParamId;
        use clap::Parser;

        let cfg = Cli::try_parse_from(["vidfilter_scripter", "--gamma", "1.5", "--crf", "20"])
            .unwrap()
            .into_config()
            .unwrap();
        let adj = Adjustments::with_values(&cfg.initial).unwrap();
        assert_eq!(adj[ParamId::Gamma].label(), "1.50");

        let script = encoder_script(&cfg, Path::new("/v/a.mkv"), &adj).unwrap();
        assert!(script.contains("exec 'ffmpeg'"), "{script}");
        assert!(script.contains("'eq=contrast=1.00:brightness=0.00:saturation=1.00:gamma=1.50'"));
        assert!(script.contains("'-crf' \\\n    '20'"));
        assert!(script.contains("'/v/a_adjusted.mp4'"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let input = OsStr::from_bytes(b"clip\xff.mkv").to_owned();
        let args = vec![OsString::from("-i"), input, OsString::from("out.mp4")];
        let err = render_script(Path::new("ffmpeg"), &args).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"), "{err}");
    }

    #[test]
    fn test_write_script() {
        let path = std::env::temp_dir().join(format!("vfs-test-{}.sh", std::process::id()));
        write_script(&path, "#!/bin/sh\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/bin/sh\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
        fs::remove_file(&path).unwrap();
    }
}
