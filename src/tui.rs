use crate::cli::{AppConfig, default_script};
use crate::ffmpeg::{self, resolve_bin, resolve_tools};
use crate::filters::{Adjustments, parse_param_value, validate_percent, validate_slider_position};
use crate::mpv::MpvPlayer;
use crate::params::{ParamId, ParameterSpec, SLIDER_MAX};
use crate::script::{encoder_script, write_script};
use crate::session::{POSITION_SLIDER_MAX, Player, Session, position_slider_value};
use anyhow::Result;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Param(ParamId),
    TogglePlay,
    Seek,
    WriteScript,
    Encode,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamAction {
    Slider,
    Value,
    Reset,
    Back,
}

const PARAM_ACTIONS: [(ParamAction, &str); 4] = [
    (ParamAction::Slider, "Move slider"),
    (ParamAction::Value, "Type a value"),
    (ParamAction::Reset, "Reset to default"),
    (ParamAction::Back, "Back"),
];

fn menu_entries() -> Vec<Entry> {
    ParamId::ALL
        .into_iter()
        .map(Entry::Param)
        .chain([
            Entry::TogglePlay,
            Entry::Seek,
            Entry::WriteScript,
            Entry::Encode,
            Entry::Quit,
        ])
        .collect()
}

fn entry_label<P: Player>(entry: Entry, session: &Session<P>) -> String {
    match entry {
        Entry::Param(id) => {
            let p = &session.adjustments()[id];
            format!(
                "{:<11}{:>6}   [{:>3}/{SLIDER_MAX}]",
                id.name(),
                p.label(),
                p.slider_position()
            )
        }
        Entry::TogglePlay if session.is_playing() => "Pause".into(),
        Entry::TogglePlay => "Play".into(),
        Entry::Seek => "Seek to %".into(),
        Entry::WriteScript => "Write encoder script".into(),
        Entry::Encode => "Encode now".into(),
        Entry::Quit => "Quit".into(),
    }
}

/// Menu prompt: playback position followed by the current filter.
fn header<P: Player>(session: &Session<P>) -> String {
    let eq = session.adjustments().eq_filter();
    match session.position() {
        Some(pct) => format!(
            "{pct:5.1}% [{:>4}/{POSITION_SLIDER_MAX}]  {eq}",
            position_slider_value(pct)
        ),
        None => format!(" --.-% [   -/{POSITION_SLIDER_MAX}]  {eq}"),
    }
}

/// Previews `cfg.input` in mpv and lets the user tune the eq parameters from the terminal.
pub fn run_session(cfg: &AppConfig, adjustments: Adjustments) -> Result<Adjustments> {
    let theme = ColorfulTheme::default();
    println!("Video Filter Scripter");
    println!("Adjust the eq filter while mpv previews the result.\n");

    let input = match &cfg.input {
        Some(path) => path.clone(),
        None => prompt_input(&theme)?,
    };
    let mpv = resolve_bin(cfg.mpv.clone(), "mpv")?;
    let player = MpvPlayer::launch(&mpv, &input, &adjustments.eq_filter(), cfg.verbose)?;
    let mut session = Session::new(adjustments, player);

    let entries = menu_entries();
    let mut selected = 0;
    loop {
        let labels: Vec<String> = entries
            .iter()
            .map(|&entry| entry_label(entry, &session))
            .collect();
        selected = Select::with_theme(&theme)
            .with_prompt(header(&session))
            .items(&labels)
            .default(selected)
            .interact()?;

        match step(&theme, cfg, &input, &mut session, entries[selected]) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => {
                warn!("leaving session: {err:#}");
                println!("Lost contact with mpv: {err:#}");
                break;
            }
        }
    }

    let (adjustments, _player) = session.into_parts();
    info!(filter = %adjustments.eq_filter(), "session closed");
    Ok(adjustments)
}

/// Runs one menu entry. `Ok(false)` ends the session; an error means the player is gone.
fn step<P: Player>(
    theme: &ColorfulTheme,
    cfg: &AppConfig,
    input: &Path,
    session: &mut Session<P>,
    entry: Entry,
) -> Result<bool> {
    match entry {
        Entry::Param(id) => edit_param(theme, session, id)?,
        Entry::TogglePlay => {
            session.toggle_play()?;
        }
        Entry::Seek => {
            let percent = prompt_percent(theme, session.position())?;
            session.seek(percent)?;
        }
        Entry::WriteScript => {
            if let Err(err) = save_script(theme, cfg, input, session.adjustments()) {
                warn!("{err:#}");
                println!("Could not write script: {err:#}");
            }
        }
        Entry::Encode => {
            let output = cfg.output_for(input);
            let result = resolve_tools(cfg.ffmpeg.clone(), cfg.ffprobe.clone())
                .and_then(|tools| {
                    ffmpeg::encode(&tools, &cfg.encode, input, &output, session.adjustments())
                });
            match result {
                Ok(()) => println!("Encoded {}", output.display()),
                Err(err) => {
                    warn!("{err:#}");
                    println!("Encode failed: {err:#}");
                }
            }
        }
        Entry::Quit => return Ok(false),
    }
    Ok(true)
}

fn edit_param<P: Player>(
    theme: &ColorfulTheme,
    session: &mut Session<P>,
    id: ParamId,
) -> Result<()> {
    let labels: Vec<&str> = PARAM_ACTIONS.iter().map(|(_, label)| *label).collect();
    let choice = Select::with_theme(theme)
        .with_prompt(format!("{id} = {}", session.adjustments()[id].label()))
        .items(&labels)
        .default(0)
        .interact()?;

    let label = match PARAM_ACTIONS[choice].0 {
        ParamAction::Slider => {
            let current = session.adjustments()[id].slider_position();
            let position = prompt_slider_position(theme, current)?;
            session.set_slider(id, position)?
        }
        ParamAction::Value => {
            let value = prompt_value(theme, session.adjustments()[id].spec())?;
            session.set_value(id, value)?
        }
        ParamAction::Reset => session.reset(id)?,
        ParamAction::Back => return Ok(()),
    };
    info!(%id, value = session.adjustments()[id].value(), %label, "parameter changed");
    Ok(())
}

fn prompt_input(theme: &ColorfulTheme) -> Result<PathBuf> {
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt("Video file to preview")
            .interact_text()?;
        let path = PathBuf::from(raw.trim());
        if path.exists() {
            return Ok(path);
        }
        println!("Path not found, please try again.");
    }
}

fn prompt_slider_position(theme: &ColorfulTheme, current: i32) -> Result<i32> {
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt(format!("Slider position (0-{SLIDER_MAX})"))
            .default(current.to_string())
            .interact_text()?;
        match validate_slider_position(&raw) {
            Ok(position) => return Ok(position),
            Err(err) => println!("Invalid value: {err}."),
        }
    }
}

fn prompt_percent(theme: &ColorfulTheme, current: Option<f64>) -> Result<f64> {
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt("Seek to % of the file (0-100)")
            .default(format!("{:.1}", current.unwrap_or(0.0)))
            .interact_text()?;
        match validate_percent(&raw) {
            Ok(percent) => return Ok(percent),
            Err(err) => println!("Invalid value: {err}."),
        }
    }
}

fn prompt_value(theme: &ColorfulTheme, spec: &ParameterSpec) -> Result<f64> {
    let id = spec.id;
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt(format!(
                "{id} ({}..{})",
                spec.format(spec.min),
                spec.format(spec.max)
            ))
            .default(spec.format(spec.default))
            .interact_text()?;
        match parse_param_value(id, &raw) {
            Ok(value) => return Ok(value),
            Err(err) => println!("Invalid value: {err}."),
        }
    }
}

fn save_script(
    theme: &ColorfulTheme,
    cfg: &AppConfig,
    input: &Path,
    adjustments: &Adjustments,
) -> Result<()> {
    let default_path = default_script(input);
    let raw: String = Input::with_theme(theme)
        .with_prompt("Script path")
        .default(default_path.to_string_lossy().into_owned())
        .interact_text()?;
    let path = PathBuf::from(raw.trim());

    write_script(&path, &encoder_script(cfg, input, adjustments)?)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use anyhow::bail;
    use clap::Parser;

    struct Null(Option<f64>);

    impl Player for Null {
        fn command(&mut self, _args: &[&str]) -> Result<()> {
            Ok(())
        }

        fn set_paused(&mut self, _paused: bool) -> Result<()> {
            Ok(())
        }

        fn position(&self) -> Option<f64> {
            self.0
        }
    }

    struct Gone;

    impl Player for Gone {
        fn command(&mut self, _args: &[&str]) -> Result<()> {
            bail!("mpv exited")
        }

        fn set_paused(&mut self, _paused: bool) -> Result<()> {
            bail!("mpv exited")
        }

        fn position(&self) -> Option<f64> {
            None
        }
    }

    #[test]
    fn test_menu_has_row_per_param() {
        let entries = menu_entries();
        assert_eq!(entries.len(), ParamId::ALL.len() + 5);
        for (entry, id) in entries.iter().zip(ParamId::ALL) {
            assert_eq!(*entry, Entry::Param(id));
        }
        assert!(entries.contains(&Entry::Seek));
        assert_eq!(entries.last(), Some(&Entry::Quit));
    }

    #[test]
    fn test_entry_labels() {
        let mut session = Session::new(Adjustments::new().unwrap(), Null(None));
        session.set_slider(ParamId::Brightness, 150).unwrap();

        let row = entry_label(Entry::Param(ParamId::Brightness), &session);
        assert!(row.starts_with("brightness"), "{row}");
        assert!(row.contains("0.25"), "{row}");
        assert!(row.contains("[150/200]"), "{row}");

        assert_eq!(entry_label(Entry::TogglePlay, &session), "Pause");
        session.toggle_play().unwrap();
        assert_eq!(entry_label(Entry::TogglePlay, &session), "Play");
        assert_eq!(entry_label(Entry::Seek, &session), "Seek to %");
    }

    #[test]
    fn test_header_shows_position() {
        let session = Session::new(Adjustments::new().unwrap(), Null(Some(42.37)));
        let header = header(&session);
        assert!(header.starts_with(" 42.4% [ 423/1000]"), "{header}");
        assert!(header.ends_with("eq=contrast=1.00:brightness=0.00:saturation=1.00:gamma=1.00"));

        let session = Session::new(Adjustments::new().unwrap(), Null(None));
        assert!(super::header(&session).starts_with(" --.-% [   -/1000]"));
    }

    #[test]
    fn test_step_reports_lost_player() {
        let cfg = Cli::try_parse_from(["vidfilter_scripter"])
            .unwrap()
            .into_config()
            .unwrap();
        let theme = ColorfulTheme::default();
        let input = Path::new("clip.mkv");
        let mut tuned = Adjustments::new().unwrap();
        tuned[ParamId::Contrast].set_value(1.25).unwrap();
        let mut session = Session::new(tuned, Gone);

        let result = step(&theme, &cfg, input, &mut session, Entry::TogglePlay);
        assert!(result.is_err());
        assert!(session.is_playing());
        assert!(!step(&theme, &cfg, input, &mut session, Entry::Quit).unwrap());

        let (adjustments, _) = session.into_parts();
        assert_eq!(adjustments[ParamId::Contrast].label(), "1.25");
    }
}
