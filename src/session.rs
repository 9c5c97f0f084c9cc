use crate::filters::Adjustments;
use crate::params::{ParamId, Parameter};
use anyhow::Result;
use tracing::{debug, warn};

/// Resolution of the playback-position readout: tenths of a percent.
pub const POSITION_SLIDER_MAX: i32 = 1000;

/// Playback engine that accepts filter commands and play/pause control.
pub trait Player {
    fn command(&mut self, args: &[&str]) -> Result<()>;
    fn set_paused(&mut self, paused: bool) -> Result<()>;
    /// Latest playback position reported by the player, in percent of the file.
    fn position(&self) -> Option<f64>;
}

pub fn position_slider_value(percent: f64) -> i32 {
    (percent.clamp(0.0, 100.0) * 10.0) as i32
}

/// Adjustments plus the player they drive. Every change is pushed to the player immediately.
///
/// A change the player rejects is rolled back, so the adjustments always match what the
/// player last accepted.
pub struct Session<P: Player> {
    adjustments: Adjustments,
    player: P,
    playing: bool,
}

impl<P: Player> Session<P> {
    pub fn new(adjustments: Adjustments, player: P) -> Self {
        Self {
            adjustments,
            player,
            playing: true,
        }
    }

    pub fn adjustments(&self) -> &Adjustments {
        &self.adjustments
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> Option<f64> {
        self.player.position()
    }

    /// Moves a slider and returns the parameter's new label.
    pub fn set_slider(&mut self, id: ParamId, position: i32) -> Result<String> {
        self.update(id, |p| {
            p.set_from_slider_position(position);
            Ok(())
        })
    }

    pub fn set_value(&mut self, id: ParamId, value: f64) -> Result<String> {
        self.update(id, |p| Ok(p.set_value(value)?))
    }

    pub fn reset(&mut self, id: ParamId) -> Result<String> {
        self.update(id, |p| {
            p.reset_to_default();
            Ok(())
        })
    }

    pub fn toggle_play(&mut self) -> Result<bool> {
        self.player.set_paused(self.playing)?;
        self.playing = !self.playing;
        Ok(self.playing)
    }

    /// Seeks to `percent` of the file, clamped to `0..=100`.
    pub fn seek(&mut self, percent: f64) -> Result<()> {
        let target = format!("{:.2}", percent.clamp(0.0, 100.0));
        debug!(%target, "seeking");
        self.player.command(&["seek", &target, "absolute-percent"])
    }

    fn update(
        &mut self,
        id: ParamId,
        change: impl FnOnce(&mut Parameter) -> Result<()>,
    ) -> Result<String> {
        let previous = self.adjustments[id].clone();
        change(&mut self.adjustments[id])?;
        if let Err(err) = self.apply() {
            warn!(%id, "player rejected filter, restoring {}", previous.label());
            self.adjustments[id] = previous;
            return Err(err);
        }
        Ok(self.adjustments[id].label())
    }

    fn apply(&mut self) -> Result<()> {
        let cmd = self.adjustments.vf_command();
        debug!(?cmd, "sending filter to player");
        let args: Vec<&str> = cmd.iter().map(String::as_str).collect();
        self.player.command(&args)
    }

    pub fn into_parts(self) -> (Adjustments, P) {
        (self.adjustments, self.player)
    }
}
