use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::thread;
use std::time::Duration;

pub struct ProgressUi {
    _multi: MultiProgress,
    spinner: ProgressBar,
    bar: ProgressBar,
    total_ms: u64,
    filtered: bool,
}

impl ProgressUi {
    pub fn new(total_ms: u64, filtered: bool) -> Result<Self> {
        let multi = MultiProgress::new();

        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")?.tick_strings(&["-", "\\", "|", "/"]),
        );
        spinner.set_message("Preparing.");

        let bar = multi.add(ProgressBar::new(total_ms));
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}]  [{bar:60.cyan/bright-black}] {percent:>3}%  {pos}/{len}ms  ETA:{eta_precise}\n{wide_msg}",
            )?
            .progress_chars("#>-"),
        );
        bar.set_message(if filtered {
            "Building eq filter graph."
        } else {
            "No adjustments, copying streams."
        });

        Ok(Self {
            _multi: multi,
            spinner,
            bar,
            total_ms,
            filtered,
        })
    }

    fn update_stage(&self, pos_ms: u64) {
        self.bar.set_position(pos_ms);
        let pct = (pos_ms as f64) / (self.total_ms as f64);
        if pct < 0.95 {
            if self.filtered {
                self.spinner.set_message("Encoding video.");
                self.bar.set_message("Applying eq adjustments to frames...");
            } else {
                self.spinner.set_message("Copying streams.");
                self.bar.set_message("Remuxing...");
            }
        } else {
            self.spinner.set_message("Finalizing and muxing.");
            self.bar
                .set_message("Muxing, writing headers, closing output...");
        }
    }

    fn finish(&self) {
        self.bar.finish_with_message("Done");
        self.spinner.finish_with_message("Completed");
    }
}

/// Parses one line of ffmpeg's `-progress` output into a key/value pair.
fn parse_progress_line<'a>(re_kv: &Regex, line: &'a str) -> Option<(&'a str, &'a str)> {
    let caps = re_kv.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

pub fn pump_progress<R: Read + Send + 'static>(
    reader: R,
    ui: ProgressUi,
) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || {
        let re_kv = Regex::new(r"^(\w+)=([\w\-\.:]+)$")?;
        let reader = BufReader::new(reader);

        for line in reader.lines() {
            let line = line?;
            match parse_progress_line(&re_kv, &line) {
                Some(("out_time_ms", val)) => {
                    let us: u64 = val.parse().unwrap_or(0);
                    let pos_ms = (us / 1000).min(ui.total_ms);
                    ui.update_stage(pos_ms);
                }
                Some(("progress", "end")) => ui.finish(),
                _ => {}
            }
        }
        Ok(())
    })
}
