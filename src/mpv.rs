use crate::session::Player;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use std::ffi::OsString;
use std::path::Path;
use std::process::Child;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Property observed for the playback-position readout.
pub const POSITION_PROPERTY: &str = "percent-pos";
const OBSERVE_ID: u64 = 1;

const QUIT_TIMEOUT: Duration = Duration::from_secs(2);
const REAP_POLL: Duration = Duration::from_millis(20);

/// One line of mpv's JSON IPC output: a command reply or an event.
#[derive(Debug, Deserialize)]
struct IpcMessage {
    event: Option<String>,
    name: Option<String>,
    #[serde(default)]
    data: Value,
    error: Option<String>,
}

type SharedPosition = Arc<Mutex<Option<f64>>>;

fn handle_message(line: &str, position: &SharedPosition) {
    let msg: IpcMessage = match serde_json::from_str(line) {
        Ok(msg) => msg,
        Err(err) => {
            warn!(%err, line, "unreadable mpv ipc message");
            return;
        }
    };
    match (msg.event.as_deref(), msg.name.as_deref()) {
        (Some("property-change"), Some(POSITION_PROPERTY)) => {
            if let Ok(mut slot) = position.lock() {
                *slot = msg.data.as_f64();
            }
        }
        (Some(event), _) => trace!(event, "mpv event"),
        (None, _) => match msg.error.as_deref() {
            Some("success") | None => trace!(line, "mpv reply"),
            Some(error) => warn!(error, "mpv rejected a command"),
        },
    }
}

fn command_line(args: &[&str]) -> String {
    json!({ "command": args }).to_string()
}

pub fn launch_args(endpoint: &Path, input: &Path, initial_filter: &str) -> Vec<OsString> {
    let mut ipc_arg = OsString::from("--input-ipc-server=");
    ipc_arg.push(endpoint);
    vec![
        "--force-window=yes".into(),
        "--keep-open=yes".into(),
        ipc_arg,
        format!("--vf={initial_filter}").into(),
        "--".into(),
        input.as_os_str().to_owned(),
    ]
}

/// Waits up to `timeout` for `child` to exit, then kills it.
fn reap(child: &mut Child, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
            Ok(None) => {
                warn!("mpv did not quit in time, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
            Err(err) => {
                warn!(%err, "failed to reap mpv");
                return;
            }
        }
    }
}

#[cfg(unix)]
pub use self::unix::{MpvIpc, MpvPlayer};

#[cfg(unix)]
mod unix {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixStream;
    use std::path::PathBuf;
    use std::process::{Command, Stdio};
    use tracing::{debug, info};

    const CONNECT_ATTEMPTS: u32 = 50;
    const CONNECT_DELAY: Duration = Duration::from_millis(100);

    /// JSON IPC connection to mpv. A reader thread consumes replies and events and keeps the
    /// latest observed playback position.
    pub struct MpvIpc {
        stream: UnixStream,
        position: SharedPosition,
    }

    impl MpvIpc {
        pub fn new(stream: UnixStream) -> Result<Self> {
            let reader = stream
                .try_clone()
                .context("failed to clone mpv ipc handle")?;
            let position = SharedPosition::default();
            let slot = Arc::clone(&position);
            thread::spawn(move || {
                for line in BufReader::new(reader).lines() {
                    match line {
                        Ok(line) => handle_message(&line, &slot),
                        Err(_) => break,
                    }
                }
            });

            let mut ipc = Self { stream, position };
            let observe = json!({ "command": ["observe_property", OBSERVE_ID, POSITION_PROPERTY] });
            ipc.send(&observe.to_string())?;
            Ok(ipc)
        }

        fn send(&mut self, line: &str) -> Result<()> {
            debug!(line, "mpv ipc");
            self.stream
                .write_all(format!("{line}\n").as_bytes())
                .and_then(|_| self.stream.flush())
                .context("failed to write to mpv ipc")
        }

        pub fn quit(&mut self) -> Result<()> {
            self.command(&["quit"])
        }
    }

    impl Player for MpvIpc {
        fn command(&mut self, args: &[&str]) -> Result<()> {
            self.send(&command_line(args))
        }

        fn set_paused(&mut self, paused: bool) -> Result<()> {
            self.command(&["set", "pause", if paused { "yes" } else { "no" }])
        }

        fn position(&self) -> Option<f64> {
            self.position.lock().ok().and_then(|slot| *slot)
        }
    }

    /// A running mpv process controlled over its IPC socket.
    pub struct MpvPlayer {
        child: Child,
        ipc: MpvIpc,
        endpoint: PathBuf,
    }

    impl MpvPlayer {
        pub fn launch(
            mpv: &Path,
            input: &Path,
            initial_filter: &str,
            verbose: bool,
        ) -> Result<Self> {
            let endpoint = std::env::temp_dir()
                .join(format!("vidfilter_scripter-{}.sock", std::process::id()));
            let args = launch_args(&endpoint, input, initial_filter);
            info!(mpv = %mpv.display(), input = %input.display(), "starting preview");

            let mut child = Command::new(mpv)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(if verbose {
                    Stdio::inherit()
                } else {
                    Stdio::null()
                })
                .stderr(if verbose {
                    Stdio::inherit()
                } else {
                    Stdio::null()
                })
                .spawn()
                .context("failed to spawn mpv")?;

            let ipc = match connect(&endpoint, &mut child).and_then(MpvIpc::new) {
                Ok(ipc) => ipc,
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(err);
                }
            };
            Ok(Self {
                child,
                ipc,
                endpoint,
            })
        }
    }

    impl Player for MpvPlayer {
        fn command(&mut self, args: &[&str]) -> Result<()> {
            self.ipc.command(args)
        }

        fn set_paused(&mut self, paused: bool) -> Result<()> {
            self.ipc.set_paused(paused)
        }

        fn position(&self) -> Option<f64> {
            self.ipc.position()
        }
    }

    impl Drop for MpvPlayer {
        fn drop(&mut self) {
            if self.ipc.quit().is_err() {
                let _ = self.child.kill();
            }
            reap(&mut self.child, QUIT_TIMEOUT);
            let _ = std::fs::remove_file(&self.endpoint);
        }
    }

    fn connect(endpoint: &Path, child: &mut Child) -> Result<UnixStream> {
        for _ in 0..CONNECT_ATTEMPTS {
            if let Some(status) = child.try_wait()? {
                bail!("mpv exited before accepting commands ({status})");
            }
            if let Ok(stream) = UnixStream::connect(endpoint) {
                return Ok(stream);
            }
            thread::sleep(CONNECT_DELAY);
        }
        bail!("timed out waiting for mpv ipc at {}", endpoint.display())
    }
}

/// Live preview talks to mpv over a unix socket. mpv's Windows named pipe needs overlapped
/// I/O for concurrent reads and writes, which std's `File` does not do.
#[cfg(not(unix))]
pub struct MpvPlayer {
    never: std::convert::Infallible,
}

#[cfg(not(unix))]
impl MpvPlayer {
    pub fn launch(_mpv: &Path, _input: &Path, _filter: &str, _verbose: bool) -> Result<Self> {
        bail!("live preview needs mpv's unix socket IPC; use --print-filter, --script or --encode")
    }
}

#[cfg(not(unix))]
impl Player for MpvPlayer {
    fn command(&mut self, _args: &[&str]) -> Result<()> {
        match self.never {}
    }

    fn set_paused(&mut self, _paused: bool) -> Result<()> {
        match self.never {}
    }

    fn position(&self) -> Option<f64> {
        match self.never {}
    }
}
