use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use eyre::{Result as EyreResult, WrapErr};
use hwemu_primitives::{DeviceName, Interface};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::cli::Environment;
use crate::output::{InfoLine, Report};
use crate::system::{exposed_devices, ExposedDevice};

/// Polls every tty device for data arriving from the module and logs it
/// as hex until the deadline.
#[derive(Clone, Copy, Debug, Parser)]
pub struct WatchCommand {
    /// How long to watch
    #[arg(long, value_name = "SECONDS")]
    pub seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
struct Watched {
    device: DeviceName,
    path: Utf8PathBuf,
    received: usize,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct Summary(Vec<Watched>);

impl Report for Summary {
    fn report(&self) {
        for watched in &self.0 {
            InfoLine(&format!(
                "{} ({}): {} byte(s) received",
                watched.device, watched.path, watched.received
            ))
            .report();
        }
    }
}

impl WatchCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let settings = &environment.config.watch;
        let duration = Duration::from_secs(self.seconds.unwrap_or(settings.seconds));
        let poll = Duration::from_millis(settings.poll_ms.max(1));

        let ttys: Vec<_> = exposed_devices(&settings.dev_dir, &environment.profile)
            .await?
            .into_iter()
            .filter(|exposed| exposed.device.iface() == Interface::Tty)
            .collect();

        if ttys.is_empty() {
            environment.output.write(&InfoLine("no tty devices to watch"));
            return Ok(());
        }

        let deadline = Instant::now() + duration;
        let mut tasks = JoinSet::new();

        for exposed in ttys {
            let _handle = tasks.spawn(watch_device(exposed, deadline, poll));
        }

        let mut summary = Vec::new();
        let mut first_error = None;

        while let Some(joined) = tasks.join_next().await {
            match joined.wrap_err("watch task panicked").and_then(|result| result) {
                Ok(watched) => summary.push(watched),
                Err(err) => {
                    warn!(error = %err, "watch failed");
                    let _ignored = first_error.get_or_insert(err);
                }
            }
        }

        summary.sort_by_key(|watched| watched.device);
        environment.output.write(&Summary(summary));

        first_error.map_or(Ok(()), Err)
    }
}

async fn watch_device(
    exposed: ExposedDevice,
    deadline: Instant,
    poll: Duration,
) -> EyreResult<Watched> {
    let ExposedDevice { device, path } = exposed;
    let mut file = open_nonblocking(&path)?;
    let mut buf = [0_u8; 512];
    let mut received = 0;

    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while Instant::now() < deadline {
        let _instant = ticker.tick().await;

        loop {
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let data = buf.get(..n).unwrap_or_default();
                    info!(%device, bytes = n, data = %hex::encode(data), "received");
                    received += n;
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err).wrap_err_with(|| format!("failed to read {path}")),
            }
        }
    }

    Ok(Watched {
        device,
        path,
        received,
    })
}

fn open_nonblocking(path: &Utf8Path) -> EyreResult<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(path)
        .wrap_err_with(|| format!("failed to open {path}"))
}
