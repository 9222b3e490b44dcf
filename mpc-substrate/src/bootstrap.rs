//! Bringing a party up, running a protocol on it and tearing it down again.

use crate::channel::Channel;
use crate::config::NetworkConfig;
use crate::errors::MpcError;
use crate::network::{ChannelFactory, ChannelReport, Network};
use crate::topology::Topology;

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command};

use serde::Serialize;

/// A multi-party computation run by every party against its own [`Network`].
pub trait Protocol<C: Channel> {
    /// Returns `Ok(false)` when the protocol completed but its outcome is not
    /// valid for this party.
    fn run(&mut self, network: &mut Network<C>, pid: usize) -> Result<bool, MpcError>;
}

impl<C, F> Protocol<C> for F
where
    C: Channel,
    F: FnMut(&mut Network<C>, usize) -> Result<bool, MpcError>,
{
    fn run(&mut self, network: &mut Network<C>, pid: usize) -> Result<bool, MpcError> {
        self(network, pid)
    }
}

/// What a party leaves behind after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyReport {
    pub pid: usize,
    pub channels: Vec<ChannelReport>,
}

impl PartyReport {
    pub fn bytes_sent(&self) -> u64 {
        self.channels.iter().map(|c| c.bytes_sent).sum()
    }

    pub fn bytes_received(&self) -> u64 {
        self.channels.iter().map(|c| c.bytes_received).sum()
    }
}

/// Runs party `pid` from connection setup to teardown.
///
/// After the protocol returns, the last party tells pid 0 it is done, and
/// pid 0 stays reachable until that signal arrives. Channels are always
/// closed before returning.
///
/// # Errors
///
/// Returns `MpcError::ProtocolFailure` if the protocol reports failure, and
/// any transport error raised while setting up, running or draining.
pub fn run_party<F, P>(
    pid: usize,
    topology: &Topology,
    factory: &F,
    protocol: &mut P,
) -> Result<PartyReport, MpcError>
where
    F: ChannelFactory,
    P: Protocol<F::Channel>,
{
    let mut network = Network::initialize(pid, topology, factory)?;
    log::info!("[P{}] initialized", pid);

    let outcome = protocol
        .run(&mut network, pid)
        .and_then(|success| drain(&mut network, pid).map(|_| success));

    network.clean_up();
    let report = PartyReport {
        pid,
        channels: network.channel_report(),
    };

    match outcome? {
        true => {
            log::info!("[P{}] protocol successfully completed", pid);
            Ok(report)
        }
        false => {
            log::error!("[P{}] protocol abnormally terminated", pid);
            Err(MpcError::ProtocolFailure { pid })
        }
    }
}

fn drain<C: Channel>(network: &mut Network<C>, pid: usize) -> Result<(), MpcError> {
    let Some((first, last)) = network.topology().drain_pair() else {
        return Ok(());
    };
    if pid == first {
        log::debug!("[P{}] waiting for P{} to finish", pid, last);
        network.receive_bool(last)?;
    } else if pid == last {
        network.send_bool(true, first)?;
    }
    Ok(())
}

/// Removes the endpoint of every pair left over from an earlier run.
/// Must run once, before any party binds. Returns how many were removed.
pub fn cleanup_stale_endpoints(
    config: &NetworkConfig,
    topology: &Topology,
) -> Result<usize, MpcError> {
    let mut removed = 0;
    for port in topology.ports() {
        let path = config.address(port);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("removed stale endpoint {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(MpcError::Io(e)),
        }
    }
    Ok(removed)
}

/// Spawns the child parties `0..N-1` as separate processes of one program.
/// The caller runs party `N-1` itself.
#[derive(Debug, Clone)]
pub struct PartyLauncher {
    program: PathBuf,
    parties: usize,
    config_path: Option<PathBuf>,
}

impl PartyLauncher {
    pub fn new(program: impl Into<PathBuf>, parties: usize) -> Self {
        Self {
            program: program.into(),
            parties,
            config_path: None,
        }
    }

    /// A launcher re-running the current executable.
    pub fn current_exe(parties: usize) -> Result<Self, MpcError> {
        Ok(Self::new(std::env::current_exe()?, parties))
    }

    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Pid of the party run in the launching process.
    pub fn driver_pid(&self) -> usize {
        self.parties.saturating_sub(1)
    }

    pub fn child_args(&self, pid: usize) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["party".into(), "--pid".into(), pid.to_string().into()];
        if let Some(path) = &self.config_path {
            args.push("--config".into());
            args.push(path.clone().into_os_string());
        }
        args
    }

    pub fn spawn(&self) -> Result<LaunchedParties, MpcError> {
        let mut launched = LaunchedParties {
            children: Vec::with_capacity(self.driver_pid()),
        };
        for pid in 0..self.driver_pid() {
            let child = Command::new(&self.program)
                .args(self.child_args(pid))
                .spawn()
                .map_err(|e| {
                    MpcError::Spawn(format!(
                        "could not start P{} from {}: {}",
                        pid,
                        self.program.display(),
                        e
                    ))
                })?;
            log::debug!("spawned P{} as process {}", pid, child.id());
            launched.children.push((pid, child));
        }
        Ok(launched)
    }
}

/// Child party processes. Any child not waited for is killed on drop.
#[derive(Debug)]
pub struct LaunchedParties {
    children: Vec<(usize, Child)>,
}

impl LaunchedParties {
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Settles the children once the driver party in this process is done.
    ///
    /// A failed driver means some peer may never connect, so the children
    /// are killed instead of waited for and the driver's error is returned.
    pub fn finish<T>(self, driver: Result<T, MpcError>) -> Result<T, MpcError> {
        match driver {
            Ok(value) => self.wait().map(|_| value),
            Err(e) => {
                log::error!("driver failed, stopping {} child parties", self.len());
                drop(self);
                Err(e)
            }
        }
    }

    /// Waits for every child, failing if any of them exited unsuccessfully.
    pub fn wait(mut self) -> Result<(), MpcError> {
        let mut failed = Vec::new();
        for (pid, mut child) in self.children.drain(..) {
            let status = child.wait()?;
            if !status.success() {
                log::error!("P{} exited with {}", pid, status);
                failed.push(pid);
            }
        }
        match failed.first() {
            None => Ok(()),
            Some(&pid) => Err(MpcError::Spawn(format!(
                "{} child parties failed, first was P{}",
                failed.len(),
                pid
            ))),
        }
    }
}

impl Drop for LaunchedParties {
    fn drop(&mut self) {
        for (pid, child) in self.children.iter_mut() {
            if let Err(e) = child.kill() {
                log::debug!("could not kill P{}: {}", pid, e);
            }
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelState, MemoryChannel};
    use crate::network::MemoryHub;

    use std::thread;

    fn succeed(_: &mut Network<MemoryChannel>, _: usize) -> Result<bool, MpcError> {
        Ok(true)
    }

    fn fail_on_p1(_: &mut Network<MemoryChannel>, pid: usize) -> Result<bool, MpcError> {
        Ok(pid != 1)
    }

    fn run_all<P>(topology: &Topology, protocol: P) -> Vec<Result<PartyReport, MpcError>>
    where
        P: Protocol<MemoryChannel> + Clone + Send + 'static,
    {
        let hub = MemoryHub::new(topology);
        let handles: Vec<_> = (0..topology.parties())
            .map(|pid| {
                let topology = topology.clone();
                let hub = hub.clone();
                let mut protocol = protocol.clone();
                thread::spawn(move || run_party(pid, &topology, &hub, &mut protocol))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(MpcError::InvalidState("panicked".to_string())))
            })
            .collect()
    }

    #[test]
    fn test_three_parties_close_every_channel() -> Result<(), MpcError> {
        let topology = Topology::new(3, 0)?;
        let reports = run_all(&topology, succeed);

        for (pid, report) in reports.into_iter().enumerate() {
            let report = report?;
            assert_eq!(report.pid, pid);
            assert_eq!(report.channels.len(), 2);
            assert!(report.channels.iter().all(|c| c.state == ChannelState::Closed));
        }
        Ok(())
    }

    #[test]
    fn test_drain_handshake_runs_between_first_and_last() -> Result<(), MpcError> {
        let topology = Topology::new(3, 0)?;
        let reports = run_all(&topology, succeed);
        let reports: Vec<PartyReport> = reports.into_iter().collect::<Result<_, _>>()?;

        assert_eq!(reports[0].bytes_received(), 1);
        assert_eq!(reports[2].bytes_sent(), 1);
        assert_eq!(reports[1].bytes_sent(), 0);
        Ok(())
    }

    #[test]
    fn test_false_outcome_is_a_protocol_failure() -> Result<(), MpcError> {
        let topology = Topology::new(3, 0)?;
        let reports = run_all(&topology, fail_on_p1);

        assert!(reports[0].is_ok());
        assert!(matches!(reports[1], Err(MpcError::ProtocolFailure { pid: 1 })));
        assert!(reports[2].is_ok());
        Ok(())
    }

    #[test]
    fn test_cleanup_removes_only_existing_endpoints() -> Result<(), MpcError> {
        let config = NetworkConfig {
            socket_prefix: std::env::temp_dir()
                .join(format!("mpc-cleanup-test-{}", std::process::id()))
                .to_string_lossy()
                .into_owned(),
            ..Default::default()
        };
        let topology = Topology::new(3, config.base_port)?;
        fs::write(config.address(config.base_port), b"")?;
        fs::write(config.address(config.base_port + 2), b"")?;

        assert_eq!(cleanup_stale_endpoints(&config, &topology)?, 2);
        assert_eq!(cleanup_stale_endpoints(&config, &topology)?, 0);
        Ok(())
    }

    #[test]
    fn test_child_args() {
        let launcher = PartyLauncher::new("mpc-party", 3);
        assert_eq!(launcher.driver_pid(), 2);
        assert_eq!(launcher.child_args(1), vec!["party", "--pid", "1"]);

        let launcher = launcher.with_config("/tmp/net.json");
        assert_eq!(
            launcher.child_args(0),
            vec!["party", "--pid", "0", "--config", "/tmp/net.json"]
        );
    }

    #[test]
    fn test_wait_reports_failed_children() -> Result<(), MpcError> {
        let ok = PartyLauncher::new("true", 3).spawn()?;
        assert_eq!(ok.len(), 2);
        ok.wait()?;

        let failing = PartyLauncher::new("false", 2).spawn()?;
        assert!(matches!(failing.wait(), Err(MpcError::Spawn(_))));
        Ok(())
    }

    #[test]
    fn test_failed_driver_kills_children() -> Result<(), MpcError> {
        let launched = LaunchedParties {
            children: vec![
                (0, Command::new("sleep").arg("30").spawn()?),
                (1, Command::new("sleep").arg("30").spawn()?),
            ],
        };
        let started = std::time::Instant::now();
        let result: Result<(), MpcError> =
            launched.finish(Err(MpcError::ProtocolFailure { pid: 2 }));
        assert!(matches!(result, Err(MpcError::ProtocolFailure { pid: 2 })));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn test_successful_driver_waits_for_children() -> Result<(), MpcError> {
        let launched = PartyLauncher::new("true", 3).spawn()?;
        assert_eq!(launched.finish(Ok(7))?, 7);

        let launched = PartyLauncher::new("false", 2).spawn()?;
        assert!(matches!(launched.finish(Ok(())), Err(MpcError::Spawn(_))));
        Ok(())
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let launcher = PartyLauncher::new("/nonexistent/mpc-party", 3);
        assert!(matches!(launcher.spawn(), Err(MpcError::Spawn(_))));
    }
}
