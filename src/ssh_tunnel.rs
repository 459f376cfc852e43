//! Local SSH port forwarding for networked database sessions.
//!
//! A tunnel is a scoped guard: opening one binds a local listener and
//! forwards accepted connections through an SSH `direct-tcpip` channel to
//! the database host; dropping the guard stops the worker and joins it.
//! Each accepted client gets its own SSH session on its own thread.

use crate::config::TunnelSettings;
use crate::error::{Result, TransferError};
use ssh2::Session;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const SSH_PORT: u16 = 22;
const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;
const TUNNEL_IDLE_SLEEP_MS: u64 = 5;
const ACCEPT_RETRY_SLEEP_MS: u64 = 40;

/// A running tunnel. The database connects to `127.0.0.1:{local_port}`;
/// teardown happens on drop.
pub struct SshTunnel {
    local_port: u16,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SshTunnel {
    /// Opens a tunnel bound to the settings' local port, forwarding to
    /// `remote_host:remote_port` on the far side of the SSH hop.
    pub fn open(settings: &TunnelSettings, remote_host: &str, remote_port: u16) -> Result<SshTunnel> {
        if settings.host.trim().is_empty() {
            return Err(TransferError::Tunnel("SSH host is required".to_string()));
        }
        if settings.user.trim().is_empty() {
            return Err(TransferError::Tunnel("SSH user is required".to_string()));
        }

        let listener = TcpListener::bind(("127.0.0.1", settings.bind_port))
            .map_err(|e| TransferError::Tunnel(format!("bind 127.0.0.1:{}: {e}", settings.bind_port)))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| TransferError::Tunnel(format!("listener non-blocking: {e}")))?;
        let local_port = listener
            .local_addr()
            .map_err(|e| TransferError::Tunnel(format!("listener address: {e}")))?
            .port();

        log::info!(
            "ssh tunnel up: 127.0.0.1:{local_port} -> {}@{} -> {remote_host}:{remote_port}",
            settings.user,
            settings.host
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_signal = Arc::clone(&shutdown);
        let settings = settings.clone();
        let remote_host = remote_host.to_string();

        let worker = thread::Builder::new()
            .name(format!("tabferry-ssh-tunnel-{local_port}"))
            .spawn(move || {
                while !shutdown_signal.load(Ordering::SeqCst) {
                    match listener.accept() {
                        Ok((stream, _addr)) => {
                            let settings = settings.clone();
                            let target_host = remote_host.clone();
                            thread::spawn(move || {
                                if let Err(err) =
                                    forward_client(stream, &settings, &target_host, remote_port)
                                {
                                    log::warn!("ssh tunnel client error: {err}");
                                }
                            });
                        }
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                            thread::sleep(Duration::from_millis(ACCEPT_RETRY_SLEEP_MS));
                        }
                        Err(err) => {
                            log::error!("ssh tunnel listener error: {err}");
                            break;
                        }
                    }
                }
            })
            .map_err(|e| TransferError::Tunnel(format!("spawn tunnel worker: {e}")))?;

        Ok(SshTunnel {
            local_port,
            shutdown,
            worker: Some(worker),
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake the accept loop so the worker observes the flag.
        let _ = TcpStream::connect(("127.0.0.1", self.local_port));
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        log::debug!("ssh tunnel on port {} closed", self.local_port);
    }
}

/// Connects and authenticates without opening a forward, for probing the
/// hop before a session starts.
pub fn test_connection(settings: &TunnelSettings) -> Result<()> {
    let _session = establish_session(settings)?;
    Ok(())
}

fn parse_socket_addr(host: &str, port: u16) -> Result<std::net::SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| TransferError::Tunnel(format!("resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| TransferError::Tunnel(format!("no address for {host}:{port}")))
}

fn expand_path(input: &str) -> PathBuf {
    if let Some(stripped) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    if input == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(input)
}

fn authenticate_session(session: &mut Session, settings: &TunnelSettings) -> Result<()> {
    let username = settings.user.trim();
    let mut auth_errors = Vec::new();
    let password_opt = settings
        .password
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(key_path_raw) = settings
        .key_path
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        let key_path = expand_path(key_path_raw);
        if !Path::new(&key_path).exists() {
            auth_errors.push(format!("key file not found: {}", key_path.display()));
        } else {
            match session.userauth_pubkey_file(username, None, &key_path, password_opt) {
                Ok(_) if session.authenticated() => return Ok(()),
                Ok(_) => auth_errors.push(format!(
                    "key authentication failed for {}",
                    key_path.display()
                )),
                Err(e) => auth_errors.push(format!(
                    "key authentication error for {}: {e}",
                    key_path.display()
                )),
            }
        }
    }

    if let Some(password) = password_opt {
        match session.userauth_password(username, password) {
            Ok(_) if session.authenticated() => return Ok(()),
            Ok(_) => auth_errors.push("password authentication failed".to_string()),
            Err(e) => auth_errors.push(format!("password authentication error: {e}")),
        }
    }

    match session.userauth_agent(username) {
        Ok(_) if session.authenticated() => Ok(()),
        Ok(_) => {
            auth_errors.push("agent authentication failed".to_string());
            Err(TransferError::Tunnel(format!(
                "SSH authentication failed. Attempts: {}",
                auth_errors.join(" | ")
            )))
        }
        Err(e) => {
            auth_errors.push(format!("agent authentication error: {e}"));
            Err(TransferError::Tunnel(format!(
                "SSH authentication failed. Attempts: {}",
                auth_errors.join(" | ")
            )))
        }
    }
}

fn establish_session(settings: &TunnelSettings) -> Result<Session> {
    let address = parse_socket_addr(&settings.host, SSH_PORT)?;
    let tcp_stream =
        TcpStream::connect_timeout(&address, Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS))
            .map_err(|e| TransferError::Tunnel(format!("SSH TCP connect failed: {e}")))?;
    let _ = tcp_stream.set_nodelay(true);

    let mut session =
        Session::new().map_err(|e| TransferError::Tunnel(format!("SSH session init failed: {e}")))?;
    session.set_tcp_stream(tcp_stream);
    session
        .handshake()
        .map_err(|e| TransferError::Tunnel(format!("SSH handshake failed: {e}")))?;

    authenticate_session(&mut session, settings)?;

    if !session.authenticated() {
        return Err(TransferError::Tunnel("SSH authentication failed".to_string()));
    }

    Ok(session)
}

fn write_nonblocking_channel(channel: &mut ssh2::Channel, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        match channel.write(data) {
            Ok(0) => {
                return Err(TransferError::Tunnel(
                    "SSH channel closed while writing".to_string(),
                ))
            }
            Ok(written) => data = &data[written..],
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(1));
            }
            Err(err) => return Err(TransferError::Tunnel(format!("SSH channel write error: {err}"))),
        }
    }
    Ok(())
}

fn write_nonblocking_stream(stream: &mut TcpStream, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        match stream.write(data) {
            Ok(0) => {
                return Err(TransferError::Tunnel(
                    "local stream closed while writing".to_string(),
                ))
            }
            Ok(written) => data = &data[written..],
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(1));
            }
            Err(err) => return Err(TransferError::Tunnel(format!("local stream write error: {err}"))),
        }
    }
    Ok(())
}

fn forward_client(
    mut local_stream: TcpStream,
    settings: &TunnelSettings,
    remote_host: &str,
    remote_port: u16,
) -> Result<()> {
    let session = establish_session(settings)?;
    session.set_blocking(false);
    let mut channel = session
        .channel_direct_tcpip(remote_host, remote_port, None)
        .map_err(|e| {
            TransferError::Tunnel(format!(
                "SSH direct-tcpip failed ({remote_host}:{remote_port}): {e}"
            ))
        })?;

    let _ = local_stream.set_nonblocking(true);
    let _ = local_stream.set_nodelay(true);

    let mut local_buf = [0u8; 16 * 1024];
    let mut remote_buf = [0u8; 16 * 1024];
    let mut local_eof = false;
    let mut remote_eof = false;
    let mut sent_eof = false;

    while !(local_eof && remote_eof) {
        let mut progressed = false;

        if !local_eof {
            match local_stream.read(&mut local_buf) {
                Ok(0) => local_eof = true,
                Ok(read_len) => {
                    write_nonblocking_channel(&mut channel, &local_buf[..read_len])?;
                    progressed = true;
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    return Err(TransferError::Tunnel(format!("local stream read error: {err}")))
                }
            }
        }

        if local_eof && !sent_eof {
            let _ = channel.send_eof();
            sent_eof = true;
        }

        if !remote_eof {
            match channel.read(&mut remote_buf) {
                Ok(0) => remote_eof = true,
                Ok(read_len) => {
                    write_nonblocking_stream(&mut local_stream, &remote_buf[..read_len])?;
                    progressed = true;
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => {
                    return Err(TransferError::Tunnel(format!("SSH channel read error: {err}")))
                }
            }
        }

        if !progressed {
            thread::sleep(Duration::from_millis(TUNNEL_IDLE_SLEEP_MS));
        }
    }

    let _ = channel.close();
    let _ = channel.wait_close();
    let _ = local_stream.shutdown(Shutdown::Both);
    Ok(())
}
