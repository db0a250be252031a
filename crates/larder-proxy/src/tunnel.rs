use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::AsRawFd;
use std::time::Duration;

use larder_core::ProxyRequest;
use larder_observe::Level;

use crate::{resolve_ipv4, signals, WorkerContext, IO_CHUNK_SIZE};

const DEFAULT_TLS_PORT: u16 = 443;
const TUNNEL_WAIT: Duration = Duration::from_secs(60);

const ESTABLISHED_RESPONSE: &[u8] = b"HTTP/1.1 200 Connection established\r\n\r\n";

/// Opens the origin connection and splices bytes both ways until either
/// side closes, an I/O error occurs, or shutdown is requested.
pub(crate) fn run(mut client: TcpStream, request: &ProxyRequest, context: &WorkerContext) {
    let sink = &context.sink;
    let port = request.port.unwrap_or(DEFAULT_TLS_PORT);
    sink.log(
        Level::Info,
        &format!("CONNECT request for {}:{port}", request.host),
    );

    let addr = match resolve_ipv4(&request.host, port) {
        Ok(addr) => addr,
        Err(error) => {
            sink.log(
                Level::Error,
                &format!("cannot resolve host {}: {error}", request.host),
            );
            return;
        }
    };
    let mut origin = match TcpStream::connect(addr) {
        Ok(origin) => origin,
        Err(error) => {
            sink.log(
                Level::Error,
                &format!("failed to connect to origin {}: {error}", request.host),
            );
            return;
        }
    };

    if let Err(error) = client.write_all(ESTABLISHED_RESPONSE) {
        sink.log(
            Level::Error,
            &format!("failed to confirm tunnel to client: {error}"),
        );
        return;
    }
    sink.log(
        Level::Info,
        &format!("tunnel established for {}:{port}", request.host),
    );

    let mut buffer = [0_u8; IO_CHUNK_SIZE];
    while !signals::shutdown_requested() {
        let (client_ready, origin_ready) = match wait_readable(&client, &origin, TUNNEL_WAIT) {
            Ok(ready) => ready,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                sink.log(Level::Error, &format!("tunnel wait failed: {error}"));
                break;
            }
        };
        // A 60s timeout only re-enters the wait; idle tunnels stay up.
        if client_ready && !splice(&mut client, &mut origin, &mut buffer) {
            break;
        }
        if origin_ready && !splice(&mut origin, &mut client, &mut buffer) {
            break;
        }
    }

    sink.log(
        Level::Info,
        &format!("tunnel closed for {}:{port}", request.host),
    );
}

/// Moves one buffer from `from` to `to`; `false` ends the tunnel.
fn splice(from: &mut TcpStream, to: &mut TcpStream, buffer: &mut [u8]) -> bool {
    match from.read(buffer) {
        Ok(0) => false,
        Ok(read) => to.write_all(&buffer[..read]).is_ok(),
        Err(error) => error.kind() == io::ErrorKind::Interrupted,
    }
}

/// Waits for readability on either socket. Both flags false means the
/// timeout elapsed. Hangups and errors report as readable so the next
/// read observes them.
fn wait_readable(
    client: &TcpStream,
    origin: &TcpStream,
    timeout: Duration,
) -> io::Result<(bool, bool)> {
    let mut fds = [
        libc::pollfd {
            fd: client.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: origin.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    let ready = unsafe {
        libc::poll(
            fds.as_mut_ptr(),
            fds.len() as libc::nfds_t,
            timeout.as_millis() as libc::c_int,
        )
    };
    if ready < 0 {
        return Err(io::Error::last_os_error());
    }
    let readable = |revents: libc::c_short| {
        revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0
    };
    Ok((readable(fds[0].revents), readable(fds[1].revents)))
}
