//! Readiness polling with `poll(2)`.

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, nfds_t, poll, pollfd};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// The directions a file descriptor is waited on.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

/// A file descriptor reported ready by [`wait`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Readiness {
    pub(crate) fd: RawFd,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}

/// Blocks until one of `interests` is ready or `timeout` elapses.
///
/// `None` waits indefinitely. An interrupted wait returns no readiness.
/// Hang-ups and errors are reported as readiness in every requested
/// direction, so that the pending operation observes them.
pub(crate) fn wait(
    interests: &[(RawFd, Interest)],
    timeout: Option<Duration>,
) -> io::Result<Vec<Readiness>> {
    let mut fds: Vec<pollfd> = interests
        .iter()
        .map(|&(fd, interest)| {
            let mut events = 0;

            if interest.read {
                events |= POLLIN;
            }

            if interest.write {
                events |= POLLOUT;
            }

            pollfd {
                fd,
                events,
                revents: 0,
            }
        })
        .collect();

    let rc = unsafe { poll(fds.as_mut_ptr(), fds.len() as nfds_t, timeout_ms(timeout)) };

    if rc < 0 {
        let err = io::Error::last_os_error();

        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Vec::new());
        }

        return Err(err);
    }

    Ok(fds
        .iter()
        .filter(|pfd| pfd.revents != 0)
        .map(|pfd| {
            let failed = pfd.revents & (POLLERR | POLLHUP | POLLNVAL) != 0;

            Readiness {
                fd: pfd.fd,
                readable: pfd.revents & POLLIN != 0 || (failed && pfd.events & POLLIN != 0),
                writable: pfd.revents & POLLOUT != 0 || (failed && pfd.events & POLLOUT != 0),
            }
        })
        .collect())
}

/// Converts a timeout to milliseconds, rounding up so that a wait never
/// returns before the deadline.
fn timeout_ms(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(d) => {
            let ms = d.as_nanos().div_ceil(1_000_000);
            ms.min(i32::MAX as u128) as i32
        }
    }
}
