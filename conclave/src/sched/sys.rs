//! Thin `libc` wrappers for the I/O performed on behalf of tasks.

use libc::{
    AF_INET, AF_INET6, F_GETFL, F_SETFL, O_NONBLOCK, accept, c_int, close, fcntl, read, sockaddr,
    sockaddr_in, sockaddr_in6, sockaddr_storage, socklen_t, write,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::{io, mem};

/// Reads at most `max` bytes from `fd`.
pub(crate) fn sys_read(fd: RawFd, max: usize) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; max];

    let n = unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    buffer.truncate(n as usize);
    Ok(buffer)
}

/// Writes as much of `data` as `fd` accepts.
pub(crate) fn sys_write(fd: RawFd, data: &[u8]) -> io::Result<usize> {
    let n = unsafe { write(fd, data.as_ptr() as *const _, data.len()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(n as usize)
}

/// Sets a file descriptor to non-blocking mode.
fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Accepts a pending connection on the listening socket `fd`.
///
/// The returned socket is non-blocking.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(OwnedFd, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client_fd = unsafe { accept(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) };
    if client_fd < 0 {
        return Err(io::Error::last_os_error());
    }

    if let Err(e) = sys_set_nonblocking(client_fd) {
        unsafe { close(client_fd) };
        return Err(e);
    }

    // Owned from here on: closed on every error path below.
    let client = unsafe { OwnedFd::from_raw_fd(client_fd) };
    let addr = sockaddr_storage_to_socketaddr(&storage)?;

    Ok((client, addr))
}

/// Converts a `sockaddr_storage` to a Rust `SocketAddr`.
fn sockaddr_storage_to_socketaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            let port = u16::from_be(addr.sin_port);

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }

        AF_INET6 => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}
