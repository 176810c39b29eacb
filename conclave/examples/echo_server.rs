//! Single-threaded echo server on the cooperative scheduler.
//!
//! Run it, then connect with `nc 127.0.0.1 7878`. Every line is echoed back
//! upper-cased; the server stops after three connections.

#[cfg(unix)]
use conclave::sched::{Context, Resume, Scheduler, Step, Suspend, Task};
#[cfg(unix)]
use std::os::fd::{AsRawFd, OwnedFd};

/// One client connection: read, upper-case, write back, until end of stream.
#[cfg(unix)]
struct Session {
    stream: OwnedFd,
}

#[cfg(unix)]
impl Task for Session {
    fn resume(&mut self, _: &mut Context, input: Resume) -> Step {
        let fd = self.stream.as_raw_fd();

        match input {
            Resume::Read(Ok(data)) if data.is_empty() => Step::Done,
            Resume::Read(Ok(data)) => Step::Suspend(Suspend::Write {
                fd,
                data: data.to_ascii_uppercase(),
            }),
            Resume::Read(Err(_)) | Resume::Written(Err(_)) => Step::Done,
            _ => Step::Suspend(Suspend::Read { fd, max: 1024 }),
        }
    }
}

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::TcpListener;

    tracing_subscriber::fmt().init();

    let listener = TcpListener::bind("127.0.0.1:7878")?;
    listener.set_nonblocking(true)?;

    let fd = listener.as_raw_fd();
    let mut remaining = 3;

    let mut scheduler = Scheduler::new();

    scheduler.spawn(move |cx: &mut Context, input: Resume| {
        if let Resume::Accepted(accepted) = input {
            match accepted {
                Ok((stream, peer)) => {
                    println!("connection from {peer}");
                    cx.spawn(Session { stream });
                    remaining -= 1;
                }
                Err(err) => eprintln!("accept failed: {err}"),
            }
        }

        if remaining == 0 {
            Step::Done
        } else {
            Step::Suspend(Suspend::Accept { fd })
        }
    });

    scheduler.run()?;
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("the cooperative scheduler requires a unix platform");
}
