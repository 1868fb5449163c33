//! Ctrl+C is recorded, not acted on. Blocking reads and child waits check it
//! and end the run as `Aborted`, after the child has stopped.

use std::io::{self, BufReader, Read, Stdin};
use std::sync::atomic::{AtomicBool, Ordering};

/// Printed when the user stops the run
pub const ABORTED: &str = "\nAborted\n";

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn on_interrupt(_: std::ffi::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Record SIGINT instead of dying on it
///
/// No `SA_RESTART`, so a blocked `read(2)` on stdin returns `EINTR`.
#[cfg(unix)]
pub fn install_handler() -> anyhow::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let action = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only stores to an atomic
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}

#[cfg(not(unix))]
pub fn install_handler() -> anyhow::Result<()> {
    Ok(())
}

/// Whether a child that ended on `signal` was stopped by Ctrl+C
pub fn is_interrupt_signal(signal: Option<i32>) -> bool {
    #[cfg(unix)]
    {
        signal == Some(nix::sys::signal::Signal::SIGINT as i32)
    }
    #[cfg(not(unix))]
    {
        let _ = signal;
        false
    }
}

/// Stdin that stops retrying reads once Ctrl+C was pressed
///
/// `BufRead::read_line` retries on `ErrorKind::Interrupted`, so an interrupted
/// read is reported with a different kind once the flag is set.
pub struct InterruptibleStdin {
    inner: Stdin,
}

impl InterruptibleStdin {
    pub fn buffered() -> BufReader<Self> {
        BufReader::new(Self { inner: io::stdin() })
    }
}

impl Read for InterruptibleStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted && interrupted() => {
                Err(io::Error::other("interrupted by user"))
            }
            result => result,
        }
    }
}
