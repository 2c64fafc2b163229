use std::fs::OpenOptions;
use std::os::fd::AsRawFd;

use crate::exit::{io_error, CliResult, SUCCESS};

/// Detach from the controlling terminal and continue in the background.
///
/// The parent exits immediately; the child becomes a session leader with
/// `/` as working directory and `/dev/null` on its standard streams.
///
/// Must be called before any thread is spawned.
pub fn daemonize() -> CliResult<()> {
    // SAFETY: the process is still single-threaded here.
    match unsafe { libc::fork() } {
        -1 => return Err(io_error("fork failed", std::io::Error::last_os_error())),
        0 => {}
        _ => std::process::exit(SUCCESS),
    }

    // SAFETY: setsid(2) has no memory-safety preconditions.
    if unsafe { libc::setsid() } == -1 {
        return Err(io_error("setsid failed", std::io::Error::last_os_error()));
    }

    std::env::set_current_dir("/").map_err(|err| io_error("chdir / failed", err))?;

    let null = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|err| io_error("open /dev/null failed", err))?;

    for fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        // SAFETY: both descriptors are open; dup2 atomically replaces `fd`.
        if unsafe { libc::dup2(null.as_raw_fd(), fd) } == -1 {
            return Err(io_error(
                "redirecting standard streams failed",
                std::io::Error::last_os_error(),
            ));
        }
    }

    Ok(())
}
