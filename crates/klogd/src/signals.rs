use klogd::Shutdown;
use libc::{SIGABRT, SIGALRM, SIGPIPE, SIGQUIT, SIGUSR1, SIGUSR2, SIGVTALRM, SIGXCPU, SIGXFSZ};

use crate::exit::{CliError, CliResult, INTERNAL};

/// Fatal signals beyond the ones `ctrlc` claims (SIGINT, SIGTERM, SIGHUP).
/// Each one ends the run through the normal drain path.
const FATAL_SIGNALS: &[libc::c_int] = &[
    SIGQUIT, SIGABRT, SIGPIPE, SIGALRM, SIGVTALRM, SIGXCPU, SIGXFSZ, SIGUSR1, SIGUSR2,
];

/// Route SIGINT, SIGTERM and the other fatal signals to `shutdown`, and
/// ignore SIGHUP.
pub fn install(shutdown: Shutdown) -> CliResult<()> {
    for &signal in FATAL_SIGNALS {
        signal_hook::flag::register(signal, shutdown.flag()).map_err(|err| {
            CliError::new(
                INTERNAL,
                format!("signal handler setup failed for signal {signal}: {err}"),
            )
        })?;
    }

    ctrlc::set_handler(move || shutdown.request()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })?;

    // ctrlc's termination feature also claims SIGHUP; klogd has nothing to
    // reload, so hang-ups are ignored.
    // SAFETY: SIG_IGN is a valid disposition for SIGHUP.
    if unsafe { libc::signal(libc::SIGHUP, libc::SIG_IGN) } == libc::SIG_ERR {
        return Err(CliError::new(
            INTERNAL,
            format!(
                "ignoring SIGHUP failed: {}",
                std::io::Error::last_os_error()
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_set_is_registrable_and_leaves_ctrlc_signals_alone() {
        // signal-hook refuses handlers for these.
        let forbidden = [
            libc::SIGKILL,
            libc::SIGSTOP,
            libc::SIGILL,
            libc::SIGFPE,
            libc::SIGSEGV,
        ];
        for &signal in FATAL_SIGNALS {
            assert!(!forbidden.contains(&signal), "{signal}");
            assert!(![libc::SIGINT, libc::SIGTERM, libc::SIGHUP].contains(&signal));
        }
    }
}
