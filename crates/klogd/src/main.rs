mod daemon;
mod exit;
mod logging;
mod run;
mod signals;

use clap::Parser;

use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::run::RunArgs;

#[derive(Parser, Debug)]
#[command(name = "klogd", version, about = "Kernel log daemon")]
struct Cli {
    /// Run in the foreground instead of daemonizing.
    #[arg(short = 'n', long)]
    foreground: bool,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    #[command(flatten)]
    run: RunArgs,
}

fn main() {
    let cli = Cli::parse();

    // Bad options must fail in the foreground, while stderr is still ours.
    let startup = match run::prepare(cli.run) {
        Ok(startup) => startup,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    };

    if !cli.foreground {
        if let Err(err) = daemon::daemonize() {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }

    init_logging(cli.log_format, cli.log_level);

    match run::run(startup) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(code = err.code, "{err}");
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_busybox_style_flags() {
        let cli = Cli::try_parse_from(["klogd", "-n", "-c", "4"]).expect("flags should parse");
        assert!(cli.foreground);
        assert_eq!(cli.run.console_level, Some(4));
        assert_eq!(cli.run.buffer_size, klogd::frame::DEFAULT_CAPACITY);
    }

    #[test]
    fn rejects_console_level_out_of_range() {
        for level in ["0", "9"] {
            let err = Cli::try_parse_from(["klogd", "-c", level])
                .expect_err("level outside 1-8 should fail");
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn parses_source_and_sink_selection() {
        let cli = Cli::try_parse_from([
            "klogd",
            "--source",
            "device",
            "--device",
            "/tmp/kmsg",
            "--sink",
            "stdout",
            "--poll-interval",
            "50ms",
        ])
        .expect("source args should parse");

        assert!(matches!(cli.run.source, run::SourceArg::Device));
        assert!(matches!(cli.run.sink, run::SinkArg::Stdout));
        assert_eq!(cli.run.device, std::path::PathBuf::from("/tmp/kmsg"));
        assert_eq!(cli.run.poll_interval, "50ms");
    }

    #[test]
    fn rejects_unknown_source() {
        let err = Cli::try_parse_from(["klogd", "--source", "serial"])
            .expect_err("unknown source should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
