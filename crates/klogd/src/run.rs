use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use klogd::frame::{Facility, FrameProcessor, Priority, DEFAULT_CAPACITY};
use klogd::source::{ConsoleLevel, KernelLog, SourceConfig, SourceKind, DEFAULT_DEVICE_PATH};
use klogd::{Dispatcher, LogSink, Shutdown, StopReason, SyslogSink, WriterSink};

use crate::exit::{frame_error, source_error, CliError, CliResult, FAILURE, USAGE};
use crate::signals;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SourceArg {
    Auto,
    Klogctl,
    Device,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Auto => SourceKind::Auto,
            SourceArg::Klogctl => SourceKind::Klogctl,
            SourceArg::Device => SourceKind::Device,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SinkArg {
    Syslog,
    Stdout,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Console printk level (1-8) to apply at startup.
    #[arg(
        short = 'c',
        long,
        value_name = "LEVEL",
        env = "KLOGD_CONSOLE_LEVEL",
        value_parser = clap::value_parser!(u8).range(1..=8)
    )]
    pub console_level: Option<u8>,
    /// Kernel log source.
    #[arg(long, value_name = "SOURCE", default_value = "auto", env = "KLOGD_SOURCE")]
    pub source: SourceArg,
    /// Device path read by the device source.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DEVICE_PATH, env = "KLOGD_DEVICE")]
    pub device: PathBuf,
    /// Where decoded messages are delivered.
    #[arg(long, value_name = "SINK", default_value = "syslog", env = "KLOGD_SINK")]
    pub sink: SinkArg,
    /// Carry buffer capacity in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CAPACITY, env = "KLOGD_BUFFER_SIZE")]
    pub buffer_size: usize,
    /// Longest wait for kernel messages before checking for shutdown (e.g. 500ms, 1s).
    #[arg(long, value_name = "DURATION", default_value = "500ms", env = "KLOGD_POLL_INTERVAL")]
    pub poll_interval: String,
}

/// Everything validated from the command line before the process detaches.
#[derive(Debug)]
pub struct Startup {
    frames: FrameProcessor,
    config: SourceConfig,
    sink: SinkArg,
    console_level: Option<ConsoleLevel>,
}

/// Validate the run options. Nothing is opened yet.
pub fn prepare(args: RunArgs) -> CliResult<Startup> {
    let poll_interval = parse_duration(&args.poll_interval)?;
    let frames = FrameProcessor::with_capacity(args.buffer_size)
        .map_err(|err| frame_error("invalid buffer size", err))?;

    Ok(Startup {
        frames,
        config: SourceConfig {
            kind: args.source.into(),
            device_path: args.device,
            poll_interval,
        },
        sink: args.sink,
        console_level: args.console_level.and_then(ConsoleLevel::new),
    })
}

pub fn run(startup: Startup) -> CliResult<i32> {
    let Startup {
        frames,
        config,
        sink,
        console_level,
    } = startup;

    let shutdown = Shutdown::new();
    signals::install(shutdown.clone())?;

    let mut sink = open_sink(sink);

    let source = match KernelLog::open(&config) {
        Ok(source) => source,
        Err(err) => {
            sink.forward(
                Priority::ERR,
                Facility::Kernel,
                format!("klogd: {err}").as_bytes(),
            );
            return Err(source_error("cannot open kernel log", err));
        }
    };

    tracing::info!(
        source = ?config.kind.resolve(),
        buffer_size = frames.buffer().capacity(),
        poll_interval = ?config.poll_interval,
        "klogd starting"
    );

    let mut dispatcher = Dispatcher::new(source, sink, frames, shutdown);

    if let Some(level) = console_level {
        dispatcher.apply_console_level(level);
    }

    dispatcher.announce_start();

    match dispatcher.run() {
        StopReason::Shutdown => tracing::info!("shutdown complete"),
        StopReason::ReadFailed(err) => tracing::error!(error = %err, "stopped on read failure"),
    }

    Ok(FAILURE)
}

fn open_sink(kind: SinkArg) -> Box<dyn LogSink> {
    match kind {
        SinkArg::Syslog => Box::new(SyslogSink::open()),
        SinkArg::Stdout => Box::new(WriterSink::stdout()),
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::DATA_INVALID;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("").is_err());
        assert_eq!(parse_duration("soon").unwrap_err().code, USAGE);
    }

    fn args(buffer_size: usize, poll_interval: &str) -> RunArgs {
        RunArgs {
            console_level: Some(4),
            source: SourceArg::Device,
            device: PathBuf::from("/nonexistent/kmsg"),
            sink: SinkArg::Stdout,
            buffer_size,
            poll_interval: poll_interval.to_string(),
        }
    }

    #[test]
    fn prepare_validates_without_opening_the_source() {
        let startup = prepare(args(64, "20ms")).unwrap();
        assert_eq!(startup.frames.buffer().capacity(), 64);
        assert_eq!(startup.config.poll_interval, Duration::from_millis(20));
        assert_eq!(startup.config.kind, SourceKind::Device);
        assert_eq!(startup.console_level.map(ConsoleLevel::get), Some(4));
    }

    #[test]
    fn prepare_rejects_bad_buffer_and_interval() {
        assert_eq!(prepare(args(1, "20ms")).unwrap_err().code, DATA_INVALID);
        assert_eq!(prepare(args(64, "soon")).unwrap_err().code, USAGE);
    }

    #[test]
    fn source_arg_maps_to_kind() {
        assert_eq!(SourceKind::from(SourceArg::Device), SourceKind::Device);
        assert_eq!(SourceKind::from(SourceArg::Auto), SourceKind::Auto);
    }
}
