use crate::error::Result;
use crate::traits::{ConsoleLevel, LogSource, SourceConfig, SourceKind};

#[cfg(unix)]
use crate::device::DeviceSource;
#[cfg(target_os = "linux")]
use crate::klogctl::KlogctlSource;

/// The kernel log source chosen at startup.
///
/// Callers hold one of these and never need to know which backend is active.
pub struct KernelLog {
    inner: KernelLogInner,
}

enum KernelLogInner {
    #[cfg(target_os = "linux")]
    Klogctl(KlogctlSource),
    #[cfg(unix)]
    Device(DeviceSource),
}

impl KernelLog {
    /// Open the source selected by `config.kind`.
    pub fn open(config: &SourceConfig) -> Result<Self> {
        let inner = match config.kind.resolve() {
            #[cfg(target_os = "linux")]
            SourceKind::Klogctl => {
                KernelLogInner::Klogctl(KlogctlSource::open(config.poll_interval)?)
            }
            #[cfg(not(target_os = "linux"))]
            SourceKind::Klogctl => {
                return Err(crate::error::SourceError::Unsupported("the klogctl source"))
            }
            SourceKind::Device | SourceKind::Auto => KernelLogInner::Device(DeviceSource::open(
                &config.device_path,
                config.poll_interval,
            )?),
        };
        Ok(Self { inner })
    }
}

impl LogSource for KernelLog {
    fn name(&self) -> &'static str {
        match &self.inner {
            #[cfg(target_os = "linux")]
            KernelLogInner::Klogctl(source) => source.name(),
            #[cfg(unix)]
            KernelLogInner::Device(source) => source.name(),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.inner {
            #[cfg(target_os = "linux")]
            KernelLogInner::Klogctl(source) => source.read(buf),
            #[cfg(unix)]
            KernelLogInner::Device(source) => source.read(buf),
        }
    }

    fn close(&mut self) {
        match &mut self.inner {
            #[cfg(target_os = "linux")]
            KernelLogInner::Klogctl(source) => source.close(),
            #[cfg(unix)]
            KernelLogInner::Device(source) => source.close(),
        }
    }

    fn set_console_level(&mut self, level: ConsoleLevel) -> Result<()> {
        match &mut self.inner {
            #[cfg(target_os = "linux")]
            KernelLogInner::Klogctl(source) => source.set_console_level(level),
            #[cfg(unix)]
            KernelLogInner::Device(source) => source.set_console_level(level),
        }
    }
}

impl std::fmt::Debug for KernelLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelLog")
            .field("type", &self.name())
            .finish()
    }
}
