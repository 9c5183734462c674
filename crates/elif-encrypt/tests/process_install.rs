//! Process-wide installation. Kept in its own test binary: the global
//! context can only be installed once per process.

use elif_encrypt::context;
use elif_encrypt::{install, BootstrapError, ConfigError, RawConfig, VersionSignal, WiringHost};
use elif_encrypt::host::{Activation, HostError};

#[derive(Default)]
struct CountingHost {
    attachments: usize,
}

impl WiringHost for CountingHost {
    fn attach(&mut self, _activation: &Activation) -> Result<(), HostError> {
        self.attachments += 1;
        Ok(())
    }
}

#[test]
fn install_succeeds_once_per_process() {
    assert!(context::global().is_none());

    let raw = RawConfig::new()
        .with_secret_directory_path("/var/secrets")
        .with_wrap_exceptions(true);
    let versions = VersionSignal::parse("7.0", "8.3", "3.1").unwrap();
    let mut host = CountingHost::default();

    let installed = install(raw.clone(), &versions, &mut host).unwrap();
    let global = context::global().unwrap();
    assert_eq!(global.bundle(), installed.bundle());
    assert!(global.wrap_exceptions());

    let err = install(raw, &versions, &mut host).unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::InvalidConfiguration(ConfigError::AlreadyLoaded { .. })
    ));
    assert_eq!(host.attachments, 1);

    let reader = std::thread::spawn(|| context::global().map(|ctx| ctx.bundle()));
    assert_eq!(reader.join().unwrap(), Some(installed.bundle()));
}
