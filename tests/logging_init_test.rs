//! Runs in its own test binary: `init` installs a process-wide tracing
//! subscriber, which would conflict with `#[traced_test]` unit tests in the
//! library test binary.

use sensor_stream::logging::{init, TracingConfig};
use tracing::Level;

#[test]
fn init_twice_is_harmless() {
    assert!(init(TracingConfig::default()).is_ok());
    assert!(init(TracingConfig::new(Level::DEBUG)).is_ok());
}
