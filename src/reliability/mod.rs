pub mod bootstrap;
pub mod throttle;

pub use bootstrap::{BootstrapError, MAX_BOOTSTRAP_ATTEMPTS, ResourceBootstrapper, ResourceStatus};
pub use throttle::{Clock, RPS_LIMIT, SystemClock, ThrottleGate};
