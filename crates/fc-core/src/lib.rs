//! fc-core: shared foundation for the fan control workspace.
//!
//! Contains:
//! - clock (epoch-second time source, real and manual)
//! - error (shared error types)
//! - numeric (range checks, NaN-safe clamp)
//! - shutdown (cooperative stop signal for worker threads)
//! - timing (tick duration measurement)
//! - write_mode (hardware write mode with scoped override)

pub mod clock;
pub mod error;
pub mod numeric;
pub mod shutdown;
pub mod timing;
pub mod write_mode;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FcError, FcResult};
pub use numeric::*;
pub use shutdown::StopSignal;
pub use write_mode::{WriteMode, WriteModeCell, WriteModeGuard};
