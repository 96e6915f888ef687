//! Keep AV receivers powered in step with a primary receiver.
//!
//! avsync listens to one receiver's ISCP control channel and mirrors its power
//! messages to any number of other receivers, reached over eISCP, delimited
//! TCP or RS-232.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte links (TCP, serial)
//! - [`frame`]: eISCP codec and message assembly
//! - [`link`]: endpoints, self-healing connections and the relay

/// Re-export transport types.
pub mod transport {
    pub use avsync_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use avsync_frame::*;
}

/// Re-export connection and relay types.
pub mod link {
    pub use avsync_link::*;
}
