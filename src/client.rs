//! Client runtime: the explicitly constructed context every connector shares.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod context;
pub(crate) mod dispatch;
pub mod signals;

pub use context::{ClientContext, ClientContextBuilder, DEFAULT_MAX_REST_CONNECTIONS, DEFAULT_TIMEOUT};
pub use signals::InflightSnapshot;
