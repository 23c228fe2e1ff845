//! Identity pool module
//!
//! This module tracks the outbound proxy identities available to the
//! orchestrator.
//!
//! # Components
//!
//! - `Identity`: a proxy address and protocol with validity and last-use time
//! - `IdentityPool`: mutex-guarded registry with least-recently-used selection
//! - `LivenessProbe`: checks a candidate proxy before it is pooled

mod identity;
mod probe;
mod registry;

pub use identity::{proxy_url, validate_address, Identity, Protocol};
pub use probe::{is_live_status, HttpProbe, LivenessProbe};
pub use registry::{IdentityPool, PoolStatus};
