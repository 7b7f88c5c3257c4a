//! Telnyx alerting adapter core.
//!
//! Value types shared by the ingress and egress services, the delivery-status
//! mapper, callback-context encoding, SMS reply keywords, TeXML call menus,
//! the outbound dispatcher and the traits through which the host alerting
//! system is reached.
pub mod config;
pub mod context;
pub mod egress;
pub mod error;
pub mod interfaces;
pub mod keywords;
pub mod platforms;
pub mod status;
pub mod subjects;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod texml;
pub mod types;

pub use config::*;
pub use context::*;
pub use egress::*;
pub use error::*;
pub use interfaces::*;
pub use keywords::*;
pub use status::*;
pub use subjects::*;
pub use texml::*;
pub use types::*;
