//! Data models for Gatepass

pub mod employee;
pub mod invite;
pub mod qr_code;
pub mod report;
pub mod status;
pub mod timeline;
pub mod user;
pub mod visitor;

// Re-export commonly used types
pub use employee::Employee;
pub use invite::Invite;
pub use qr_code::QrCode;
pub use report::{Report, ReportDetails, ReportOwner};
pub use status::{InviteStatus, LifecycleStatus, VisitorStatus};
pub use timeline::{TimelineEntry, TimelineOwner};
pub use user::{Role, UserClaims};
pub use visitor::Visitor;
