pub mod alert;
pub mod crop_profile;
pub mod insights;
pub mod recommendation;
pub mod report;
pub mod telemetry;
pub mod weather;

pub use alert::*;
pub use crop_profile::*;
pub use insights::*;
pub use recommendation::*;
pub use report::*;
pub use telemetry::*;
pub use weather::*;
