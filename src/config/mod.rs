//! Configuration module

mod site;

pub use site::ApiConfig;
pub use site::BuildConfig;
pub use site::FallbackMode;
pub use site::LabelsConfig;
pub use site::ReadingConfig;
pub use site::SiteConfig;
