pub mod album;
pub mod asset;
pub mod format;
pub mod sanitize;
pub mod summary;

pub use album::*;
pub use asset::*;
pub use format::*;
pub use sanitize::sanitize_name;
pub use summary::*;
