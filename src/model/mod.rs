mod owner;
mod result;
mod settings;

pub use owner::{Owner, OwnerMapping, UNASSIGNED_OWNER};
pub use result::Result;
pub use settings::Settings;
