mod error;
pub use error::{ModelError, ModelResult};

mod setting;
pub use setting::{Setting, SettingName};

mod version;
pub use version::{CheckRequest, CheckResponse, TAG_LATEST, VersionDescriptor};
