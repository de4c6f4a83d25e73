pub mod credentials;
pub mod platform_id;
pub mod record;
pub mod session_state;
pub mod target;

pub use credentials::Credentials;
pub use platform_id::PlatformId;
pub use record::Record;
pub use session_state::{Freshness, OriginStorage, SessionState, StorageItem, StoredCookie};
pub use target::{ExtractionTarget, Mode};
