pub mod sessions;

pub use self::sessions::model::{ExecAccount, ExecDirectory};
pub use self::sessions::service::SessionService;
