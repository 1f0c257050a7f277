mod click;
mod link;
mod user;

pub use click::ClickEvent;
pub use link::{CreateLinkRequest, LinkStatus, ShortLink, MAX_ORIGINAL_URL_LEN, MAX_SHORT_CODE_LEN};
pub use user::{ApiKey, User};
