//! Domain services: request validation beyond shape, lookups and joins over
//! the document store, and the side effects (mail, notifications, stored
//! objects) of each operation. Handlers stay thin wrappers around these.

pub mod comments;
pub mod contracts;
pub mod epk;
pub mod epk_templates;
pub mod media;
pub mod notifications;
pub mod projects;
pub mod props;
pub mod signers;
pub mod users;

pub use comments::CommentService;
pub use contracts::ContractService;
pub use epk::EpkService;
pub use epk_templates::EpkTemplateService;
pub use media::MediaService;
pub use notifications::NotificationService;
pub use projects::ProjectService;
pub use props::PropService;
pub use signers::SignerService;
pub use users::UserService;
