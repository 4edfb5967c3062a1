pub mod comment;
pub mod contract;
pub mod epk;
pub mod media;
pub mod notification;
pub mod project;
pub mod prop;
pub mod signer;
pub mod user;

pub use comment::{Comment, CommentType};
pub use contract::{Contract, ContractFields, ContractForm, DocumentStatus};
pub use epk::{Epk, EpkMember, EpkTemplate};
pub use media::{ConversionStatus, Media};
pub use notification::{Notification, NotificationType};
pub use project::Project;
pub use prop::{Prop, PropMember};
pub use signer::{EmailData, Signature, Signer, SignerAction, SigningStatus};
pub use user::{Plan, PremiumUser, Role, User, UserProfile, UserSummary};
