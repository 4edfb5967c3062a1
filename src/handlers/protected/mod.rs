// handlers/protected/mod.rs - Authenticated handlers
//
// Security Level: Session token required
// Middleware: require_auth (user or signer session)
//
// Most endpoints take the `UserPrincipal` extractor and so reject signer
// sessions with 403. The contract view and the signing actions take
// `CurrentUser` because an emailed signer acts through a signer session.

pub mod comments;
pub mod contract_files;
pub mod contracts;
pub mod epk;
pub mod epk_templates;
pub mod media;
pub mod notifications;
pub mod projects;
pub mod props;
pub mod signers;
pub mod users;

/*
Caller kinds:
- user session      → issued by /users/signup, /users/login, /users/extend-session
- signer session    → issued by /signs/verify, scoped to one contract
- invite token      → only valid as input to /signs/verify, never as a session

Ownership is checked inside the services; handlers only extract input.
*/
