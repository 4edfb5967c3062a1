// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (session token required)
//
// Handlers extract and shape request input, call one service, and wrap the
// result in the success envelope. Business rules live in `crate::services`.
pub mod public;    // Tier 1: signup/login, signer verification, webhooks, health
pub mod protected; // Tier 2: everything behind `require_auth`
pub mod upload;    // Multipart reading shared by the upload endpoints

// Directory structure:
// src/
// ├── handlers/
// │   ├── mod.rs              ← This file
// │   ├── upload.rs           ← multipart/form-data → UploadForm
// │   ├── public/
// │   │   ├── mod.rs          ← GET /, GET /health
// │   │   ├── files.rs        ← GET /files/{key}
// │   │   ├── users.rs        ← POST /users/signup, /users/login, /users/signin
// │   │   ├── signers.rs      ← POST /signs/verify
// │   │   └── webhooks.rs     ← POST /contract/conversion-status, /contract/file-status
// │   └── protected/
// │       ├── mod.rs
// │       ├── users.rs        ← /users/profile, /users/extend-session, /users/add-premium-user
// │       ├── projects.rs     ← /users/projects[/:id]
// │       ├── contracts.rs    ← /contract/*
// │       ├── contract_files.rs
// │       ├── signers.rs      ← /signs/*
// │       ├── epk.rs          ← /epk/*
// │       ├── epk_templates.rs
// │       ├── media.rs        ← /media/*
// │       ├── props.rs        ← /props/*
// │       ├── comments.rs     ← /comment/create, /comments/:screenId
// │       └── notifications.rs
// │
// └── routes.rs               ← Router assembly
