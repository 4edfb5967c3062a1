use serde_json::json;

use crate::cli::utils::print_done;
use crate::cli::{admin_state, OutputFormat};
use crate::services::users::normalize_email;
use crate::services::UserService;
use crate::types::ACTIVE;

/// Prints a user session token, e.g. for calling the API with curl
pub async fn handle(email: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = admin_state().await?;
    let users = UserService::new(&state);

    let email = normalize_email(email);
    let user = match users.find_one_by_email(&email).await? {
        Some(user) if user.status == ACTIVE => user,
        _ => anyhow::bail!("No active user with email {}", email),
    };
    let token = users.issue_token(&user)?;

    match output_format {
        OutputFormat::Json => print_done(
            &output_format,
            &format!("Token issued for {}", user.email),
            Some(json!({ "token": token, "userId": user.id })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
