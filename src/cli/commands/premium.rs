use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{print_done, print_empty};
use crate::cli::{admin_state, OutputFormat};
use crate::services::users::normalize_email;
use crate::services::UserService;
use crate::types::timestamp;

#[derive(Subcommand)]
pub enum PremiumCommands {
    #[command(about = "Put an email on the premium list")]
    Add {
        #[arg(help = "Email to pre-approve")]
        email: String,
    },

    #[command(about = "Take an email off the premium list")]
    Remove {
        #[arg(help = "Email to remove")]
        email: String,
    },

    #[command(about = "List pending premium emails")]
    List,
}

pub async fn handle(cmd: PremiumCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = admin_state().await?;
    let users = UserService::new(&state);

    match cmd {
        PremiumCommands::Add { email } => {
            let premium = users.create_premium_user(&email, None).await?;
            print_done(
                &output_format,
                &format!("Added {} to the premium list", premium.email),
                Some(serde_json::to_value(&premium)?),
            )
        }
        PremiumCommands::Remove { email } => {
            let email = normalize_email(&email);
            let deleted = users.delete_premium_user(&email).await?;
            if deleted == 0 {
                anyhow::bail!("{} is not on the premium list", email);
            }
            print_done(
                &output_format,
                &format!("Removed {} from the premium list", email),
                Some(json!({ "email": email, "deleted": deleted })),
            )
        }
        PremiumCommands::List => {
            let entries = users.list_premium_users().await?;
            if entries.is_empty() {
                return print_empty(&output_format, "premium_users", "No premium emails pending");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "premium_users": entries }))?);
                }
                OutputFormat::Text => {
                    println!("{:<40} {}", "EMAIL", "ADDED");
                    println!("{}", "-".repeat(70));
                    for entry in &entries {
                        println!("{:<40} {}", entry.email, timestamp::format(&entry.created_at));
                    }
                }
            }
            Ok(())
        }
    }
}
