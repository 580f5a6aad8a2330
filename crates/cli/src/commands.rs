//! CLI commands

use anyhow::{Result, bail};
use clap::Subcommand;
use logistics_frontend_common::services::with_auth_error_handling;
use logistics_frontend_common::{
    ClientSet, CompletionError, FlowError, PhoneVerification, ResendOutcome, Step,
};
use logistics_http::ClientError;
use logistics_http::types::{
    CreateDraftRequest, Dimensions, DraftStatus, RegisterRequest, SignInRequest,
    UpdateDraftRequest, UpdatePersonalInfoRequest,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use crate::output::{print_fields, print_json};

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with a phone number or email and a password
    SignIn {
        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        password: String,
    },

    /// Create an account; the phone is confirmed with a texted code
    Register {
        #[arg(long)]
        phone: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        middle_name: Option<String>,
    },

    /// End the session on the server and locally
    Logout,

    /// Show whether a session is stored
    Status,

    /// Profile of the signed-in user
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Waybill drafts
    Drafts {
        #[command(subcommand)]
        command: DraftCommands,
    },

    /// List pricing rules available for drafts
    PricingRules,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Print the profile
    Show,

    /// Change the phone number after confirming it with a code
    Phone {
        /// New phone number
        phone: String,
    },

    /// Change the password
    Password {
        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },

    /// Update name or email
    Personal {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        middle_name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(clap::Args)]
pub struct DimensionArgs {
    /// Length, requires width and height
    #[arg(long)]
    length: Option<Decimal>,

    #[arg(long)]
    width: Option<Decimal>,

    #[arg(long)]
    height: Option<Decimal>,
}

impl DimensionArgs {
    fn into_dimensions(self) -> Result<Option<Dimensions>> {
        match (self.length, self.width, self.height) {
            (Some(length), Some(width), Some(height)) => Ok(Some(Dimensions {
                length,
                width,
                height,
            })),
            (None, None, None) => Ok(None),
            _ => bail!("--length, --width and --height must be given together"),
        }
    }
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// List your drafts
    List {
        /// PENDING, CONFIRMED or CANCELLED
        #[arg(long)]
        status: Option<DraftStatus>,
    },

    /// Show one draft
    Get { id: i64 },

    /// Find a draft by its barcode
    Barcode { code: String },

    /// Create a draft
    Create {
        #[arg(long)]
        recipient_phone: String,

        #[arg(long)]
        address: String,

        /// Declared weight, kg
        #[arg(long)]
        weight: Decimal,

        /// Pricing rule id, see `logi pricing-rules`
        #[arg(long)]
        pricing_rule: i64,

        #[command(flatten)]
        dimensions: DimensionArgs,
    },

    /// Change a draft
    Update {
        id: i64,

        #[arg(long)]
        recipient_user: Option<i64>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        weight: Option<Decimal>,

        #[arg(long)]
        pricing_rule: Option<i64>,

        #[command(flatten)]
        dimensions: DimensionArgs,
    },

    /// Delete a draft
    Delete { id: i64 },
}

impl Commands {
    pub async fn execute(self, clients: &ClientSet) -> Result<()> {
        match self {
            Self::SignIn {
                phone,
                email,
                password,
            } => {
                if phone.is_none() && email.is_none() {
                    bail!("Either --phone or --email is required");
                }
                clients
                    .auth
                    .sign_in(&SignInRequest {
                        phone,
                        password,
                        email,
                    })
                    .await?;
                info!("Signed in");
                println!("Signed in");
                Ok(())
            }
            Self::Register {
                phone,
                password,
                email,
                first_name,
                last_name,
                middle_name,
            } => {
                let request = RegisterRequest {
                    email,
                    phone: phone.clone(),
                    password,
                    first_name,
                    last_name,
                    middle_name,
                };
                let flow = clients.phone_verification();
                let flow = &flow;
                verify_interactively(flow, &phone, move |code| {
                    let request = request.clone();
                    async move {
                        clients
                            .auth
                            .complete_registration(flow, request, &code)
                            .await
                    }
                })
                .await?;
                println!("Registered and signed in");
                Ok(())
            }
            Self::Logout => {
                clients.auth.logout().await;
                println!("Signed out");
                Ok(())
            }
            Self::Status => print_json(&json!({
                "authenticated": clients.session.is_authenticated()
            })),
            Self::Profile { command } => command.execute(clients).await,
            Self::Drafts { command } => command.execute(clients).await,
            Self::PricingRules => {
                let rules = guarded(clients, clients.drafts.pricing_rules()).await?;
                print_json(&rules)
            }
        }
    }
}

impl ProfileCommands {
    pub async fn execute(self, clients: &ClientSet) -> Result<()> {
        match self {
            Self::Show => print_json(&guarded(clients, clients.users.profile()).await?),
            Self::Phone { phone } => {
                let flow = clients.phone_verification();
                let flow = &flow;
                let updated = verify_interactively(flow, &phone, move |code| {
                    async move { clients.users.change_phone(flow, &code).await }
                })
                .await?;
                print_updated(updated.as_ref(), "Phone updated")
            }
            Self::Password { old, new } => {
                guarded(clients, clients.users.update_password(&old, &new)).await?;
                println!("Password updated");
                Ok(())
            }
            Self::Personal {
                first_name,
                last_name,
                middle_name,
                email,
            } => {
                let request = UpdatePersonalInfoRequest {
                    first_name,
                    last_name,
                    middle_name,
                    email,
                };
                if request == UpdatePersonalInfoRequest::default() {
                    bail!("Nothing to update");
                }
                let updated = guarded(clients, clients.users.update_personal_info(&request)).await?;
                print_updated(updated.as_ref(), "Profile updated")
            }
        }
    }
}

impl DraftCommands {
    pub async fn execute(self, clients: &ClientSet) -> Result<()> {
        let drafts = &clients.drafts;
        match self {
            Self::List { status } => print_json(&guarded(clients, drafts.list(status)).await?),
            Self::Get { id } => print_json(&guarded(clients, drafts.get(id)).await?),
            Self::Barcode { code } => {
                print_json(&guarded(clients, drafts.get_by_barcode(&code)).await?)
            }
            Self::Create {
                recipient_phone,
                address,
                weight,
                pricing_rule,
                dimensions,
            } => {
                let request = CreateDraftRequest {
                    recipient_phone,
                    recipient_address: address,
                    weight_declared: weight,
                    pricing_rule_id: pricing_rule,
                    dimensions: dimensions.into_dimensions()?,
                };
                print_json(&guarded(clients, drafts.create(&request)).await?)
            }
            Self::Update {
                id,
                recipient_user,
                address,
                weight,
                pricing_rule,
                dimensions,
            } => {
                let request = UpdateDraftRequest {
                    recipient_user_id: recipient_user,
                    recipient_address: address,
                    weight_declared: weight,
                    dimensions: dimensions.into_dimensions()?,
                    pricing_rule_id: pricing_rule,
                };
                print_json(&guarded(clients, drafts.update(id, &request)).await?)
            }
            Self::Delete { id } => {
                guarded(clients, drafts.delete(id)).await?;
                println!("Draft {id} deleted");
                Ok(())
            }
        }
    }
}

/// Run an authenticated call, dropping the stored session if the server
/// no longer accepts it
async fn guarded<T>(
    clients: &ClientSet,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T> {
    Ok(with_auth_error_handling(&clients.session, call).await?)
}

fn print_updated<T: serde::Serialize>(updated: Option<&T>, fallback: &str) -> Result<()> {
    match updated {
        Some(value) => print_json(value),
        None => {
            println!("{fallback}");
            Ok(())
        }
    }
}

/// Send a code to `phone`, then read codes from stdin until `complete`
/// accepts one. Typing `r` asks for a new code.
async fn verify_interactively<T, F, Fut>(
    flow: &PhoneVerification,
    phone: &str,
    mut complete: F,
) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, CompletionError>>,
{
    flow.send_code(phone).await?;
    eprintln!("A code was sent to {phone}. Enter it, or `r` to request a new one.");

    let mut prompt = Prompt::stdin();
    loop {
        let Some(line) = prompt.next_line("Code").await? else {
            flow.close();
            bail!("Verification cancelled");
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("r") {
            match flow.resend().await {
                Ok(ResendOutcome::Sent) => eprintln!("A new code was sent"),
                Ok(ResendOutcome::CoolingDown(seconds) | ResendOutcome::Resynced(seconds)) => {
                    eprintln!("You can request a new code in {seconds} s");
                }
                Err(error) => report_flow_error(&error),
            }
            continue;
        }

        match complete(line.to_string()).await {
            Ok(value) => return Ok(value),
            Err(CompletionError::Verification(error)) if flow.step() == Step::Verify => {
                report_flow_error(&error);
            }
            Err(error) => return Err(error.into()),
        }
    }
}

fn report_flow_error(error: &FlowError) {
    eprintln!("{error}");
    if let Some(info) = error.info() {
        print_fields(info);
    }
}

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn next_line(&mut self, label: &str) -> Result<Option<String>> {
        eprint!("{label}: ");
        std::io::stderr().flush()?;
        Ok(self.lines.next_line().await?)
    }
}
