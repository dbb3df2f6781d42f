#![allow(clippy::print_stdout)]

use anyhow::{Context, bail};
use brand_client_core::config_path;
use brand_client_core::{
    AccessGate, BrandPatch, BrandSynchronizer, ClientConfig, ConfigEdit, FileCredentialStore,
    GateDecision, Navigator, SessionManager, SessionSource,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

const SETTINGS_ROUTE: &str = "/settings";

#[derive(Parser)]
#[command(name = "brandctl")]
#[command(about = "Brand console: sign in and manage brand settings")]
pub struct BrandCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login(LoginArgs),
    /// Sign in with a pre-issued token scoped to a tenant
    LoginToken(LoginTokenArgs),
    /// Forget the stored session
    Logout,
    /// Verify the stored session and show who is signed in
    Status,
    /// Show or update the brand's top-level fields
    #[command(subcommand)]
    Brand(BrandCommand),
    /// Read or write nested brand config values by dotted path
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Change the signed-in user's password
    Password(PasswordArgs),
    /// Mark onboarding as complete (or reset it)
    Onboarding(OnboardingArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    /// API base address; remembered for later commands
    #[arg(long)]
    pub api_base_url: Option<String>,
}

#[derive(Args)]
pub struct LoginTokenArgs {
    #[arg(long)]
    pub token: String,
    #[arg(long)]
    pub tenant: String,
    #[arg(long)]
    pub api_base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum BrandCommand {
    Show,
    Update(BrandUpdateArgs),
}

#[derive(Args)]
pub struct BrandUpdateArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub timezone: Option<String>,
    /// Replaces the phone number list; repeat for several numbers
    #[arg(long = "phone")]
    pub phones: Vec<String>,
    /// Clear the phone number list
    #[arg(long, conflicts_with = "phones")]
    pub clear_phones: bool,
}

impl BrandUpdateArgs {
    fn into_patch(self) -> BrandPatch {
        let phone_numbers = if self.clear_phones {
            Some(Vec::new())
        } else if self.phones.is_empty() {
            None
        } else {
            Some(self.phones)
        };
        BrandPatch {
            name: self.name,
            timezone: self.timezone,
            phone_numbers,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Get { path: String },
    /// VALUE is parsed as JSON, falling back to a plain string
    Set { path: String, value: String },
    Unset { path: String },
}

#[derive(Args)]
pub struct PasswordArgs {
    #[arg(long)]
    pub current: String,
    #[arg(long)]
    pub new: String,
    #[arg(long)]
    pub confirm: String,
}

#[derive(Args)]
pub struct OnboardingArgs {
    #[arg(long)]
    pub reset: bool,
}

#[derive(Default)]
struct CliNavigator {
    redirected_to: Option<String>,
}

impl Navigator for CliNavigator {
    fn replace(&mut self, route: &str) {
        self.redirected_to = Some(route.to_string());
    }
}

type Manager = SessionManager<FileCredentialStore>;

fn open_manager() -> anyhow::Result<Manager> {
    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let store = FileCredentialStore::open(config.store_path.clone());
    Ok(SessionManager::new(store, config))
}

/// Verifies the stored session and lets the access gate decide whether a
/// protected command may run.
async fn protected_manager() -> anyhow::Result<Manager> {
    let mut manager = open_manager()?;
    manager.verify_startup().await;

    let mut gate = AccessGate::default();
    let mut navigator = CliNavigator::default();
    match gate.evaluate(SETTINGS_ROUTE, manager.gate_state(), &mut navigator) {
        GateDecision::Render => Ok(manager),
        GateDecision::Loading => bail!("session check did not complete"),
        GateDecision::Redirect(route) => {
            tracing::debug!(route = %route, redirected = ?navigator.redirected_to, "protected command refused");
            bail!("not signed in; run `brandctl login` first")
        }
    }
}

#[must_use]
pub fn parse_config_value(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn run(cli: BrandCli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Login(args) => {
            let mut manager = open_manager()?;
            let session = manager
                .sign_in_with_password(&args.email, &args.password, args.api_base_url.as_deref())
                .await?;
            if let Some(user) = session.user() {
                println!("signed in as {} (tenant {})", user.email, user.tenant_id);
            }
        }
        Commands::LoginToken(args) => {
            let mut manager = open_manager()?;
            let session = manager
                .sign_in_with_raw_token(args.api_base_url.as_deref(), &args.token, &args.tenant)
                .await?;
            if let Some(user) = session.user() {
                println!("signed in as {} (tenant {})", user.id, user.tenant_id);
            }
        }
        Commands::Logout => {
            open_manager()?.sign_out()?;
            println!("signed out");
        }
        Commands::Status => {
            let mut manager = open_manager()?;
            let outcome = manager.verify_startup().await;
            let resolved = manager.resolve_base_url(None);
            println!("api: {} ({})", resolved.base_url, resolved.source);
            println!("session: {:?} ({outcome:?})", manager.gate_state());
            if let Some(user) = manager.session().user() {
                println!("user: {} <{}>", user.id, user.email);
                println!("tenant: {}", user.tenant_id);
            }
            println!("onboarding complete: {}", manager.onboarding_complete());
        }
        Commands::Brand(command) => {
            let manager = protected_manager().await?;
            let mut brands = BrandSynchronizer::new();
            match command {
                BrandCommand::Show => {
                    brands.load(&manager).await?;
                }
                BrandCommand::Update(args) => {
                    let patch = args.into_patch();
                    if patch.is_empty() {
                        bail!("nothing to update");
                    }
                    brands.patch_fields(&manager, &patch).await?;
                }
            }
            let brand = brands.brand(&manager).context("no brand loaded")?;
            println!("{}", serde_json::to_string_pretty(brand)?);
        }
        Commands::Config(command) => {
            let manager = protected_manager().await?;
            let mut brands = BrandSynchronizer::new();
            brands.load(&manager).await?;
            let edit = match command {
                ConfigCommand::Get { path } => {
                    let config = brands.config(&manager);
                    match config_path::get(&config, &path) {
                        Some(value) => match config_path::get_display(&config, &path) {
                            Some(text) => println!("{text}"),
                            None => println!("{}", serde_json::to_string_pretty(value)?),
                        },
                        None => bail!("no value at {path}"),
                    }
                    return Ok(());
                }
                ConfigCommand::Set { path, value } => {
                    ConfigEdit::Set(path, parse_config_value(&value))
                }
                ConfigCommand::Unset { path } => ConfigEdit::Remove(path),
            };
            brands.apply_config_edits(&manager, &[edit]).await?;
            println!("config updated");
        }
        Commands::Password(args) => {
            let manager = protected_manager().await?;
            manager
                .change_password(&args.current, &args.new, &args.confirm)
                .await?;
            println!("password updated");
        }
        Commands::Onboarding(args) => {
            let mut manager = protected_manager().await?;
            manager.set_onboarding_complete(!args.reset)?;
            println!("onboarding complete: {}", manager.onboarding_complete());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn cli_requires_subcommand() {
        let err = match BrandCli::try_parse_from(["brandctl"]) {
            Ok(_) => panic!("expected missing subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn brand_update_collects_repeated_phones() {
        let cli = BrandCli::try_parse_from([
            "brandctl", "brand", "update", "--phone", "+1555", "--phone", "+1666",
        ])
        .expect("parse brand update");
        let Commands::Brand(BrandCommand::Update(args)) = cli.command else {
            panic!("expected brand update");
        };
        let patch = args.into_patch();
        assert_eq!(
            patch.phone_numbers,
            Some(vec!["+1555".to_string(), "+1666".to_string()])
        );
        assert_eq!(patch.name, None);
    }

    #[test]
    fn clear_phones_conflicts_with_phone() {
        let result = BrandCli::try_parse_from([
            "brandctl",
            "brand",
            "update",
            "--phone",
            "+1555",
            "--clear-phones",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn config_values_parse_as_json_or_text() {
        assert_eq!(parse_config_value("12"), json!(12));
        assert_eq!(parse_config_value("[\"a\"]"), json!(["a"]));
        assert_eq!(parse_config_value("9:16"), json!("9:16"));
    }
}
