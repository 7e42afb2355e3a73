//! Warden - command-line session manager.

mod cli;
mod settings;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use warden_application::{CredentialStore, SessionController, SessionSettings};
use warden_domain::{AuthError, Credentials, Metadata, MetadataPatch, UserProfile};
use warden_infrastructure::{
    FileCredentialRepository, HttpIdentityClient, LoopbackUserAgent, ManagementApiClient,
    SystemClock, TokioFileSystem,
};

use crate::cli::{Cli, Command, MetadataCommand};
use crate::settings::Settings;

type Controller = SessionController<
    HttpIdentityClient<LoopbackUserAgent>,
    ManagementApiClient,
    FileCredentialRepository<TokioFileSystem>,
>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = settings::load(&cli.config)?;
    tracing::debug!(
        domain = %settings.identity.domain,
        store = %settings.store_dir.display(),
        "configuration loaded"
    );

    let controller = build_controller(&settings)?;
    run(&controller, cli.command).await?;
    Ok(())
}

fn build_controller(settings: &Settings) -> Result<Controller, AuthError> {
    let identity = HttpIdentityClient::new(settings.identity.clone(), LoopbackUserAgent::default())?;
    let profiles = ManagementApiClient::new(&settings.identity)?;
    let repository = FileCredentialRepository::new(TokioFileSystem::new(), &settings.store_dir);
    let store = CredentialStore::new(repository, Arc::new(SystemClock::new()))
        .with_expiry_margin(settings.identity.expiry_margin());
    Ok(SessionController::new(
        identity,
        profiles,
        store,
        SessionSettings::from_config(&settings.identity),
    ))
}

async fn run(controller: &Controller, command: Command) -> Result<(), AuthError> {
    match command {
        Command::Login => {
            let session = controller.login().await?;
            match &session.profile {
                Some(profile) => println!("Logged in as {}", describe_user(profile)),
                None => println!("Logged in"),
            }
        }
        Command::Status => {
            let status = controller.store().status().await?;
            println!("{}", status.display_message());
            if status.needs_refresh() {
                println!("The next command will renew the credentials");
            } else if !status.is_valid() {
                println!("Run `warden login` to sign in");
            }
        }
        Command::Logout => match controller.restore().await {
            Ok(_) => {
                controller.logout().await?;
                println!("Logged out");
            }
            Err(AuthError::MissingSession) => println!("Not logged in"),
            Err(error) => {
                controller.forget().await?;
                if error.is_transient() {
                    eprintln!("Provider unreachable, local credentials removed");
                } else {
                    eprintln!("Stored session unusable, local credentials removed");
                }
                return Err(error);
            }
        },
        Command::Metadata(MetadataCommand::Get { key }) => {
            controller.restore().await?;
            let profile = controller.get_metadata().await?;
            print_metadata(&profile, key.as_deref());
        }
        Command::Metadata(MetadataCommand::Set { entries }) => {
            controller.restore().await?;
            let patch = MetadataPatch::new(entries.into_iter().collect::<Metadata>())?;
            let profile = controller.patch_metadata(&patch).await?;
            print_metadata(&profile, None);
        }
        Command::Token { reveal } => {
            controller.restore().await?;
            let credentials = controller.get_or_refresh_credentials().await?;
            print_credentials(&credentials, reveal);
        }
        Command::Renew => {
            controller.restore().await?;
            let credentials = controller.renew().await?;
            print_credentials(&credentials, false);
        }
    }
    Ok(())
}

fn describe_user(profile: &UserProfile) -> String {
    match (&profile.name, &profile.email) {
        (Some(name), Some(email)) => format!("{name} <{email}>"),
        (Some(name), None) => name.clone(),
        (None, Some(email)) => email.clone(),
        (None, None) => profile.id.clone(),
    }
}

fn print_metadata(profile: &UserProfile, key: Option<&str>) {
    match key {
        Some(key) => match profile.metadata(key) {
            Some(serde_json::Value::String(value)) => println!("{value}"),
            Some(value) => println!("{value}"),
            None => eprintln!("{key} is not set"),
        },
        None => match serde_json::to_string_pretty(&profile.user_metadata) {
            Ok(json) => println!("{json}"),
            Err(error) => eprintln!("cannot render metadata: {error}"),
        },
    }
}

fn print_credentials(credentials: &Credentials, reveal: bool) {
    if reveal {
        println!("{}", credentials.access_token);
        return;
    }
    println!("Access token valid until {}", credentials.expires_at.to_rfc3339());
    println!("Scope: {}", credentials.scope);
    println!(
        "Refresh token: {}",
        if credentials.can_refresh() { "present" } else { "absent" }
    );
}
