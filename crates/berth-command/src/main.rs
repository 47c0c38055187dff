use std::sync::Arc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use berth_core::{AuthVerdict, Company, IdentityStore, LocalAuthority, RequestValidator};
use berth_db::DbIdentityStore;

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Berth Local Administrative CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL", default_value = "berth-identity.db")]
    db: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Tenant (company) management
    Company {
        #[command(subcommand)]
        sub: CompanyCommands,
    },
    /// Credential checks against the local store
    Credentials {
        #[command(subcommand)]
        sub: CredentialCommands,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Register a new company; prints its credentials exactly once
    Register {
        #[arg(long)]
        name: String,
    },
    /// List registered companies (secrets are not shown)
    List,
    /// Show one company by id (secret is not shown)
    Show {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum CredentialCommands {
    /// Validate an API key/secret pair
    Check {
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        api_secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let store = Arc::new(DbIdentityStore::new(&cli.db)?);

    match cli.command {
        Commands::Company { sub } => match sub {
            CompanyCommands::Register { name } => {
                let company = Company::new(name);
                store.insert(&company)?;
                println!("Company registered: {}", company.id);
                println!("Store these credentials now; the secret is never shown again.");
                println!("  api key:    {}", company.api_key);
                println!("  api secret: {}", company.api_secret);
            }
            CompanyCommands::List => {
                let companies = store.list()?;
                println!("Registered Companies:");
                println!("{:<38} {:<24} {:<34}", "ID", "Name", "API Key");
                println!("{}", "-".repeat(96));
                for company in companies {
                    println!(
                        "{:<38} {:<24} {:<34}",
                        company.id, company.name, company.api_key
                    );
                }
            }
            CompanyCommands::Show { id } => match store.find_by_id(&id)? {
                Some(company) => {
                    println!("ID:      {}", company.id);
                    println!("Name:    {}", company.name);
                    println!("API Key: {}", company.api_key);
                }
                None => println!("No company with id {}", id),
            },
        },
        Commands::Credentials { sub } => match sub {
            CredentialCommands::Check { api_key, api_secret } => {
                let validator = RequestValidator::new(Arc::new(LocalAuthority::new(store)));
                match validator.validate_request(&api_key, &api_secret).await {
                    AuthVerdict::Authorized { company_id } => {
                        println!("Authorized: company {}", company_id)
                    }
                    AuthVerdict::Unauthorized => println!("Unauthorized"),
                    AuthVerdict::AuthorityUnavailable => println!("Authority unavailable"),
                }
            }
        },
    }

    Ok(())
}
