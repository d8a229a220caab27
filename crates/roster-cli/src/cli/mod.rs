//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use roster_types::{RecordId, School};

mod commands;

use commands::Env;

#[derive(Parser)]
#[command(name = "roster")]
#[command(version)]
#[command(about = "Manage a student roster signed in with your identity")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Record store base URL (overrides config)
    #[arg(long, global = true, value_name = "URL", env = "ROSTER_STORE_URL")]
    store_url: Option<String>,

    /// Use a throwaway in-memory store and a local demo identity
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in through the identity provider
    Login,
    /// Sign out and forget cached credentials
    Logout,
    /// Show the signed-in principal
    Whoami,
    /// List all students
    List,
    /// Show one student
    Show {
        #[arg(value_name = "ID")]
        id: RecordId,
    },
    /// Add a student
    Add(NewStudentArgs),
    /// Replace a student's fields; omitted fields keep their current value
    Edit {
        #[arg(value_name = "ID")]
        id: RecordId,
        #[command(flatten)]
        fields: EditStudentArgs,
    },
    /// Delete a student
    Delete {
        #[arg(value_name = "ID")]
        id: RecordId,
    },
    /// List the school codes accepted by --school
    Schools,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Create a commented default config file
    Init,
}

#[derive(clap::Args, Debug, Clone)]
struct NewStudentArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    fathers_name: String,
    #[arg(long)]
    mothers_name: String,
    #[arg(long)]
    phone_number: String,
    #[arg(long)]
    email: String,
    /// Institution code, e.g. IPRC-TUMBA
    #[arg(long, default_value_t = School::default())]
    school: School,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct EditStudentArgs {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    fathers_name: Option<String>,
    #[arg(long)]
    mothers_name: Option<String>,
    #[arg(long)]
    phone_number: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Institution code, e.g. IPRC-TUMBA
    #[arg(long)]
    school: Option<School>,
}

impl From<NewStudentArgs> for roster_types::StudentFields {
    fn from(args: NewStudentArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            fathers_name: args.fathers_name,
            mothers_name: args.mothers_name,
            phone_number: args.phone_number,
            email: args.email,
            school: args.school,
        }
    }
}

impl EditStudentArgs {
    fn apply(self, fields: &mut roster_types::StudentFields) {
        let EditStudentArgs {
            first_name,
            last_name,
            fathers_name,
            mothers_name,
            phone_number,
            email,
            school,
        } = self;
        let text = [
            (first_name, &mut fields.first_name),
            (last_name, &mut fields.last_name),
            (fathers_name, &mut fields.fathers_name),
            (mothers_name, &mut fields.mothers_name),
            (phone_number, &mut fields.phone_number),
            (email, &mut fields.email),
        ];
        for (value, slot) in text {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(school) = school {
            fields.school = school;
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one runtime, one thread: the coordinator awaits each transition in turn
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        store_url,
        offline,
    } = cli;

    // commands that never touch the store skip config loading
    let load = || Env::load(store_url.clone(), offline);

    match command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
        Commands::Schools => {
            commands::records::schools();
            Ok(())
        }

        Commands::Login => commands::auth::login(&load()?).await,
        Commands::Logout => commands::auth::logout(&load()?).await,
        Commands::Whoami => commands::auth::whoami(&load()?).await,

        Commands::List => commands::records::list(&load()?).await,
        Commands::Show { id } => commands::records::show(&load()?, id).await,
        Commands::Add(args) => commands::records::add(&load()?, args.into()).await,
        Commands::Edit { id, fields } => {
            commands::records::edit(&load()?, id, |draft| fields.apply(draft)).await
        }
        Commands::Delete { id } => commands::records::delete(&load()?, id).await,
    }
}
