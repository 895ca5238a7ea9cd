// UI layer: runs one subcommand, prompting with `dialoguer` where input is
// missing and showing `indicatif` spinners while requests are in flight.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use crate::api::{http_client, ApiClient, Expense, Group, NewExpense};
use crate::config::{AddArgs, Cli, Command, Config};
use crate::oauth::{Authorize, OAuthFlow, SystemBrowser};
use crate::session;
use crate::store::TokenStore;

/// Entry point used by `main`: resolve config, then run the subcommand.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(&cli);
    let http = http_client().context("Failed to build HTTP client")?;
    let flow = OAuthFlow::new(&config, http.clone(), SystemBrowser);
    execute(&cli.command, &config, http, &flow)
}

/// Run `command`, authenticating through `authorizer` when no cached token
/// is usable.
pub fn execute(
    command: &Command,
    config: &Config,
    http: Client,
    authorizer: &dyn Authorize,
) -> Result<()> {
    let store = TokenStore::new(&config.token_path);
    match command {
        Command::Login => {
            session::login(&store, authorizer)?;
            println!("Logged in, token saved to {}", store.path().display());
        }
        Command::Logout => {
            if store.clear()? {
                println!("Removed cached token {}", store.path().display());
            } else {
                println!("No cached token to remove");
            }
        }
        Command::Test => {
            let api = connect(&store, config, http, authorizer)?;
            with_spinner("Testing credentials...", || api.test_connection())
                .context("Error with the test")?;
            println!("Authenticated correctly");
        }
        Command::Groups => {
            let api = connect(&store, config, http, authorizer)?;
            let groups = with_spinner("Fetching groups...", || api.groups())
                .context("Failed to request groups")?;
            print!("{}", render_groups(&groups));
        }
        Command::Add(args) => {
            let api = connect(&store, config, http, authorizer)?;
            handle_add(&api, args)?;
        }
    }
    Ok(())
}

fn connect(
    store: &TokenStore,
    config: &Config,
    http: Client,
    authorizer: &dyn Authorize,
) -> Result<ApiClient> {
    let token = session::resolve_token(store, authorizer).context("Failed to authenticate")?;
    Ok(ApiClient::new(config, http, token))
}

/// Collect whatever `args` leaves open and create the expense.
fn handle_add(api: &ApiClient, args: &AddArgs) -> Result<()> {
    let group_id = match args.group_id {
        Some(id) => id,
        None => {
            let groups = with_spinner("Fetching groups...", || api.groups())
                .context("Failed to request groups")?;
            pick_group(&groups)?
        }
    };
    let cost = match &args.cost {
        Some(cost) => cost.clone(),
        None => Input::new().with_prompt("Cost").interact_text()?,
    };
    let description = match &args.description {
        Some(description) => description.clone(),
        None => Input::new().with_prompt("Description").interact_text()?,
    };

    let expense = NewExpense {
        group_id,
        cost,
        description,
        payment: args.payment,
    };
    let created = with_spinner("Creating expense...", || api.create_expense(&expense))
        .context("Failed to create expense")?;
    print!("{}", render_expenses(&created));
    Ok(())
}

/// `Select` shows a keyboard-navigable list of the user's groups.
fn pick_group(groups: &[Group]) -> Result<i64> {
    if groups.is_empty() {
        bail!("You are not a member of any group");
    }
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    let idx = Select::new()
        .with_prompt("Choose a group")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(groups[idx].id)
}

fn with_spinner<T, E>(msg: &'static str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = f();
    spinner.finish_and_clear();
    result
}

/// One block per group: its name and id, then each member's balances.
pub fn render_groups(groups: &[Group]) -> String {
    let mut out = String::new();
    if groups.is_empty() {
        out.push_str("No groups\n");
        return out;
    }
    for group in groups {
        let _ = writeln!(out, "{} (id {})", group.name, group.id);
        for member in &group.members {
            let balances: Vec<String> = member
                .balance
                .iter()
                .map(|b| format!("{} {}", b.amount, b.currency_code))
                .collect();
            let summary = if balances.is_empty() {
                "settled up".to_string()
            } else {
                balances.join(", ")
            };
            let _ = writeln!(out, "  {}: {}", member.full_name(), summary);
        }
    }
    out
}

pub fn render_expenses(expenses: &[Expense]) -> String {
    let mut out = String::new();
    for e in expenses {
        let _ = writeln!(
            out,
            "Created expense {}: {} ({} {})",
            e.id, e.description, e.cost, e.currency_code
        );
    }
    out
}
