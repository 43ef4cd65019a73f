use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use conciliacion::FilterSet;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use std::path::PathBuf;

/// Payment reconciliation dashboard over a folder of spreadsheets.
#[derive(Parser, Debug)]
pub struct Args {
    /// JSON configuration file
    #[clap(long, default_value = "conciliacion.json")]
    pub config: PathBuf,

    /// Log in as this user (prompted when omitted)
    #[clap(long, short)]
    pub user: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print totals, totals by bank, and the filtered table
    Report {
        #[clap(flatten)]
        filters: FilterArgs,

        /// Only print the first N rows of the table
        #[clap(long)]
        limit: Option<usize>,
    },

    /// Interactive terminal dashboard
    Dashboard,

    /// Write the filtered table to a CSV file
    Export {
        #[clap(flatten)]
        filters: FilterArgs,

        #[clap(long, default_value = "Conciliacion_Pagos_Actualizado.csv")]
        out: PathBuf,
    },

    /// Manage user accounts (administrators only, except `passwd`)
    #[clap(subcommand)]
    Users(UsersCommand),
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List accounts and their permissions
    List,

    /// Create an account; the password is prompted
    Add {
        username: String,

        /// Permission labels or names; defaults to report access only
        #[clap(long = "permission", short)]
        permissions: Vec<String>,
    },

    /// Set a new password for another user
    Reset { username: String },

    /// Change your own password
    Passwd,

    /// Replace the permissions of a user
    Permissions {
        username: String,

        #[clap(long = "permission", short)]
        permissions: Vec<String>,
    },

    /// Delete an account
    Delete { username: String },

    /// Show the audit log
    Audit,
}

#[derive(Debug, ClapArgs, Default)]
pub struct FilterArgs {
    /// First day of the date range (YYYY-MM-DD); requires --to
    #[clap(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of the date range (YYYY-MM-DD); requires --from
    #[clap(long, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Bank code to include (repeatable)
    #[clap(long = "bank")]
    pub banks: Vec<String>,

    /// Officer to include (repeatable)
    #[clap(long = "officer")]
    pub officers: Vec<String>,

    /// Substring of the code column
    #[clap(long, default_value = "")]
    pub code: String,

    /// Substring of the name column
    #[clap(long, default_value = "")]
    pub name: String,

    /// Substring of the loan column
    #[clap(long, default_value = "")]
    pub loan: String,
}

impl FilterArgs {
    pub fn to_filter_set(&self) -> FilterSet {
        FilterSet {
            date_range: self.from.zip(self.to),
            banks: self.banks.iter().map(|b| b.to_uppercase()).collect(),
            officers: self.officers.iter().cloned().collect(),
            code: self.code.clone(),
            name: self.name.clone(),
            loan_id: self.loan.clone(),
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

pub fn prompt(prompt: &str) -> Result<String> {
    Ok(Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?)
}

pub fn prompt_password(prompt: &str) -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()?)
}

pub fn prompt_new_password(prompt: &str) -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()?)
}
