mod cli;

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use cli::{Command, UsersCommand};
use conciliacion::{
    export_csv, format_currency, format_date, truncate, AccountStore, Config, Dashboard, DashboardError,
    DashboardView, FilterSet, Permission, Session,
};
use std::collections::BTreeSet;
use std::env;

/// Environment variable read instead of prompting for the password
const PASSWORD_ENV: &str = "CONCILIACION_PASSWORD";

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::parse();
    let config = Config::load_or_default(&args.config)?;

    let mut store = AccountStore::open(
        config.account_backend(),
        config.audit_log()?,
        &config.default_admin,
    )?;

    let session = login(&store, args.user.as_deref())?;

    match args.command {
        Command::Report { filters, limit } => {
            session.require_permission(&store, Permission::ReportAccess)?;
            run_report(&config, &filters.to_filter_set(), limit)?;
        }
        Command::Dashboard => {
            session.require_permission(&store, Permission::ReportAccess)?;
            run_ui_mode(&config, &session)?;
        }
        Command::Export { filters, out } => {
            session.require_permission(&store, Permission::EditData)?;
            let mut dashboard = Dashboard::new(config.ingest_cache());
            let view = render_or_exit(&mut dashboard, &filters.to_filter_set())?;
            let written = export_csv(&view.rows, &out)?;
            println!("✓ Exported {} records to {}", written, out.display());
        }
        Command::Users(command) => run_users(&mut store, &session, command)?,
    }

    Ok(())
}

fn login(store: &AccountStore, user: Option<&str>) -> Result<Session> {
    let username = match user {
        Some(user) => user.to_string(),
        None => cli::prompt("Usuario")?,
    };
    let password = match env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => cli::prompt_password("Contraseña")?,
    };

    let mut session = Session::new();
    if let Err(e) = session.login(store, &username, &password) {
        eprintln!("❌ Credenciales incorrectas");
        return Err(e.into());
    }

    Ok(session)
}

/// Structural failures end the render with a message instead of a table
fn render_or_exit(dashboard: &mut Dashboard, filters: &FilterSet) -> Result<DashboardView> {
    match dashboard.render(filters) {
        Ok(view) => {
            for warning in &view.warnings {
                eprintln!("⚠️  Error leyendo {}: {}", warning.source, warning.reason);
            }
            Ok(view)
        }
        Err(e @ DashboardError::NoDataAvailable { .. }) | Err(e @ DashboardError::StoreUnavailable(_)) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn run_report(config: &Config, filters: &FilterSet, limit: Option<usize>) -> Result<()> {
    let mut dashboard = Dashboard::new(config.ingest_cache());
    let view = render_or_exit(&mut dashboard, filters)?;

    println!("📊 Conciliación de Pagos");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("💰 Total Pagado: {}", format_currency(view.summary.total_amount));
    println!("📄 Registros:    {} (de {})", view.summary.record_count, view.total_records);

    println!("\n💰 Total Pagos por Banco");
    for (bank, total) in view.summary.bank_totals_desc() {
        let label = if bank.code().is_empty() { "(sin banco)" } else { bank.code() };
        println!("   {:<14} {:>16}", label, format_currency(total));
    }

    println!(
        "\n{:<12} {:<28} {:<10} {:<10} {:<12} {:<14} {:>14}",
        "Fecha", "Nombre", "Código", "Préstamo", "Banco", "Oficial", "Monto"
    );
    let shown = limit.unwrap_or(view.rows.len());
    for record in view.rows.iter().take(shown) {
        println!(
            "{:<12} {:<28} {:<10} {:<10} {:<12} {:<14} {:>14}",
            format_date(record.date),
            truncate(record.name.as_deref().unwrap_or(""), 28),
            record.code.as_deref().unwrap_or(""),
            record.loan_id.as_deref().unwrap_or(""),
            record.bank.code(),
            record.officer.as_deref().unwrap_or(""),
            format_currency(record.amount),
        );
    }
    if shown < view.rows.len() {
        println!("... {} more rows", view.rows.len() - shown);
    }

    Ok(())
}

fn run_users(store: &mut AccountStore, session: &Session, command: UsersCommand) -> Result<()> {
    match command {
        UsersCommand::List => {
            session.require_admin(store)?;
            for username in store.usernames() {
                if let Some(account) = store.get(username) {
                    let permissions: Vec<&str> = account.permissions.iter().map(|p| p.label()).collect();
                    println!("👤 {:<16} {}", username, permissions.join(", "));
                }
            }
        }
        UsersCommand::Add { username, permissions } => {
            let permissions = parse_permissions(&permissions, Permission::ReportAccess)?;
            let password = cli::prompt_new_password("Contraseña")?;
            session.create_user(store, &username, &password, permissions)?;
            println!("✓ Usuario {} creado.", username);
        }
        UsersCommand::Reset { username } => {
            let password = cli::prompt_new_password("Nueva contraseña")?;
            session.reset_password(store, &username, &password)?;
            println!("✓ Contraseña de {} actualizada.", username);
        }
        UsersCommand::Passwd => {
            let current = cli::prompt_password("Contraseña actual")?;
            let password = cli::prompt_new_password("Nueva contraseña")?;
            session.change_own_password(store, &current, &password)?;
            println!("✓ Contraseña actualizada.");
        }
        UsersCommand::Permissions { username, permissions } => {
            let permissions = parse_permissions(&permissions, Permission::ReportAccess)?;
            session.set_permissions(store, &username, permissions)?;
            println!("✓ Permisos de {} actualizados.", username);
        }
        UsersCommand::Delete { username } => {
            session.delete_user(store, &username)?;
            println!("✓ Usuario {} eliminado.", username);
        }
        UsersCommand::Audit => {
            session.require_admin(store)?;
            for entry in store.audit_entries()? {
                println!(
                    "{}  {:<12} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.actor,
                    entry.action
                );
            }
        }
    }

    Ok(())
}

/// Parse permission arguments; none given means `default` only
fn parse_permissions(values: &[String], default: Permission) -> Result<BTreeSet<Permission>> {
    if values.is_empty() {
        return Ok(BTreeSet::from([default]));
    }

    let permissions = values
        .iter()
        .map(|v| v.parse::<Permission>())
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(permissions)
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config, session: &Session) -> Result<()> {
    println!("🖥️  Loading dashboard...\n");

    let mut dashboard = Dashboard::new(config.ingest_cache());
    // Fail before entering the alternate screen when there is nothing to show
    render_or_exit(&mut dashboard, &FilterSet::default())?;

    let user = session.current_user().unwrap_or_default().to_string();
    let mut app = ui::App::new(dashboard, user, config.default_date_from)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config, _session: &Session) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print a report: conciliacion report");
    std::process::exit(1);
}
