use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Arg, ArgAction, Command};

use clinic_cms::auth::user_from_input;
use clinic_cms::backup::{cleanup, run_backup};
use clinic_cms::database::{Database, Repository};
use clinic_cms::models::{BackupFrequency, Config, Role, User, UserInput};
use clinic_cms::scheduler::next_run;
use clinic_cms::settings::BackupSettings;

#[tokio::main]
async fn main() -> Result<()> {
    clinic_cms::init_logging();

    let matches = Command::new("Clinic CMS Database Administration")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Backups, cleanup and user bootstrap for the clinic CMS database")
        .arg(
            Arg::new("database")
                .long("db")
                .value_name("FILE")
                .help("Path to SQLite database (defaults to DATABASE_PATH)"),
        )
        .subcommand(Command::new("status").about("Show table counts and backup state"))
        .subcommand(Command::new("backup").about("Write a SQL backup now"))
        .subcommand(
            Command::new("cleanup")
                .about("Delete backups older than the retention period")
                .arg(
                    Arg::new("days")
                        .long("days")
                        .value_name("DAYS")
                        .value_parser(clap::value_parser!(i64))
                        .help("Override db_backup_retention_days"),
                ),
        )
        .subcommand(
            Command::new("next-run")
                .about("Print when the next scheduled backup is due")
                .arg(
                    Arg::new("frequency")
                        .long("frequency")
                        .value_name("daily|weekly|monthly")
                        .help("Override db_backup_frequency"),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_name("RFC3339")
                        .help("Start time (defaults to now)"),
                ),
        )
        .subcommand(
            Command::new("create-user")
                .about("Create an admin panel user")
                .arg(Arg::new("username").long("username").required(true))
                .arg(Arg::new("password").long("password").required(true))
                .arg(
                    Arg::new("admin")
                        .long("admin")
                        .help("Give the user the admin role")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let mut config = Config::from_env()?;
    if let Some(path) = matches.get_one::<String>("database") {
        config.database_path = path.clone();
    }

    let db = Database::connect(&config.database_path)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path))?;

    match matches.subcommand() {
        Some(("status", _)) => {
            println!("📊 Database Status: {}", config.database_path);
            for (table, count) in db.table_counts().await? {
                println!("   {:<18} {}", table, count);
            }

            let settings = BackupSettings::load(&db).await?;
            println!("\n💾 Backups: {}", if settings.enabled { "enabled" } else { "disabled" });
            println!("   Frequency: {}", settings.frequency);
            println!("   Retention: {} days", settings.retention_days);
            if let Some(last) = settings.last_run {
                println!("   Last run:  {}", last.to_rfc3339());
            }
            if let Some(next) = settings.next_run {
                println!("   Next run:  {}", next.to_rfc3339());
            }
            for record in db.list_backups().await?.iter().take(5) {
                println!(
                    "   #{:<4} {:<36} {:?} {} bytes",
                    record.id, record.filename, record.status, record.size_bytes
                );
            }
        }

        Some(("backup", _)) => {
            println!("📦 Creating database backup...");
            let record = run_backup(&db, &config.backup_dir).await?;
            println!(
                "✅ Backup created: {} ({} bytes)",
                config.backup_dir.join(&record.filename).display(),
                record.size_bytes
            );
        }

        Some(("cleanup", sub)) => {
            let days = match sub.get_one::<i64>("days") {
                Some(days) if *days > 0 => *days,
                Some(_) => bail!("--days must be positive"),
                None => BackupSettings::load(&db).await?.retention_days,
            };
            let removed = cleanup(&db, &config.backup_dir, days, Utc::now()).await?;
            println!("🧹 Removed {} backups older than {} days", removed, days);
        }

        Some(("next-run", sub)) => {
            let frequency = match sub.get_one::<String>("frequency") {
                Some(raw) => raw.parse::<BackupFrequency>().map_err(anyhow::Error::msg)?,
                None => BackupSettings::load(&db).await?.frequency,
            };
            let from = match sub.get_one::<String>("from") {
                Some(raw) => DateTime::parse_from_rfc3339(raw)
                    .with_context(|| format!("Invalid --from timestamp '{raw}'"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            println!("⏰ Next {} backup: {}", frequency, next_run(from, frequency).to_rfc3339());
        }

        Some(("create-user", sub)) => {
            let input = UserInput {
                username: sub.get_one::<String>("username").cloned().unwrap_or_default(),
                password: sub.get_one::<String>("password").cloned(),
                active: true,
                role: if sub.get_flag("admin") { Role::Admin } else { Role::Editor },
            };
            let user = Repository::<User>::insert(&db, &user_from_input(None, &input)?).await?;
            println!("👤 Created {:?} user '{}'", user.role, user.username);
        }

        _ => {
            println!("📋 Available commands:");
            println!("   status       - Show table counts and backup state");
            println!("   backup       - Write a SQL backup now");
            println!("   cleanup      - Delete expired backups (--days N)");
            println!("   next-run     - Show the next scheduled backup time");
            println!("   create-user  - Create a user (--username, --password, --admin)");
            println!("\nExamples:");
            println!("   cargo run --bin db_admin -- status");
            println!("   cargo run --bin db_admin -- --db clinic.db backup");
            println!("   cargo run --bin db_admin -- next-run --frequency monthly");
        }
    }

    Ok(())
}
