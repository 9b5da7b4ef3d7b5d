//! Pulso - Workout Schedule & Progress Engine
//!
//! Command-line front end over the local SQLite store.
//!
//! ```bash
//! pulso routine add "Leg Day" --category strength --level intermediate --duration 45 \
//!     --exercise "Squats:legs:4x10" --exercise "Lunges:legs:3x12"
//! pulso schedule <routine-id> 2024-06-03
//! pulso day 2024-06-03
//! pulso complete <entry-id> --minutes 50
//! pulso session <entry-id>
//! pulso medals --progress
//! pulso user list --role admin
//! ```

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use pulso::dates;
use pulso::routines::{Category, Exercise, Level, MuscleGroup, Routine, RoutineExercise};
use pulso::schedule::{CompletionOutcome, Effort, ScheduledWorkout};
use pulso::session::SessionStatus;
use pulso::storage::config::{self, AppConfig, SessionSettings};
use pulso::storage::UserFilter;
use pulso::users::Role;
use pulso::{RoutineManager, ScheduleStore, SessionEngine, SqliteStore, UserManager};

#[derive(Parser)]
#[command(
    name = "pulso",
    version,
    about = "Schedule workouts, track streaks and unlock medals"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database file override
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<Uuid>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Routine catalog administration
    Routine {
        #[command(subcommand)]
        action: RoutineCommand,
    },

    /// Schedule a routine on a date (YYYY-MM-DD)
    Schedule { routine_id: Uuid, date: String },

    /// Show workouts scheduled on a date (default: today)
    Day { date: Option<String> },

    /// Complete a scheduled workout
    Complete {
        entry_id: Uuid,
        #[command(flatten)]
        effort: EffortArgs,
    },

    /// Run a scheduled workout with a live timer, then complete it
    Session { entry_id: Uuid },

    /// Mark a routine done today without scheduling it
    Done {
        routine_id: Uuid,
        #[command(flatten)]
        effort: EffortArgs,
    },

    /// Move a scheduled workout to another date
    Reschedule { entry_id: Uuid, date: String },

    /// Delete a scheduled workout
    Remove { entry_id: Uuid },

    /// Show aggregate statistics
    Stats,

    /// Show earned medals
    Medals {
        /// Include progress towards locked medals
        #[arg(long)]
        progress: bool,
    },

    /// User administration
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum RoutineCommand {
    /// List routines
    List {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },

    /// Add a routine
    Add {
        name: String,

        #[arg(long, value_parser = parse_category, default_value = "other")]
        category: Category,

        #[arg(long, value_parser = parse_level, default_value = "beginner")]
        level: Level,

        /// Planned duration in minutes
        #[arg(long)]
        duration: u32,

        /// Estimated calories for one session
        #[arg(long, default_value = "0")]
        calories: u32,

        /// Exercise as NAME[:MUSCLE_GROUP[:REPS]], repeatable
        #[arg(long = "exercise")]
        exercises: Vec<String>,
    },

    /// Remove a routine
    Remove { id: Uuid },
}

#[derive(Subcommand)]
enum UserCommand {
    /// List users
    List {
        /// Match against name or email
        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },

    /// Register a user
    Add {
        name: String,
        email: String,

        #[arg(long, value_parser = parse_role, default_value = "user")]
        role: Role,
    },

    /// Show a user's schedule summary
    Show { id: Uuid },

    /// Change a user's role
    Role {
        id: Uuid,
        #[arg(value_parser = parse_role)]
        role: Role,
    },

    /// Delete a user and their history
    Remove { id: Uuid },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the active configuration
    Show,
}

#[derive(clap::Args)]
struct EffortArgs {
    /// Measured duration in minutes (default: routine estimate)
    #[arg(long)]
    minutes: Option<u32>,

    /// Measured calories (default: routine estimate)
    #[arg(long)]
    calories: Option<u32>,
}

impl EffortArgs {
    /// Effort override; unset fields fall back to the routine's estimate.
    fn resolve(&self, duration: u32, calories: u32) -> Option<Effort> {
        if self.minutes.is_none() && self.calories.is_none() {
            return None;
        }
        Some(Effort {
            duration_minutes: self.minutes.unwrap_or(duration),
            calories_burned: self.calories.unwrap_or(calories),
        })
    }
}

fn parse_category(value: &str) -> Result<Category, String> {
    Category::from_str(value).ok_or_else(|| format!("unknown category '{value}'"))
}

fn parse_level(value: &str) -> Result<Level, String> {
    Level::from_str(value).ok_or_else(|| format!("unknown level '{value}'"))
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::from_str(value).ok_or_else(|| format!("unknown role '{value}'"))
}

fn parse_exercise(spec: &str) -> Result<RoutineExercise> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    let muscle = match parts.next() {
        Some(group) => MuscleGroup::from_str(group.trim())
            .ok_or_else(|| anyhow!("unknown muscle group '{group}'"))?,
        None => MuscleGroup::Core,
    };
    let reps = parts.next().map(|r| r.trim().to_string());

    Ok(RoutineExercise {
        exercise: Exercise::new(name.to_string(), muscle),
        reps,
        notes: None,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_or_create_config()?;
    let user_id = cli.user.unwrap_or(config.user.user_id);
    let db_path = cli.database.clone().unwrap_or_else(|| config.database_path());

    let sqlite = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?,
    );
    sqlite.seed_default_medals()?;
    tracing::debug!(%user_id, db = %db_path.display(), "Store ready");

    match cli.command {
        Command::Routine { action } => run_routine(action, RoutineManager::new(sqlite)).await,
        Command::User { action } => run_user(action, UserManager::new(sqlite.clone(), sqlite)).await,
        Command::Config { action: ConfigCommand::Show } => {
            println!("config file: {}", config::get_config_path().display());
            println!("database:    {}", db_path.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        command => {
            let mut store =
                ScheduleStore::open_sqlite(user_id, sqlite.clone(), config.stats.clone()).await?;
            match command {
                Command::Session { entry_id } => {
                    run_session(&mut store, &config.session, entry_id).await
                }
                command => run_schedule(command, &mut store, RoutineManager::new(sqlite)).await,
            }
        }
    }
}

fn load_or_create_config() -> Result<AppConfig> {
    let existed = config::get_config_path().exists();
    let config = config::load_config()?;
    if !existed {
        config::save_config(&config)?;
        tracing::info!("Created config at {}", config::get_config_path().display());
    }
    Ok(config)
}

async fn run_routine(action: RoutineCommand, manager: RoutineManager) -> Result<()> {
    match action {
        RoutineCommand::List { category } => {
            let routines = manager.list_routines(category).await?;
            if routines.is_empty() {
                println!("No routines.");
            }
            for routine in routines {
                println!(
                    "{}  {} [{} / {}] {} min, {} kcal, {} exercises",
                    routine.id,
                    routine.name,
                    routine.category,
                    routine.level,
                    routine.duration_minutes,
                    routine.calories,
                    routine.exercises.len()
                );
            }
        }
        RoutineCommand::Add {
            name,
            category,
            level,
            duration,
            calories,
            exercises,
        } => {
            let mut routine = Routine::new(name, category, level, duration);
            routine.calories = calories;
            for spec in &exercises {
                let slot = parse_exercise(spec)?;
                manager.create_exercise(&slot.exercise).await?;
                routine.exercises.push(slot);
            }
            manager.create_routine(&routine).await?;
            println!("Added routine {}", routine.id);
        }
        RoutineCommand::Remove { id } => {
            manager.delete_routine(id).await?;
            println!("Removed routine {id}");
        }
    }
    Ok(())
}

async fn run_schedule(
    command: Command,
    store: &mut ScheduleStore,
    routines: RoutineManager,
) -> Result<()> {
    match command {
        Command::Schedule { routine_id, date } => {
            let routine = find_routine(&routines, routine_id).await?;
            let entry = store.schedule_str(routine.summary(), &date).await?;
            println!("Scheduled {} on {} ({})", entry.routine.name, entry.scheduled_date, entry.id);
        }
        Command::Day { date } => {
            let date = match date {
                Some(value) => dates::parse_date(&value)?,
                None => dates::today_local(),
            };
            print_day(date, &store.entries_for_date(date));
        }
        Command::Complete { entry_id, effort } => {
            let planned = store
                .entries()
                .iter()
                .find(|e| e.id == entry_id)
                .map(|e| (e.routine.duration_minutes, e.routine.calories))
                .unwrap_or_default();
            let outcome = store
                .complete(entry_id, effort.resolve(planned.0, planned.1))
                .await?;
            print_outcome(&outcome);
        }
        Command::Done { routine_id, effort } => {
            let routine = find_routine(&routines, routine_id).await?;
            let effort = effort.resolve(routine.duration_minutes, routine.calories);
            let outcome = store.complete_ad_hoc(routine.summary(), effort).await?;
            print_outcome(&outcome);
        }
        Command::Reschedule { entry_id, date } => {
            let date = dates::parse_date(&date)?;
            let entry = store.reschedule(entry_id, date).await?;
            println!("Moved {} to {}", entry.routine.name, entry.scheduled_date);
        }
        Command::Remove { entry_id } => {
            store.remove(entry_id).await?;
            println!("Removed {entry_id}");
        }
        Command::Stats => {
            let stats = store.stats().await?;
            println!("Completed workouts: {}", stats.total_completed);
            println!("This week:          {} days", stats.this_week_completed);
            println!("Current streak:     {} days", stats.streak);
            println!("Minutes:            {}", stats.total_minutes);
            println!("Calories:           {}", stats.total_calories);
            println!("Average duration:   {} min", stats.average_duration);
            println!("Average calories:   {} kcal", stats.average_calories);
            println!("Pending due:        {}", store.pending_due_count(dates::today_local()));
        }
        Command::Medals { progress } => {
            let evaluator = store.evaluator();
            if progress {
                for entry in evaluator.progress_towards(store.user_id()).await? {
                    let value = entry
                        .current_value
                        .map(|v| format!(" ({v}/{} {})", entry.medal.requirement_value, entry.medal.requirement_type.unit()))
                        .unwrap_or_default();
                    println!(
                        "{} {:<16} {:>3}%{}",
                        entry.medal.icon, entry.medal.name, entry.percentage, value
                    );
                }
            } else {
                let earned = evaluator.unlocked_medals(store.user_id()).await?;
                if earned.is_empty() {
                    println!("No medals yet.");
                }
                for medal in earned {
                    println!(
                        "{} {} - {} (unlocked {})",
                        medal.medal.icon,
                        medal.medal.name,
                        medal.medal.description,
                        dates::local_date_of(medal.unlocked_at)
                    );
                }
            }
        }
        Command::Routine { .. }
        | Command::User { .. }
        | Command::Config { .. }
        | Command::Session { .. } => {
            bail!("not a schedule command")
        }
    }
    Ok(())
}

async fn run_user(action: UserCommand, manager: UserManager) -> Result<()> {
    match action {
        UserCommand::List { search, role } => {
            let users = manager.list_users(&UserFilter { search, role }).await?;
            let counts = manager.role_counts().await?;
            for user in &users {
                println!("{}  {:<20} {:<28} {}", user.id, user.name, user.email, user.role);
            }
            println!(
                "{} of {} users ({} admins)",
                users.len(),
                counts.total,
                counts.admins
            );
        }
        UserCommand::Add { name, email, role } => {
            let user = manager.register(&name, &email, role).await?;
            println!("Added user {}", user.id);
        }
        UserCommand::Show { id } => {
            let summary = manager.user_summary(id).await?;
            println!("{} <{}> [{}]", summary.user.name, summary.user.email, summary.user.role);
            println!("Scheduled:     {}", summary.scheduled);
            println!("Completed:     {}", summary.completed);
            println!("Pending:       {}", summary.pending);
            println!("Minutes:       {}", summary.total_minutes);
            println!("Calories:      {}", summary.total_calories);
            match summary.last_activity {
                Some(date) => println!("Last activity: {}", dates::format_date(date)),
                None => println!("Last activity: none"),
            }
        }
        UserCommand::Role { id, role } => {
            manager.update_role(id, role).await?;
            println!("User {id} is now {role}");
        }
        UserCommand::Remove { id } => {
            manager.delete_user(id).await?;
            println!("Removed user {id}");
        }
    }
    Ok(())
}

/// Drive a session from stdin: Enter advances, `p` pauses or resumes, `q` finishes.
async fn run_session(
    store: &mut ScheduleStore,
    settings: &SessionSettings,
    entry_id: Uuid,
) -> Result<()> {
    let entry = store
        .entries()
        .iter()
        .find(|e| e.id == entry_id)
        .cloned()
        .ok_or_else(|| anyhow!("scheduled workout {entry_id} not found"))?;
    if entry.is_completed() {
        bail!("{} is already completed", entry.routine.name);
    }

    let mut session = SessionEngine::new(settings);
    session.load(entry.routine.clone());
    session.start()?;
    println!(
        "{}: Enter for next exercise, p to pause or resume, q to finish",
        entry.routine.name
    );
    print_exercise(&session);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut clock = tokio::time::interval(std::time::Duration::from_secs(1));
    clock.tick().await;
    loop {
        tokio::select! {
            _ = clock.tick() => session.tick(),
            line = rx.recv() => match line.as_deref().map(str::trim) {
                None | Some("q") => break,
                Some("p") => {
                    let status = session.toggle_pause()?;
                    let label = if status == SessionStatus::Paused { "Paused" } else { "Resumed" };
                    println!("{label} at {}", session.format_elapsed());
                }
                Some(_) => {
                    if !session.next_exercise()? {
                        break;
                    }
                    print_exercise(&session);
                }
            },
        }
    }

    let effort = session.finish()?;
    let outcome = store.complete(entry_id, Some(effort)).await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_exercise(session: &SessionEngine) {
    if let Some(name) = session.current_exercise() {
        println!(
            "[{}] {} ({}% done, ~{} kcal)",
            session.format_elapsed(),
            name,
            session.exercise_progress(),
            session.estimated_calories()
        );
    }
}

async fn find_routine(routines: &RoutineManager, id: Uuid) -> Result<Routine> {
    routines
        .get_routine(id)
        .await?
        .ok_or_else(|| anyhow!("routine {id} not found"))
}

fn print_day(date: NaiveDate, entries: &[&ScheduledWorkout]) {
    println!("{}", dates::format_date(date));
    if entries.is_empty() {
        println!("  Nothing scheduled.");
    }
    for entry in entries {
        println!(
            "  [{}] {} - {} ({} min)",
            if entry.is_completed() { "x" } else { " " },
            entry.id,
            entry.routine.name,
            entry.routine.duration_minutes
        );
    }
}

fn print_outcome(outcome: &CompletionOutcome) {
    println!(
        "Completed {}: {} min, {} kcal",
        outcome.entry.routine.name, outcome.record.duration_minutes, outcome.record.calories_burned
    );
    for medal in &outcome.unlocked {
        println!("Medal unlocked: {} {}", medal.medal.icon, medal.medal.name);
    }
}
