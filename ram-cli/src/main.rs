use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ram_core::{
    Action, Agenda, Classifier, Dashboard, EnergyLevel, HistoryStore, Item, ItemStore, ItemType, JsonStore,
    Language, Sequencer, UserState, commit_interaction, local_today,
};
use tracing_subscriber::EnvFilter;

mod auth;
mod calendar;
mod config;
mod llm;
mod nudges;
mod setup;
mod state;
mod tunnel;

use crate::config::{Config, load_config};
use crate::llm::Backend;
use crate::state::open_store;

#[derive(Parser, Debug)]
#[command(
    name = "ram",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RAM_BUILD_SHA"), ")"),
    about = "RAM: an external brain that hands you one task at a time"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Onboarding quiz: language, name and your brain persona
    Setup,

    /// Dump whatever is on your mind; it gets sorted for you
    Dump {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Dashboard: open tasks, thoughts and recent dumps
    List {
        /// Show every recent item instead of the latest few
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Print the ranked task queue for an energy level, with scores
    Rank {
        #[arg(long)]
        energy: EnergyLevel,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Focus mode: one task at a time
    Tunnel {
        /// Skip the energy picker
        #[arg(long)]
        energy: Option<EnergyLevel>,
    },

    /// Mark a task done outside the tunnel
    Done { id: String },

    /// Log a skip outside the tunnel
    Skip { id: String },

    /// Dated items grouped by overdue / today / tomorrow / upcoming
    Agenda {
        /// Write an ICS calendar to stdout instead
        #[arg(long, default_value_t = false)]
        ics: bool,
    },

    /// Idea garden: sprouts, clustered groves and wildflowers
    Ideas {
        /// Ignore the cached clusters
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },

    /// Look for recurring thought loops
    Loops {
        /// Ignore the cooldown
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Turn an idea into a high-urgency task
    Promote { id: String },

    /// Delete an item for good
    Delete { id: String },

    /// Change the response language (en, es, pt, ru)
    Language { code: Language },

    /// Print a gentle reminder if one is due
    Nudge,

    /// Forget everything: items, history, profile, caches
    Reset {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.ram/config.toml with defaults
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Store an API key for the model endpoint
    PasteApiKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
        Command::Auth { command } => match command {
            AuthCommand::PasteApiKey => auth::paste_api_key()?,
        },
        command => {
            let cfg = load_config()?;
            run(command, &cfg)?;
        }
    }

    Ok(())
}

fn run(command: Command, cfg: &Config) -> Result<()> {
    let mut store = open_store()?;
    let classifier = Classifier::new(Backend::from_config(&cfg.llm)?);
    let sequencer = Sequencer::new(cfg.sequencer);
    let policy = cfg.reminders.policy();

    match command {
        Command::Setup => setup::run_setup(&classifier)?,

        Command::Dump { text } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                bail!("nothing to dump");
            }
            if !classifier.model().is_configured() {
                eprintln!("(no model configured; filing as a thought. Run: ram auth paste-api-key)");
            }
            let user = load_user(&store)?;
            let now = Utc::now();
            let item = classifier
                .process_brain_dump(&text, user.language, now)
                .into_item(uuid::Uuid::new_v4().to_string(), &text, now);
            print_dumped(&item);
            store.add_item(item)?;

            if classifier.model().is_configured() {
                let items = store.items()?;
                let mut cache = state::read_cache()?;
                let outcome = nudges::check_loops(&classifier, &items, &user, &policy, &mut cache, false, now);
                state::write_cache(&cache)?;
                if let nudges::LoopCheck::Found(l) = outcome {
                    println!();
                    nudges::print_loop(&l, &items);
                }
            }
        }

        Command::List { all } => print_dashboard(&Dashboard::build(&store.items()?, all)),

        Command::Rank { energy, limit } => {
            let ranked = sequencer.rank_scored(store.list_active_tasks()?, energy, &store.get()?);
            if ranked.is_empty() {
                println!("No open tasks.");
            }
            for (i, s) in ranked.iter().take(limit).enumerate() {
                println!(
                    "{:>2}. [{:>4}] {}  (urgency {} + match {} + penalty {})  [{}]",
                    i + 1,
                    s.score.total(),
                    s.task.processed_text,
                    s.score.urgency,
                    s.score.energy_match,
                    s.score.penalty,
                    s.task.id
                );
            }
        }

        Command::Tunnel { energy } => {
            let done = tunnel::run_tunnel(store, sequencer, energy)?;
            println!("Tunnel closed. Completed {done} task(s).");
        }

        Command::Done { id } => log_outside_tunnel(&mut store, cfg, &id, Action::Completed)?,
        Command::Skip { id } => log_outside_tunnel(&mut store, cfg, &id, Action::Skipped)?,

        Command::Agenda { ics } => {
            let today = local_today(&cfg.reminders.timezone, Utc::now())?;
            let agenda = Agenda::build(&store.items()?, today);
            if ics {
                print!("{}", calendar::events_to_ics(&calendar::agenda_to_events(&agenda), Utc::now()));
            } else if agenda.is_empty() {
                println!("Nothing scheduled. Dumps with a date (\"tomorrow\", \"friday\") show up here.");
            } else {
                for (title, items) in agenda.sections() {
                    if items.is_empty() {
                        continue;
                    }
                    println!("## {title}");
                    for i in items {
                        let date = i.estimated_date.map(|d| d.to_string()).unwrap_or_default();
                        println!("- {date}  {}  [{}]", i.processed_text, i.id);
                    }
                    println!();
                }
            }
        }

        Command::Ideas { refresh } => {
            let user = load_user(&store)?;
            nudges::run_ideas(&classifier, &store.items()?, &user, &policy, refresh)?;
        }

        Command::Loops { force } => {
            let user = load_user(&store)?;
            nudges::run_loops(&classifier, &store.items()?, &user, &policy, force)?;
        }

        Command::Promote { id } => {
            let item = find_item(&store, &id)?;
            if item.item_type != ItemType::Idea {
                bail!("{id} is a {:?}, only ideas can be promoted", item.item_type);
            }
            store.promote_idea(&id)?;
            println!("Promoted to a HIGH urgency task: {}", item.processed_text);
        }

        Command::Delete { id } => {
            if !store.delete_item(&id)? {
                bail!("no item with id {id}");
            }
            println!("Deleted {id}");
        }

        Command::Language { code } => {
            let mut user = load_user(&store)?;
            user.language = code;
            store.save_user(&user)?;
            println!("Language set to {}", code.code());
        }

        Command::Nudge => nudges::run_nudge(&policy)?,

        Command::Reset { yes } => {
            if !yes {
                bail!("this deletes every item and your history; re-run with --yes");
            }
            store.clear()?;
            state::clear_cache()?;
            println!("Memory wiped. Run `ram setup` to start over.");
        }

        Command::Config { .. } | Command::Auth { .. } => unreachable!("handled in main"),
    }

    Ok(())
}

fn load_user(store: &JsonStore) -> Result<UserState> {
    Ok(store.load_user()?.unwrap_or_else(UserState::anonymous))
}

fn find_item(store: &JsonStore, id: &str) -> Result<Item> {
    store.find(id)?.with_context(|| format!("no item with id {id}"))
}

fn log_outside_tunnel(store: &mut JsonStore, cfg: &Config, id: &str, action: Action) -> Result<()> {
    let task = find_item(store, id)?;
    if !task.is_active_task() {
        bail!("{id} is not an open task");
    }
    commit_interaction(store, &task, action, Utc::now(), cfg.sequencer.history_cap)?;
    if action == Action::Completed {
        println!("Done: {}", task.processed_text);
    } else {
        println!("Skipped: {}", task.processed_text);
    }
    Ok(())
}

fn print_dumped(item: &Item) {
    if item.is_discarded {
        println!("Filtered out as noise. Nothing to keep.");
        return;
    }
    println!(
        "Saved as {:?}: {}  (energy {}, urgency {})",
        item.item_type,
        item.processed_text,
        item.energy.as_str(),
        item.urgency.as_str()
    );
    if let Some(d) = item.estimated_date {
        println!("  date: {d}");
    }
    if !item.tags.is_empty() {
        println!("  tags: {}", item.tags.join(", "));
    }
    println!("  id: {}", item.id);
}

fn print_dashboard(d: &Dashboard) {
    println!("## Tasks ({})", d.active_tasks.len());
    for t in &d.active_tasks {
        println!("- [{}/{}] {}  [{}]", t.energy.as_str(), t.urgency.as_str(), t.processed_text, t.id);
    }
    println!("\n## Thoughts & ideas ({})", d.thoughts.len());
    for t in &d.thoughts {
        println!("- {:?}: {}  [{}]", t.item_type, t.processed_text, t.id);
    }
    println!("\n## Recent");
    for r in &d.recent {
        let mark = if r.is_completed() { "x" } else { " " };
        println!("[{mark}] {}  ({})", r.processed_text, r.created_at.format("%b %d %H:%M"));
    }
    if d.hidden_recent > 0 {
        println!("... {} more (use --all)", d.hidden_recent);
    }
}
