//! Command-line access to the defect tracker.
//!
//! Works on the same storage as the TUI and is handy for scripting and
//! for recording defects from a phone's shell.
//!
//! ## Usage
//!
//! ```bash
//! mangel-cli projects
//! mangel-cli create "Haus B"
//! mangel-cli upload-plan "Haus B" ~/Pläne/EG.png
//! mangel-cli add "Haus B" --contractor Meier --defect Riss --photo riss.jpg
//! mangel-cli show "Haus B" --full
//! ```

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use mangel::config::Config;
use mangel::record::{parse_date, DATE_FORMAT};
use mangel::{storage, DefectForm, PhotoUpload, PlanMarkup, ProjectStore, Submission};

enum Command {
    Projects,
    Create(String),
    Show { project: String, full: bool },
    Plans(String),
    UploadPlan { project: String, file: PathBuf },
    Add { project: String, options: AddOptions },
}

#[derive(Default)]
struct AddOptions {
    date: Option<String>,
    due: Option<String>,
    contractor: String,
    trade: String,
    defect: String,
    description: String,
    unit: String,
    room: String,
    location: String,
    remarks: String,
    photos: Vec<PathBuf>,
    plan: Option<String>,
    markup: Option<PathBuf>,
}

struct CliArgs {
    config_path: Option<PathBuf>,
    command: Command,
}

fn main() -> Result<()> {
    let args = parse_args();

    init_logging()?;

    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let backend = storage::create_backend(&config.storage).context("Failed to set up storage")?;
    let store = Arc::new(
        ProjectStore::new(backend).with_plan_extensions(config.media.plan_extensions.clone()),
    );

    match args.command {
        Command::Projects => {
            for name in store.list_projects()? {
                println!("{}", name);
            }
        }
        Command::Create(name) => {
            let project = store.create_project(&name)?;
            println!("Neues Projekt '{}' wurde erstellt!", project.name());
        }
        Command::Show { project, full } => {
            let project = store.open_project(&project)?;
            let table = store.load_table(&project)?;
            if full {
                print_records(&table);
            } else {
                print_table(&table);
            }
        }
        Command::Plans(name) => {
            let project = store.open_project(&name)?;
            for plan in store.list_plans(&project)? {
                println!("{}", plan);
            }
        }
        Command::UploadPlan { project, file } => {
            let project = store.open_project(&project)?;
            let filename = file_name(&file)?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let name = store.upload_plan(&project, &filename, &bytes)?;
            println!("Plan '{}' erfolgreich hochgeladen!", name);
        }
        Command::Add { project, options } => {
            let project = store.open_project(&project)?;
            let form = build_form(options)?;
            let submission = Submission::from_config(store.clone(), &config);
            let submitted = submission.submit(&project, &form)?;
            info!("Recorded defect {} via cli", submitted.record.id);
            println!("Mangel erfolgreich hinzugefügt! ID: {}", submitted.record.id);
        }
    }

    Ok(())
}

fn build_form(options: AddOptions) -> Result<DefectForm> {
    let today = Local::now().date_naive();
    let date = |raw: &Option<String>, flag: &str| -> Result<NaiveDate> {
        match raw {
            Some(raw) => parse_date(raw).with_context(|| format!("{}: invalid date '{}'", flag, raw)),
            None => Ok(today),
        }
    };

    let mut form = DefectForm::new(date(&options.date, "--date")?);
    form.due_date = date(&options.due, "--due")?;
    form.contractor = options.contractor;
    form.trade = options.trade;
    form.defect_name = options.defect;
    form.description = options.description;
    form.unit = options.unit;
    form.room = options.room;
    form.location = options.location;
    form.remarks = options.remarks;

    for path in &options.photos {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        form.photos.push(PhotoUpload {
            name: file_name(path)?,
            bytes,
        });
    }

    form.markup = match (options.plan, options.markup) {
        (Some(plan), Some(markup)) => {
            let annotation = image::open(&markup)
                .with_context(|| format!("Failed to read markup {}", markup.display()))?
                .to_rgba8();
            Some(PlanMarkup { plan, annotation })
        }
        (Some(plan), None) => Some(PlanMarkup {
            plan,
            annotation: image::RgbaImage::new(1, 1),
        }),
        (None, Some(_)) => bail!("--markup requires --plan"),
        (None, None) => None,
    };

    Ok(form)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("Not a file: {}", path.display()))
}

fn print_table(table: &mangel::RecordTable) {
    if table.is_empty() {
        println!("Keine Mängel erfasst");
        return;
    }

    println!(
        "{:<6} {:<10} {:<16} {:<12} {:<20} {:<8} {:<10} {:<5} {:<10}",
        "ID", "Datum", "Unternehmer", "Gewerk", "Mangel", "Wohnung", "Zimmer", "Fotos", "Bis"
    );
    for record in table.records() {
        println!(
            "{:<6} {:<10} {:<16} {:<12} {:<20} {:<8} {:<10} {:<5} {:<10}",
            record.id,
            record.capture_date.format(DATE_FORMAT).to_string(),
            truncate(&record.contractor, 16),
            truncate(&record.trade, 12),
            truncate(&record.defect_name, 20),
            truncate(&record.unit, 8),
            truncate(&record.room, 10),
            record.photo_filenames.len(),
            record.due_date.format(DATE_FORMAT).to_string(),
        );
    }
}

/// Every column of every record, one block per defect.
fn print_records(table: &mangel::RecordTable) {
    if table.is_empty() {
        println!("Keine Mängel erfasst");
        return;
    }

    for (i, record) in table.records().iter().enumerate() {
        if i > 0 {
            println!();
        }
        for (header, value) in record.columns() {
            let mut lines = value.lines();
            println!("{:<18} {}", format!("{}:", header), lines.next().unwrap_or(""));
            for line in lines {
                println!("{:<18} {}", "", line);
            }
        }
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut short: String = value.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut options = AddOptions::default();
    let mut full = false;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("mangel-cli {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--full" => full = true,
            "--config" | "-c" | "--date" | "--due" | "--contractor" | "--trade" | "--defect"
            | "--description" | "--unit" | "--room" | "--location" | "--remarks" | "--photo"
            | "--plan" | "--markup" => {
                let Some(value) = args.get(i + 1).cloned() else {
                    eprintln!("Error: {} requires an argument", flag);
                    std::process::exit(1);
                };
                match flag {
                    "--config" | "-c" => config_path = Some(PathBuf::from(value)),
                    "--date" => options.date = Some(value),
                    "--due" => options.due = Some(value),
                    "--contractor" => options.contractor = value,
                    "--trade" => options.trade = value,
                    "--defect" => options.defect = value,
                    "--description" => options.description = value,
                    "--unit" => options.unit = value,
                    "--room" => options.room = value,
                    "--location" => options.location = value,
                    "--remarks" => options.remarks = value,
                    "--photo" => options.photos.push(PathBuf::from(value)),
                    "--plan" => options.plan = Some(value),
                    _ => options.markup = Some(PathBuf::from(value)),
                }
                i += 1;
            }
            _ if flag.starts_with('-') => {
                eprintln!("Unknown argument: {}", flag);
                print_help();
                std::process::exit(1);
            }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }

    let command = match positional.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["projects"] => Command::Projects,
        ["create", name] => Command::Create(name.to_string()),
        ["show", name] => Command::Show {
            project: name.to_string(),
            full,
        },
        ["plans", name] => Command::Plans(name.to_string()),
        ["upload-plan", name, file] => Command::UploadPlan {
            project: name.to_string(),
            file: PathBuf::from(*file),
        },
        ["add", name] => Command::Add {
            project: name.to_string(),
            options,
        },
        _ => {
            print_help();
            std::process::exit(1);
        }
    };

    CliArgs {
        config_path,
        command,
    }
}

fn print_help() {
    println!(
        r#"mangel-cli - record construction defects from the command line

USAGE:
    mangel-cli [OPTIONS] <COMMAND>

COMMANDS:
    projects                    List projects
    create <name>               Create a project with its folders and an empty table
    show <name> [--full]        Print the project's defect table, with --full
                                every column of every defect
    plans <name>                List the project's plans
    upload-plan <name> <file>   Upload a plan image (jpg, jpeg, png)
    add <name> [FIELDS]         Record a defect

FIELDS (add):
    --date DATE                 Capture date (default: today)
    --due DATE                  Due date (default: today)
    --contractor, --trade, --defect, --description,
    --unit, --room, --location, --remarks TEXT
    --photo PATH                Photo to attach, may be repeated
    --plan NAME                 Plan to attach
    --markup PNG                Transparent drawing to flatten onto the plan

    Dates are YYYY-MM-DD or DD.MM.YYYY.

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    MANGEL_CONFIG           Path to config file (overrides default location)
    MANGEL_LOG              Log level (trace, debug, info, warn, error)
    DROPBOX_ACCESS_TOKEN    Dropbox token when storage.backend = "dropbox"
"#
    );
}

fn init_logging() -> Result<()> {
    let filter = tracing_subscriber::filter::EnvFilter::new(
        std::env::var("MANGEL_LOG").unwrap_or_else(|_| "warn".to_string()),
    );
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    Ok(())
}
