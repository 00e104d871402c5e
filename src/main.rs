use anyhow::{Context, Result};
use campus_assets::ai::{self, AssistantMode};
use campus_assets::api::auth::{self, Registration};
use campus_assets::api::{format_api_error, ApiClient, ApiError, SessionStore};
use campus_assets::app::ResourceListView;
use campus_assets::config::Config;
use campus_assets::resource::{
    ExportFormat, FilterKey, Resource, ResourceClient, ResourceFields,
};
use campus_assets::transfer::{ReportKind, TransferOrchestrator, UploadKind, UploadRequest};
use campus_assets::VERSION;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the Campus Assets backend
#[derive(Parser, Debug)]
#[command(name = "campus-assets", version = VERSION, about, long_about = None)]
struct Args {
    /// Backend base URL (overrides CAMPUS_ASSETS_BACKEND_URL and the config file)
    #[arg(short, long, global = true)]
    backend: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange an identity-provider ID token for a backend session
    Login {
        /// ID token (falls back to CAMPUS_ASSETS_ID_TOKEN)
        #[arg(long, env = "CAMPUS_ASSETS_ID_TOKEN")]
        id_token: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAMPUS_ASSETS_PASSWORD")]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// End the current session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List resources with optional search, filters and paging
    List(ListArgs),
    /// Show one resource
    Show { id: String },
    /// Create a resource
    Create(FieldArgs),
    /// Update a resource; omitted fields keep their current value
    Update {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a resource
    Delete { id: String },
    /// Dashboard statistics
    Stats,
    /// Values available for the location and department filters
    Options,
    /// Download the full inventory
    Export {
        #[arg(value_parser = parse_export_format)]
        format: ExportFormat,
        /// Target directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Bulk import a CSV or Excel file
    Import {
        file: PathBuf,
        /// Importer to use; guessed from the extension when omitted
        #[arg(long, value_parser = parse_upload_kind)]
        kind: Option<UploadKind>,
        /// Parent department label applied to every imported row
        #[arg(long)]
        parent_department: Option<String>,
    },
    /// Download a PDF report
    Report {
        #[arg(value_parser = parse_report_kind)]
        kind: ReportKind,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Ask the AI assistant a question
    Chat { message: Vec<String> },
    /// Create, update or delete resources with a natural-language instruction
    Crud { instruction: Vec<String> },
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Free-text search
    #[arg(short, long, default_value = "")]
    search: String,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    parent_department: Option<String>,
    #[arg(long)]
    cost_min: Option<String>,
    #[arg(long)]
    cost_max: Option<String>,
    /// Page to show (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: u32,
}

#[derive(ClapArgs, Debug, Default)]
struct FieldArgs {
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    sl_no: Option<String>,
    #[arg(long)]
    service_tag: Option<String>,
    #[arg(long)]
    identification_number: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    procurement_date: Option<String>,
    #[arg(long)]
    cost: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    parent_department: Option<String>,
}

impl FieldArgs {
    /// Overlay the given values on `base`
    fn apply_to(&self, mut base: ResourceFields) -> ResourceFields {
        let slots = [
            (&self.description, &mut base.description),
            (&self.sl_no, &mut base.sl_no),
            (&self.service_tag, &mut base.service_tag),
            (&self.identification_number, &mut base.identification_number),
            (&self.procurement_date, &mut base.procurement_date),
            (&self.cost, &mut base.cost),
            (&self.location, &mut base.location),
            (&self.department, &mut base.department),
            (&self.parent_department, &mut base.parent_department),
        ];
        for (value, slot) in slots {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        base
    }
}

fn parse_export_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
}

fn parse_upload_kind(s: &str) -> Result<UploadKind, String> {
    s.parse()
}

fn parse_report_kind(s: &str) -> Result<ReportKind, String> {
    s.parse()
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("campus-assets {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(dir) = Config::config_dir() {
        return dir.join("campus-assets.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".campus-assets").join("campus-assets.log");
    }
    PathBuf::from("campus-assets.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {err:#}");
            None
        }
    };

    if let Err(err) = run(args).await {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Unauthenticated) => {
                eprintln!("Error: not logged in or session expired. Run `campus-assets login`.")
            }
            Some(api_err) => eprintln!("Error: {}", format_api_error(api_err)),
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load();
    let backend = config.effective_backend_url(args.backend.as_deref());
    tracing::info!("Using backend: {}", backend);

    let api = ApiClient::with_timeout(&backend, SessionStore::load_default(), config.timeout())?;

    match args.command {
        Command::Login { id_token } => {
            let session = auth::login(&api, &id_token).await?;
            match session.user {
                Some(user) => println!(
                    "Logged in as {} ({})",
                    user.display_name(),
                    user.role.as_deref().unwrap_or("user")
                ),
                None => println!("Logged in"),
            }
        }
        Command::Register {
            email,
            password,
            name,
            role,
        } => {
            let registration = Registration {
                email,
                password,
                name,
                role,
            };
            println!("{}", auth::register(&api, &registration).await?);
        }
        Command::Logout => {
            auth::logout(&api).await?;
            println!("Logged out");
        }
        Command::Whoami => {
            let user = auth::profile(&api).await?;
            println!(
                "{} <{}>",
                user.display_name(),
                user.email.as_deref().unwrap_or("-")
            );
            println!("Role: {}", user.role.as_deref().unwrap_or("-"));
        }
        Command::List(list) => run_list(ResourceClient::new(api), &config, list).await?,
        Command::Show { id } => {
            let resource = ResourceClient::new(api).get(&id).await?;
            print_resource(&resource);
        }
        Command::Create(fields) => {
            let fields = fields.apply_to(ResourceFields::default());
            let created = ResourceClient::new(api).create(&fields).await?;
            println!("Created resource {}", created.id);
            print_resource(&created);
        }
        Command::Update { id, fields } => {
            let client = ResourceClient::new(api);
            let current = client.get(&id).await?;
            let updated = client.update(&id, &fields.apply_to(current.to_fields())).await?;
            println!("Updated resource {}", updated.id);
            print_resource(&updated);
        }
        Command::Delete { id } => {
            ResourceClient::new(api).remove(&id).await?;
            println!("Deleted resource {}", id);
        }
        Command::Stats => {
            let client = ResourceClient::new(api);
            let (stats, recent) = futures::join!(client.stats(), client.recent(5));
            let stats = stats?;
            println!("Total resources:  {}", stats.total_resources);
            println!("Added this week:  {}", stats.recent_additions);
            println!("Total cost:       {:.2}", stats.total_cost);
            println!(
                "Cost coverage:    {}% ({} excluded)",
                stats.cost_coverage_percent(),
                stats.excluded_from_cost
            );
            println!(
                "Cost avg/min/max: {:.2} / {:.2} / {:.2}",
                stats.cost_statistics.average_cost,
                stats.cost_statistics.min_cost,
                stats.cost_statistics.max_cost
            );
            for (title, groups) in [
                ("Departments", &stats.department_stats),
                ("Parent departments", &stats.parent_department_stats),
                ("Locations", &stats.location_stats),
            ] {
                if groups.is_empty() {
                    continue;
                }
                println!("\n{}:", title);
                for group in groups {
                    println!("  {:<30} {}", group.label, group.count);
                }
            }
            match recent {
                Ok(resources) if !resources.is_empty() => {
                    println!("\nRecent resources:");
                    for resource in resources {
                        println!(
                            "  {:<26} {:<32} {}",
                            resource.id,
                            truncate(&resource.description, 32),
                            resource.created_at.as_deref().unwrap_or("-")
                        );
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to fetch recent resources: {}", e),
            }
        }
        Command::Options => {
            let options = ResourceClient::new(api).filter_options().await?;
            println!("Locations:          {}", options.locations.join(", "));
            println!("Departments:        {}", options.departments.join(", "));
            println!("Parent departments: {}", options.parent_departments.join(", "));
        }
        Command::Export { format, out } => {
            let path = TransferOrchestrator::new(api).download(format, &out).await?;
            println!("Saved {}", path.display());
        }
        Command::Import {
            file,
            kind,
            parent_department,
        } => {
            let kind = kind
                .or_else(|| UploadKind::from_path(&file))
                .context("Cannot tell the file type; pass --kind csv or --kind excel")?;
            let mut request = UploadRequest::new(file, kind);
            if let Some(label) = parent_department {
                request = request.with_parent_department(label);
            }
            let orchestrator = TransferOrchestrator::new(api)
                .with_result_display(config.upload_result_display())
                .require_parent_department(config.require_parent_department);
            run_import(&orchestrator, request).await?;
        }
        Command::Report { kind, out } => {
            let path = TransferOrchestrator::new(api)
                .download_report(kind, &out)
                .await?;
            println!("Saved {}", path.display());
        }
        Command::Chat { message } => {
            let reply = ai::chat(&api, &message.join(" ")).await?;
            println!("{}", reply.text);
        }
        Command::Crud { instruction } => {
            let mut conversation = ai::Conversation::new(AssistantMode::Crud);
            let reply = conversation.send(&api, &instruction.join(" ")).await?;
            println!("{}", reply.content);
        }
    }

    Ok(())
}

async fn run_list(client: ResourceClient, config: &Config, list: ListArgs) -> Result<()> {
    let mut view = ResourceListView::new(config.page_size).with_window(config.page_window);
    view.set_search(&list.search);
    for (key, value) in [
        (FilterKey::Location, &list.location),
        (FilterKey::Department, &list.department),
        (FilterKey::ParentDepartment, &list.parent_department),
        (FilterKey::CostMin, &list.cost_min),
        (FilterKey::CostMax, &list.cost_max),
    ] {
        if let Some(value) = value {
            view.set_filter(key, value);
        }
    }

    view.refresh(&client).await;
    if list.page > 1 {
        // The page count is only known after the first response
        if view.go_to(list.page) {
            view.refresh(&client).await;
        } else if view.error_message.is_none() {
            eprintln!(
                "Page {} is out of range ({} pages), showing page {}",
                list.page,
                view.pagination.pages(),
                view.pagination.page()
            );
        }
    }

    if view.session_expired {
        return Err(ApiError::Unauthenticated.into());
    }
    if let Some(message) = &view.error_message {
        anyhow::bail!("{}", message);
    }

    if view.resources.is_empty() {
        println!("No resources found");
        return Ok(());
    }

    println!(
        "{:<26} {:<32} {:<16} {:<20} {:>12}",
        "ID", "DESCRIPTION", "LOCATION", "DEPARTMENT", "COST"
    );
    for resource in &view.resources {
        println!(
            "{:<26} {:<32} {:<16} {:<20} {:>12}",
            resource.id,
            truncate(&resource.description, 32),
            truncate(&resource.location, 16),
            truncate(&resource.department, 20),
            format_cost(resource.cost)
        );
    }

    let pages: Vec<String> = view
        .pagination
        .page_numbers()
        .into_iter()
        .map(|n| {
            if n == view.pagination.page() {
                format!("[{}]", n)
            } else {
                n.to_string()
            }
        })
        .collect();
    println!("\n{}    pages: {}", view.pagination.range_label(), pages.join(" "));
    if view.pagination.has_next() {
        println!("More results: --page {}", view.pagination.page() + 1);
    }
    Ok(())
}

async fn run_import(orchestrator: &TransferOrchestrator, request: UploadRequest) -> Result<()> {
    let upload = orchestrator.upload(request);
    tokio::pin!(upload);
    let mut poll = tokio::time::interval(Duration::from_millis(250));

    let result = loop {
        tokio::select! {
            result = &mut upload => break result?,
            _ = poll.tick() => {
                let state = orchestrator.state().await;
                if state.is_uploading() {
                    eprint!("\rUploading... {:>3}%", state.progress());
                }
            }
        }
    };
    eprintln!("\rUploading... 100%");

    if let Some(format) = result.format_type() {
        println!("Detected format: {}", format.description());
    }
    println!("{}", result.summary());
    for error in result.errors() {
        println!("  - {}", error);
    }
    // Printed already; nothing left to display
    orchestrator.dismiss().await;
    if !result.success {
        anyhow::bail!("Import failed");
    }
    Ok(())
}

fn print_resource(resource: &Resource) {
    let rows = [
        ("ID", resource.id.as_str()),
        ("Serial no.", resource.sl_no.as_str()),
        ("Description", resource.description.as_str()),
        ("Service tag", resource.service_tag.as_str()),
        ("Identification no.", resource.identification_number.as_str()),
        ("Procurement date", resource.procurement_day()),
        ("Location", resource.location.as_str()),
        ("Department", resource.department.as_str()),
        ("Parent department", resource.parent_department.as_str()),
    ];
    for (label, value) in rows {
        println!("{:<20} {}", label, if value.is_empty() { "-" } else { value });
    }
    println!("{:<20} {}", "Cost", format_cost(resource.cost));
}

fn format_cost(cost: Option<f64>) -> String {
    cost.map(|c| format!("{:.2}", c))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
