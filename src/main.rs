//! Incuport - command-line client for the incubation portal API
//!
//! Encrypts and decrypts payload envelopes, manages the login session,
//! sends requests through the secure interceptor pipeline and renders
//! or exports record lists as a data grid.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use incuport::app::Config;
use incuport::grid::{
    self, DataGrid, ExportFormat, GridLayout, GridView, SortDirection, SortModel,
    EMPTY_MESSAGE,
};
use incuport::http::{ApiClient, ApiRequest, ApiResponse};
use incuport::session::{Session, SessionStore};
use incuport::{HttpError, PayloadCodec, PortalError};

/// Secure client for the incubation portal API
#[derive(Parser, Debug)]
#[command(name = "incuport")]
#[command(author, version, about = "Secure client for the incubation portal API", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "INCUPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "INCUPORT_LOG_LEVEL")]
    log_level: String,

    /// Log file path (enables file logging)
    #[arg(long, global = true, env = "INCUPORT_LOG_FILE")]
    log_file: Option<String>,

    /// Enable JSON structured logging
    #[arg(long, global = true, env = "INCUPORT_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt text into an `iv:ciphertext` envelope
    Encrypt {
        text: String,
    },

    /// Decrypt an `iv:ciphertext` envelope
    Decrypt {
        envelope: String,
    },

    /// Store login credentials for later requests
    Login {
        #[arg(long, env = "INCUPORT_TOKEN")]
        token: String,

        #[arg(long)]
        user_id: String,

        #[arg(long)]
        role_id: Option<String>,

        #[arg(long)]
        incubatee_user_id: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the stored session
    Whoami,

    /// Send a request through the secure pipeline
    Request(RequestArgs),

    /// Render or export records as a data grid
    Grid(GridArgs),

    /// Print the default configuration as TOML
    GenerateConfig,

    /// Validate the configuration and exit
    ValidateConfig,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// HTTP method
    method: String,

    /// Path relative to the API base URL (or an absolute URL)
    path: String,

    /// JSON body
    #[arg(long)]
    data: Option<String>,

    /// Query parameter (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    params: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct GridArgs {
    /// JSON file holding a list of records (or `{ "data": [...] }`)
    #[arg(long, required_unless_present = "endpoint", conflicts_with = "endpoint")]
    records: Option<PathBuf>,

    /// Fetch records from this API path instead of a file
    #[arg(long)]
    endpoint: Option<String>,

    /// Grid layout file (TOML, or JSON with a `.json` extension)
    #[arg(long)]
    layout: PathBuf,

    /// Search term
    #[arg(long)]
    search: Option<String>,

    /// Dropdown filter selection (repeatable)
    #[arg(long = "filter", value_name = "FIELD=VALUE", value_parser = parse_key_val)]
    filters: Vec<(String, String)>,

    /// Column substring filter (repeatable)
    #[arg(long = "column-filter", value_name = "FIELD=VALUE", value_parser = parse_key_val)]
    column_filters: Vec<(String, String)>,

    /// Sort column, optionally suffixed with `:asc` or `:desc`
    #[arg(long, value_name = "FIELD[:DIR]")]
    sort: Option<String>,

    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    page: usize,

    /// Rows per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Export the filtered rows instead of printing a page
    #[arg(long, value_enum)]
    export: Option<ExportFormat>,

    /// Export directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the page as JSON
    #[arg(long)]
    json: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::GenerateConfig = cli.command {
        return generate_default_config();
    }

    init_logging(&cli)?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting incuport");

    let config = load_config(&cli)?;

    match cli.command {
        Command::GenerateConfig => Ok(()),
        Command::ValidateConfig => {
            println!("Configuration is valid");
            Ok(())
        }
        Command::Encrypt { text } => {
            let codec = PayloadCodec::new(&config.crypto.key)?;
            println!("{}", codec.encrypt(&text)?);
            Ok(())
        }
        Command::Decrypt { envelope } => {
            let codec = PayloadCodec::new(&config.crypto.key)?;
            println!("{}", codec.decrypt(&envelope)?);
            Ok(())
        }
        Command::Login {
            token,
            user_id,
            role_id,
            incubatee_user_id,
        } => {
            let mut session = Session::new(&token, &user_id);
            if let Some(role_id) = &role_id {
                session = session.with_role(role_id);
            }
            if let Some(incubatee_user_id) = &incubatee_user_id {
                session = session.with_incubatee_user(incubatee_user_id);
            }
            open_session(&config)?.init(session)?;
            println!("Logged in as {}", user_id);
            Ok(())
        }
        Command::Logout => {
            open_session(&config)?.clear()?;
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            whoami(&open_session(&config)?);
            Ok(())
        }
        Command::Request(args) => run_request(&config, args).await,
        Command::Grid(args) => run_grid(&config, args).await,
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if let Some(log_path) = &cli.log_file {
        // File-based logging with rotation
        let file_appender = if log_path.contains('/') || log_path.contains('\\') {
            let path = Path::new(log_path);
            let dir = path.parent().unwrap_or(Path::new("."));
            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("incuport.log");
            RollingFileAppender::new(Rotation::DAILY, dir, filename)
        } else {
            let log_dir = Config::data_dir()
                .map(|d| d.join("logs"))
                .unwrap_or_else(|_| PathBuf::from("."));
            std::fs::create_dir_all(&log_dir).ok();
            RollingFileAppender::new(Rotation::DAILY, log_dir, log_path)
        };

        if cli.log_json {
            let file_layer = fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false);
            subscriber.with(file_layer).init();
        } else {
            let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);
            subscriber.with(file_layer).init();
        }
    } else if cli.log_json {
        // Keep stdout for command output
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Load and validate configuration
fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Generate default configuration file
fn generate_default_config() -> Result<()> {
    let toml = Config::default()
        .to_toml()
        .context("Failed to serialize configuration")?;

    println!("{}", toml);
    Ok(())
}

fn open_session(config: &Config) -> Result<SessionStore> {
    let path = config.session_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create session directory {}", dir.display()))?;
    }
    Ok(SessionStore::open(path)?)
}

fn whoami(store: &SessionStore) {
    let session = store.read();
    if !store.is_active() {
        println!("Not logged in");
        return;
    }

    let token: String = session.token.as_deref().unwrap_or("").chars().take(8).collect();
    println!("User:      {}", session.user_id.as_deref().unwrap_or("-"));
    println!("Role:      {}", session.role_id.as_deref().unwrap_or("-"));
    if let Some(incubatee) = &session.incubatee_user_id {
        println!("Incubatee: {}", incubatee);
    }
    println!("Token:     {}...", token);
}

fn client(config: &Config) -> Result<ApiClient> {
    let session = open_session(config)?;
    ApiClient::new(config, session).map_err(|e| anyhow::anyhow!(e.user_message()))
}

/// Turn a pipeline failure into a CLI error, echoing any error body
fn report(error: PortalError) -> anyhow::Error {
    match &error {
        PortalError::Http(HttpError::SessionExpired { .. }) => {
            anyhow::anyhow!("Session expired. Log in again with `incuport login`.")
        }
        PortalError::Http(e @ HttpError::Status { .. }) => {
            if let Some(response) = e.response() {
                eprintln!("{}", render_body(response));
            }
            anyhow::anyhow!(error.user_message())
        }
        _ => anyhow::anyhow!(error.user_message()),
    }
}

fn render_body(response: &ApiResponse) -> String {
    match response.json_value() {
        Some(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.body_text()),
        None => response.body_text(),
    }
}

async fn run_request(config: &Config, args: RequestArgs) -> Result<()> {
    let method = args.method.to_uppercase();
    let body: Option<Value> = args
        .data
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("--data is not valid JSON")?;
    let params: Map<String, Value> = args
        .params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    let client = client(config)?;
    let response = match (method.as_str(), body) {
        ("GET", None) => client.get(&args.path, params).await,
        ("DELETE", None) => client.delete(&args.path, params).await,
        ("POST", Some(body)) if params.is_empty() => client.post(&args.path, body).await,
        ("PUT", Some(body)) if params.is_empty() => client.put(&args.path, body).await,
        (_, body) => {
            let mut request = ApiRequest::builder().method(&method).path(&args.path);
            if let Some(body) = body {
                request = request.json(body);
            }
            let mut request = request.build();
            request.params = params;
            client.execute(request).await
        }
    }
    .map_err(report)?;

    println!("{}", render_body(&response));
    Ok(())
}

async fn run_grid(config: &Config, args: GridArgs) -> Result<()> {
    let layout = GridLayout::load(&args.layout)
        .with_context(|| format!("Failed to load layout {}", args.layout.display()))?;
    let export_filename = layout
        .export_filename
        .clone()
        .unwrap_or_else(|| config.export.filename.clone());

    let mut spec = layout.into_spec().page_sizes(
        config.grid.default_page_size,
        config.grid.page_size_options.clone(),
    );
    spec.export_filename = export_filename;
    spec.sheet_name = config.export.sheet_name.clone();

    let records = match (&args.records, &args.endpoint) {
        (Some(path), _) => grid::read_records(path)?,
        (None, Some(endpoint)) => client(config)?
            .fetch_list(endpoint, Map::new())
            .await
            .map_err(report)?
            .into_iter()
            .filter_map(grid::from_value)
            .collect(),
        (None, None) => anyhow::bail!("Either --records or --endpoint is required"),
    };

    let mut data_grid = DataGrid::new(spec, records);
    apply_grid_args(&mut data_grid, &args)?;

    if let Some(format) = args.export {
        return export_grid(config, &data_grid, format, args.out.as_deref());
    }

    let view = data_grid.view();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&data_grid, &view);
    }
    Ok(())
}

fn apply_grid_args(data_grid: &mut DataGrid, args: &GridArgs) -> Result<()> {
    if let Some(size) = args.page_size {
        if !data_grid.spec().page_size_options.contains(&size) {
            anyhow::bail!(
                "Page size {} is not one of {:?}",
                size,
                data_grid.spec().page_size_options
            );
        }
        data_grid.state_mut().set_page_size(size);
    }

    if let Some(term) = &args.search {
        data_grid.state_mut().set_search(term);
    }

    for (field, value) in &args.filters {
        let filter = data_grid
            .spec()
            .dropdown_filters
            .iter()
            .find(|f| &f.field == field)
            .cloned()
            .with_context(|| format!("No dropdown filter on '{}'", field))?;
        let resolved = data_grid.resolved_filter(&filter);
        if !resolved.accepts(value) {
            let menu = resolved.menu();
            let choices: Vec<&str> = menu.iter().map(|o| o.value.as_str()).collect();
            anyhow::bail!("'{}' is not an option of '{}' ({})", value, field, choices.join(", "));
        }
        data_grid.state_mut().select_dropdown(field, value);
    }

    for (field, value) in &args.column_filters {
        let filterable = data_grid.spec().enable_column_filters
            && data_grid
                .spec()
                .columns
                .iter()
                .any(|c| &c.field == field && c.is_filterable());
        if !filterable {
            anyhow::bail!("Column '{}' cannot be filtered", field);
        }
        data_grid.state_mut().set_column_filter(field, value);
    }

    if let Some(sort) = &args.sort {
        let (field, direction) = match sort.split_once(':') {
            Some((field, dir)) => (field, dir.parse::<SortDirection>().map_err(anyhow::Error::msg)?),
            None => (sort.as_str(), SortDirection::Asc),
        };
        data_grid
            .state_mut()
            .set_sort(Some(SortModel::new(field, direction)));
    }

    // Pages are 1-based on the command line
    data_grid.state_mut().set_page(args.page.saturating_sub(1));
    Ok(())
}

fn export_grid(
    config: &Config,
    data_grid: &DataGrid,
    format: ExportFormat,
    out: Option<&Path>,
) -> Result<()> {
    if !data_grid.spec().enable_export {
        anyhow::bail!("Export is disabled for this grid");
    }

    let artifact = data_grid.export(format, chrono::Local::now().date_naive());
    if artifact.format != format {
        eprintln!(
            "{} export unavailable, wrote {} instead",
            format.extension(),
            artifact.format.extension()
        );
    }

    let dir = out
        .map(Path::to_path_buf)
        .or_else(|| config.export.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let path = artifact.write_to(&dir)?;
    tracing::info!(
        path = %path.display(),
        mime = artifact.format.mime_type(),
        bytes = artifact.bytes.len(),
        "Exported grid"
    );
    println!("{}", path.display());
    Ok(())
}

fn print_view(data_grid: &DataGrid, view: &GridView<'_>) {
    let spec = data_grid.spec();
    if let Some(title) = &spec.title {
        println!("{}\n", title);
    }
    match data_grid.state().search_term() {
        "" => println!("[{}]\n", spec.search_placeholder),
        term => println!("Search: {}\n", term),
    }

    let headers: Vec<&str> = view.columns.iter().map(|c| c.header_name.as_str()).collect();
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| row.cells.iter().map(|c| c.display_text()).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(headers));
    if rows.is_empty() {
        println!("{}", EMPTY_MESSAGE);
    }
    for row in &rows {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
    println!("\n{}", view.summary());
}
