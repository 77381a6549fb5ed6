use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use gridview::domain::{TVConfig, TVError};
use gridview::loader::expand_path;
use gridview::query::PageSize;
use model::{Model, Status};
use ui::TableUI;

/// Browse, filter, edit and export tabular records in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Data file (csv, parquet, arrow/ipc/feather or json)
    path: String,

    /// Column configuration (json array of column definitions)
    #[arg(short, long)]
    columns: Option<String>,

    /// Table title, also used for export file names
    #[arg(short, long, default_value = "Organization Management")]
    title: String,

    #[arg(long, default_value = "Add New")]
    add_button_text: String,

    /// Rows per page: 5, 10, 20 or 50
    #[arg(long, default_value_t = 10, value_parser = parse_page_size)]
    page_size: usize,

    /// Directory csv exports are written to
    #[arg(long, default_value = ".")]
    export_dir: String,

    #[arg(long, default_value = "gridview.log")]
    log_file: String,

    /// chrono format string for date columns
    #[arg(long, default_value = "%Y-%m-%d")]
    date_format: String,

    /// Days ahead a maintenance date counts as due soon
    #[arg(long, default_value_t = 7)]
    due_soon_days: i64,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn parse_page_size(s: &str) -> Result<usize, String> {
    let size: usize = s.parse().map_err(|_| format!("{s} is not a number"))?;
    PageSize::from_usize(size)
        .map(PageSize::get)
        .ok_or_else(|| format!("page size must be one of 5, 10, 20, 50 (got {size})"))
}

impl Args {
    fn config(&self) -> Result<TVConfig, TVError> {
        Ok(TVConfig {
            event_poll_time: self.poll_ms,
            title: self.title.clone(),
            add_button_text: self.add_button_text.clone(),
            page_size: PageSize::from_usize(self.page_size).unwrap_or_default(),
            export_dir: expand_path(&self.export_dir)?,
            date_format: self.date_format.clone(),
            due_soon_days: self.due_soon_days,
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            ratatui::restore();
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

// The terminal belongs to the ui, so logs go to a file.
fn init_tracing(log_file: &str) -> Result<(), TVError> {
    let file = File::create(expand_path(log_file)?)?;
    let filter = EnvFilter::try_from_env("GRIDVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), TVError> {
    init_tracing(&args.log_file)?;
    let cfg = args.config()?;
    let data_path = expand_path(&args.path)?;
    let column_path = args.columns.as_deref().map(expand_path).transpose()?;
    info!("Starting gridview on {} ...", data_path.display());

    let mut model = Model::init(&cfg);
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    terminal.draw(|f| ui.draw(&model, f))?;
    model.load_data_file(data_path, column_path)?;

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        };
    }

    info!("Bye!");
    Ok(())
}
