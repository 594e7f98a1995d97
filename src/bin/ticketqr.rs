use chrono::{Duration as ChronoDuration, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use ticket_qr::catalog::{EventCatalog, JsonTicketStore, StaticCatalog, TicketFilter, TicketStore};
use ticket_qr::compositor::{DirectorySink, ExportOutcome, TicketExporter, compose};
use ticket_qr::config::{Settings, debug_enabled};
use ticket_qr::detector::{FinderDetector, binarize_frame};
use ticket_qr::encoder::TicketCodeGenerator;
use ticket_qr::models::{EventMeta, TicketRecord};
use ticket_qr::scanner::{
    FinderGate, FrameDecoder, ImageSequenceCamera, ScanLoop, ScanResult, Scanner, SimulatedDecoder,
    ValidationPolicy, Validator, evaluate,
};
use ticket_qr::tools::{binary_stats, grayscale_stats, load_rgba};
use ticket_qr::utils::grayscale::frame_to_grayscale;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "ticketqr", version, about = "Blankrooms ticket QR tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a user's tickets
    Tickets {
        #[arg(long, default_value = "user_001")]
        user: String,
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        /// Ticket store JSON; the demo tickets when omitted
        #[arg(long)]
        tickets: Option<PathBuf>,
    },
    /// Encode one ticket's code as a PNG
    Encode {
        /// Ticket id or code id
        #[arg(long)]
        ticket: String,
        #[arg(long, default_value = "user_001")]
        user: String,
        #[arg(long)]
        tickets: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Compose the full ticket image and download or share it
    Render {
        #[arg(long)]
        ticket: String,
        #[arg(long, default_value = "user_001")]
        user: String,
        #[arg(long)]
        tickets: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
        /// Take the share path; with no share surface the image is stored
        /// and its path printed
        #[arg(long)]
        share_fallback: bool,
    },
    /// Validate a payload JSON file as the scanner would
    Validate {
        #[arg(long)]
        payload: PathBuf,
        #[arg(long)]
        verify_signature: bool,
        /// Reject payloads older than this many minutes
        #[arg(long)]
        max_age_mins: Option<i64>,
    },
    /// Replay a directory of frames through the scanner
    Scan {
        #[arg(long)]
        frames: PathBuf,
        #[arg(long, default_value_t = 20)]
        ticks: usize,
        /// Only decode frames that show three finder markers
        #[arg(long)]
        gate: bool,
        /// Seed the simulated decoder
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print grayscale/binary stats and finder markers for an image
    Inspect {
        #[arg(long)]
        image: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Upcoming,
    Past,
}

impl From<FilterArg> for TicketFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => TicketFilter::All,
            FilterArg::Upcoming => TicketFilter::Upcoming,
            FilterArg::Past => TicketFilter::Past,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    let result = match cli.command {
        Command::Tickets { user, filter, tickets } => tickets_cmd(&user, filter.into(), tickets.as_deref()),
        Command::Encode {
            ticket,
            user,
            tickets,
            out,
        } => encode_cmd(&settings, &ticket, &user, tickets.as_deref(), &out),
        Command::Render {
            ticket,
            user,
            tickets,
            out_dir,
            share_fallback,
        } => render_cmd(&settings, &ticket, &user, tickets.as_deref(), &out_dir, share_fallback),
        Command::Validate {
            payload,
            verify_signature,
            max_age_mins,
        } => validate_cmd(&settings, &payload, verify_signature, max_age_mins),
        Command::Scan {
            frames,
            ticks,
            gate,
            seed,
        } => scan_cmd(&settings, &frames, ticks, gate, seed),
        Command::Inspect { image } => inspect_cmd(&image),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let fallback = if debug_enabled() { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_store(path: Option<&Path>) -> Result<JsonTicketStore, Box<dyn Error>> {
    match path {
        Some(path) => Ok(JsonTicketStore::from_path(path)?),
        None => Ok(JsonTicketStore::demo()),
    }
}

fn find_ticket(store: &JsonTicketStore, user: &str, id: &str) -> Result<TicketRecord, Box<dyn Error>> {
    store
        .find(user, id)
        .cloned()
        .ok_or_else(|| format!("no ticket '{id}' for user '{user}'").into())
}

fn tickets_cmd(user: &str, filter: TicketFilter, tickets: Option<&Path>) -> CliResult {
    let store = load_store(tickets)?;
    let list = store.filtered_tickets(user, filter, Utc::now());
    println!("{} ticket(s) for {user}", list.len());
    for t in list {
        println!(
            "  {} | {} | {} | {} x{} | {} | {}",
            t.id, t.event_title, t.event_date, t.ticket_type, t.quantity, t.qr_code, t.status
        );
    }
    Ok(())
}

fn encode_cmd(settings: &Settings, ticket: &str, user: &str, tickets: Option<&Path>, out: &Path) -> CliResult {
    let store = load_store(tickets)?;
    let record = find_ticket(&store, user, ticket)?;

    let generator = TicketCodeGenerator::new(settings);
    let encoded = generator.encode_ticket(&record, user)?;
    encoded.raster.image.save(out)?;

    println!("Wrote {} ({:?})", out.display(), encoded.raster.source);
    println!("Payload: {}", encoded.payload.to_canonical_string()?);
    Ok(())
}

fn render_cmd(
    settings: &Settings,
    ticket: &str,
    user: &str,
    tickets: Option<&Path>,
    out_dir: &Path,
    share_fallback: bool,
) -> CliResult {
    let store = load_store(tickets)?;
    let record = find_ticket(&store, user, ticket)?;
    let catalog = StaticCatalog::load_or_default(settings.events_file.as_deref())?;

    // The ticket's own details win; the catalog fills in what it lacks
    let from_catalog = catalog.event_by_id(&record.event_id).map(EventMeta::from).unwrap_or_default();
    let pick = |own: &str, fallback: String| if own.is_empty() { fallback } else { own.to_string() };
    let meta = EventMeta {
        title: pick(&record.event_title, from_catalog.title),
        date: pick(&record.event_date, from_catalog.date),
        location: pick(&record.event_location, from_catalog.location),
    };

    let generator = TicketCodeGenerator::new(settings);
    let encoded = generator.encode_ticket(&record, user)?;
    let image = compose(&encoded.raster, &encoded.payload, &meta, Local::now().date_naive());

    let exporter = TicketExporter::new(DirectorySink::new(out_dir)).with_reference_dir(out_dir.join("shared"));
    if share_fallback {
        match exporter.share(&image, &encoded.payload)? {
            ExportOutcome::Shared => println!("Shared"),
            ExportOutcome::Reference(path) => println!("Copy this link: {}", path.display()),
            ExportOutcome::Downloaded(path) => println!("Downloaded {}", path.display()),
        }
    } else {
        let path = exporter.download(&image, &encoded.payload)?;
        println!("Downloaded {}", path.display());
    }
    Ok(())
}

fn validate_cmd(settings: &Settings, payload: &Path, verify_signature: bool, max_age_mins: Option<i64>) -> CliResult {
    let raw = std::fs::read_to_string(payload)?;
    let catalog = StaticCatalog::load_or_default(settings.events_file.as_deref())?;
    let policy = ValidationPolicy {
        verify_signature,
        max_age: max_age_mins.map(ChronoDuration::minutes),
        single_use: false,
    };

    let validator = Validator::with_policy(catalog, policy);
    let result = evaluate(&validator, raw.trim());

    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.success {
        Ok(())
    } else {
        Err(result.message.into())
    }
}

fn scan_cmd(settings: &Settings, frames: &Path, ticks: usize, gate: bool, seed: Option<u64>) -> CliResult {
    let camera = ImageSequenceCamera::from_dir(frames)?;
    let catalog = StaticCatalog::load_or_default(settings.events_file.as_deref())?;
    let decoder = match seed {
        Some(seed) => SimulatedDecoder::seeded(settings.detection_rate, seed),
        None => SimulatedDecoder::new(settings.detection_rate),
    };
    println!("Replaying {} frame(s) from {}", camera.len(), frames.display());

    let results = if gate {
        run_scan(camera, FinderGate::new(decoder), catalog, ticks, settings.scan_interval)?
    } else {
        run_scan(camera, decoder, catalog, ticks, settings.scan_interval)?
    };

    for r in &results {
        let id = r.ticket.as_ref().map(|t| t.ticket_id.as_str()).unwrap_or("-");
        println!("  [{}] {} ({id})", if r.success { "OK" } else { "NO" }, r.message);
    }
    println!("{} detection(s) in {ticks} tick(s)", results.len());
    Ok(())
}

fn run_scan<D: FrameDecoder + 'static>(
    camera: ImageSequenceCamera,
    decoder: D,
    catalog: StaticCatalog,
    ticks: usize,
    interval: Duration,
) -> Result<Vec<ScanResult>, Box<dyn Error>> {
    let results: Arc<Mutex<Vec<ScanResult>>> = Arc::default();
    let sink = Arc::clone(&results);

    let mut scanner = Scanner::new(camera, decoder, Validator::new(catalog));
    scanner.on_result(move |r| {
        if let Ok(mut list) = sink.lock() {
            list.push(r.clone());
        }
    });

    let session = ScanLoop::spawn(scanner, interval)?;
    let start = Instant::now();
    while session.ticks() < ticks && session.is_running() {
        thread::sleep(interval.min(Duration::from_millis(50)));
    }
    if session.stop().is_none() {
        return Err("scan worker exited unexpectedly".into());
    }
    println!("Scanned for {:.2?}", start.elapsed());

    let collected = results.lock().map(|list| list.clone()).unwrap_or_default();
    Ok(collected)
}

fn inspect_cmd(image: &Path) -> CliResult {
    let frame = load_rgba(image)?;
    let (width, height) = frame.dimensions();
    println!("Image: {} ({}x{})", image.display(), width, height);

    let gray = frame_to_grayscale(frame.as_raw(), width as usize, height as usize);
    let gray_stats = grayscale_stats(&gray);
    println!(
        "Grayscale range: {}-{}, average: {}",
        gray_stats.min, gray_stats.max, gray_stats.avg
    );

    let binary = binarize_frame(&frame);
    let stats = binary_stats(&binary);
    println!(
        "Binary: dark_pixels={} total={} dark_ratio={:.2}%",
        stats.dark_pixels,
        stats.total_pixels,
        stats.dark_ratio * 100.0
    );

    let patterns = FinderDetector::detect(&binary);
    println!("Found {} finder patterns", patterns.len());
    for (i, pattern) in patterns.iter().take(10).enumerate() {
        println!(
            "  Pattern {}: center=({:.1}, {:.1}) module_size={:.2}",
            i, pattern.center.x, pattern.center.y, pattern.module_size
        );
    }
    Ok(())
}
