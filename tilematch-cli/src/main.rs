use chrono::Local;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tilematch::canvas::metadata::select_canvas;
use tilematch::fetch::fetch_canvases;
use tilematch::{
    load_patterns, AssembleConfig, Assembler, DateKey, DistributeConfig, Distributor, Endpoints,
    FailurePolicy, HttpStore, LinkFormat, LogSink, MatchConfig, Matcher, Palette, RegionRect,
    RetryPolicy, Scanner, SnapshotMode, TimeOfDayKey,
};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scan a canvas area for reference patterns (JSON config driven)"
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// List the available 2D canvases and exit.
    #[arg(long)]
    list_canvases: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct AreaJson {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Default for AreaJson {
    fn default() -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: 2560,
            y1: 2560,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaletteEntryJson {
    name: String,
    rgb: [u8; 3],
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    threshold: f32,
    parallel: bool,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            threshold: cfg.threshold,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FetchConfigJson {
    max_attempts: u32,
    backoff_ms: u64,
    max_backoff_ms: u64,
    timeout_secs: u64,
}

impl Default for FetchConfigJson {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_attempts: retry.max_attempts,
            backoff_ms: retry.base_backoff.as_millis() as u64,
            max_backoff_ms: retry.max_backoff.as_millis() as u64,
            timeout_secs: 30,
        }
    }
}

impl FetchConfigJson {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_backoff: Duration::from_millis(self.backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DistributeConfigJson {
    chunk_size: u32,
    concurrency_limit: usize,
    queue_capacity: usize,
    abort_on_error: bool,
    max_rollback_days: u32,
}

impl Default for DistributeConfigJson {
    fn default() -> Self {
        let cfg = DistributeConfig::default();
        Self {
            chunk_size: cfg.chunk_size,
            concurrency_limit: cfg.concurrency_limit,
            queue_capacity: cfg.queue_capacity,
            abort_on_error: cfg.failure_policy == FailurePolicy::Abort,
            max_rollback_days: AssembleConfig::default().max_rollback_days,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    canvas_id: String,
    api_root: String,
    storage_root: String,
    user_agent: String,
    area: AreaJson,
    /// `YYYYMMDD`; today when absent.
    date: Option<String>,
    /// `"day_start"`, `"latest"` or a four-digit time key.
    snapshot: String,
    pattern_dir: PathBuf,
    primary_color: [u8; 3],
    /// Explicit palette; the canvas colors are used when absent.
    palette: Option<Vec<PaletteEntryJson>>,
    /// Leading canvas colors left out of the derived palette; pixmap canvases
    /// repeat white there.
    palette_skip: usize,
    output_path: PathBuf,
    region_dir: Option<PathBuf>,
    viewer_url: String,
    zoom: u32,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
    fetch: FetchConfigJson,
    distribute: DistributeConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas_id: "0".into(),
            api_root: "https://pixmap.fun".into(),
            storage_root: "https://backup.pixmap.fun".into(),
            user_agent: concat!("tilematch ", env!("CARGO_PKG_VERSION")).into(),
            area: AreaJson::default(),
            date: None,
            snapshot: "latest".into(),
            pattern_dir: PathBuf::from("patterns"),
            primary_color: [0, 0, 0],
            palette: None,
            palette_skip: 2,
            output_path: PathBuf::from("matches.log"),
            region_dir: None,
            viewer_url: "https://pixmap.fun/".into(),
            zoom: 36,
            match_cfg: MatchConfigJson::default(),
            fetch: FetchConfigJson::default(),
            distribute: DistributeConfigJson::default(),
        }
    }
}

fn parse_snapshot(value: &str) -> Result<SnapshotMode, Box<dyn std::error::Error>> {
    Ok(match value {
        "day_start" => SnapshotMode::DayStart,
        "latest" => SnapshotMode::Latest,
        time => SnapshotMode::At(time.parse::<TimeOfDayKey>()?),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("tilematch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config: Config = match std::fs::read_to_string(&cli.config) {
        Ok(text) => serde_json::from_str(&text)?,
        Err(err) if cli.list_canvases && err.kind() == std::io::ErrorKind::NotFound => {
            Config::default()
        }
        Err(err) => return Err(err.into()),
    };

    let retry = config.fetch.retry_policy();
    let endpoints = Endpoints::new(config.api_root.clone(), config.storage_root.clone());
    let store = Arc::new(HttpStore::new(
        &config.user_agent,
        Duration::from_secs(config.fetch.timeout_secs),
    )?);

    let canvases = fetch_canvases(store.as_ref(), &endpoints, &retry).await?;
    if cli.list_canvases {
        for canvas in canvases.iter().filter(|canvas| !canvas.is_3d) {
            println!("{} = {}", canvas.id, canvas.title);
        }
        return Ok(());
    }
    let canvas = Arc::new(select_canvas(canvases, &config.canvas_id)?);

    let date: DateKey = match &config.date {
        Some(date) => date.parse()?,
        None => DateKey::from_date(Local::now().date_naive()),
    };
    let area = RegionRect::from_corners(
        config.area.x0,
        config.area.y0,
        config.area.x1,
        config.area.y1,
    )?;
    let mode = parse_snapshot(&config.snapshot)?;

    let palette = Arc::new(match config.palette {
        Some(entries) => Palette::new(entries.into_iter().map(|e| (e.name, e.rgb)))?,
        None => Palette::from_canvas(&canvas, config.palette_skip)?,
    });
    let patterns = load_patterns(&config.pattern_dir, &palette.lookup())?;
    let matcher = Matcher::new(Arc::clone(&palette), &patterns, config.primary_color)?
        .with_config(MatchConfig {
            threshold: config.match_cfg.threshold,
            parallel: config.match_cfg.parallel,
        });

    let sink = LogSink::open(
        &config.output_path,
        Arc::clone(&palette),
        LinkFormat {
            viewer_url: config.viewer_url.clone(),
            canvas_id: canvas.id.clone(),
            zoom: config.zoom,
        },
    )?;

    let assembler = Assembler::new(
        store,
        endpoints,
        AssembleConfig {
            retry,
            max_rollback_days: config.distribute.max_rollback_days,
        },
    );
    let distributor = Distributor::new(
        Arc::new(assembler),
        DistributeConfig {
            chunk_size: config.distribute.chunk_size,
            concurrency_limit: config.distribute.concurrency_limit,
            queue_capacity: config.distribute.queue_capacity,
            failure_policy: if config.distribute.abort_on_error {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            },
        },
    );
    let mut scanner = Scanner::new(distributor, Arc::new(matcher), Arc::new(sink));
    if let Some(dir) = &config.region_dir {
        std::fs::create_dir_all(dir)?;
        scanner = scanner.with_region_dir(dir);
    }

    tracing::info!(
        canvas = %canvas.id,
        date = %date,
        area = %area,
        patterns = patterns.len(),
        colors = palette.len(),
        "scan started"
    );
    let report = scanner.scan(Arc::clone(&canvas), area, date, mode).await?;

    println!(
        "{} chunks dispatched, {} matched, {} failed, {} matches written to {}",
        report.distribution.dispatched,
        report.regions_matched,
        report.distribution.failures.len(),
        report.matches,
        config.output_path.display()
    );
    for failure in &report.distribution.failures {
        eprintln!("chunk {} {}: {}", failure.chunk.seq, failure.chunk.rect, failure.error);
    }
    Ok(())
}
