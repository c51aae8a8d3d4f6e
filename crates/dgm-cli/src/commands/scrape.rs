use anyhow::{Context, Result};
use dgm_core::schema::Database;
use dgm_etl::{build_pipeline, load_directory, Config, PageFetcher, ScrapeJob, ScrapeRange};
use dgm_search::{rebuild_index, FtsIndex};

pub async fn run_fetch(
    config: &Config,
    from: Option<u32>,
    to: Option<u32>,
    force: bool,
) -> Result<()> {
    let from = from.unwrap_or(config.first_id);
    let to = to.unwrap_or(config.last_id);
    if from > to {
        anyhow::bail!("--from ({from}) must not be after --to ({to})");
    }

    log::info!("Fetching shows {}..={} into {}", from, to, config.html_dir.display());
    let fetcher = PageFetcher::new(config).context("Failed to create page fetcher")?;
    let report = fetcher.fetch_range(from, to, force).await?;

    println!("\n✓ Fetch complete");
    println!("  Fetched:   {}", report.fetched);
    println!("  Cached:    {}", report.cached);
    println!("  Not found: {}", report.not_found);
    if report.failed > 0 {
        println!("  Failed:    {} (see log)", report.failed);
    }
    Ok(())
}

pub fn run_load(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let report = load_directory(&db, &config.html_dir)
        .with_context(|| format!("Failed to load pages from {}", config.html_dir.display()))?;

    println!("\n✓ Load complete");
    println!("  Loaded:    {}", report.loaded);
    println!("  Not found: {}", report.not_found);
    if report.failed > 0 {
        println!("  Failed:    {} (see log)", report.failed);
    }
    Ok(())
}

pub fn run_index(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let index = FtsIndex::open(&config.index_path)?;
    let indexed = rebuild_index(&db, &index)?;

    println!("✓ Indexed {indexed} shows into {}", config.index_path.display());
    Ok(())
}

pub async fn run_scrape(config: &Config) -> Result<()> {
    let range = ScrapeRange::from_config(config);
    log::info!("Starting scrape of shows {}..={}", range.from, range.to);

    let workflow = build_pipeline(config, range)?;

    // Pipeline state lives next to the catalog
    let state_path = config
        .database_path
        .with_file_name("pipeline.db");
    let mut store = treadle::SqliteStateStore::open(&state_path).await?;

    let job = ScrapeJob::timestamped(config.html_dir.clone());

    // Subscribe to events for progress display
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow.advance(&job, &mut store).await?;

    println!("\n✓ Scrape complete ({job})");
    Ok(())
}
