use anyhow::Result;
use dgm_core::schema::Database;
use dgm_etl::{load::page_files, Config};
use dgm_search::FtsIndex;

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let index = FtsIndex::open(&config.index_path)?;

    let shows = db.count_shows()?;
    let instruments = db.count_instruments()?;
    let indexed = index.len()?;
    let cached = if config.html_dir.is_dir() {
        page_files(&config.html_dir)?.len()
    } else {
        0
    };

    println!("\n📊 DGM Status\n");
    println!("  Database:    {}", config.database_path.display());
    println!("  Index:       {}", config.index_path.display());
    println!("  Page cache:  {}", config.html_dir.display());
    println!();
    println!("  Cached pages: {cached}");
    println!("  Shows:        {shows}");
    println!("  Instruments:  {instruments}");
    println!("  Indexed:      {indexed}");
    if let Some(max) = db.max_dgm_id()? {
        println!("  Highest id:   {max}");
    }

    if cached > 0 && shows == 0 {
        println!("\n  Run `dgm load` to extract the cached pages");
    } else if indexed != shows {
        println!("\n  Run `dgm index` to bring the search index up to date");
    }

    Ok(())
}
