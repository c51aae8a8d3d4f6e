use anyhow::{Context, Result};
use dgm_bot::view;
use dgm_core::model::DgmId;
use dgm_core::schema::Database;
use dgm_etl::Config;
use dgm_search::{FtsIndex, QueryService};

fn open(config: &Config) -> Result<(Database, FtsIndex)> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open catalog {}", config.database_path.display()))?;
    let index = FtsIndex::open(&config.index_path)
        .with_context(|| format!("Failed to open index {}", config.index_path.display()))?;
    Ok((db, index))
}

pub fn run_search(config: &Config, query: &str) -> Result<()> {
    let (db, index) = open(config)?;
    let hits = QueryService::new(&index, &db).search(query)?;

    if hits.is_empty() {
        println!("No shows matching '{query}'");
        return Ok(());
    }

    println!("Shows matching '{query}' ({} total)\n", hits.total);
    for show in &hits.shows {
        println!(
            "  {:>5}  {}  {}",
            show.dgm_id,
            show.date_friendly,
            show.title()
        );
    }
    if hits.total > hits.shows.len() {
        println!("\n  ... showing the best {} matches", hits.shows.len());
    }
    Ok(())
}

pub fn show_show(config: &Config, dgm_id: u32) -> Result<()> {
    let (db, _index) = open(config)?;
    let Some(show) = db.get_show_by_dgm_id(DgmId::new(dgm_id))? else {
        anyhow::bail!("No show with id {dgm_id}");
    };

    println!("{}", view::render_text(&view::show_detail(&show, &config.base_url)));

    let tracks = db.tracks_for_show(show.id)?;
    if !tracks.is_empty() {
        println!("\n{}", view::render_text(&view::tracklist(&show, &tracks)));
    }
    let members = db.members_for_show(show.id)?;
    if !members.is_empty() {
        println!("\n{}", view::render_text(&view::lineup(&show, &members)));
    }
    Ok(())
}
