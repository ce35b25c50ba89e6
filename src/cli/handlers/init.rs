use std::path::Path;

use crate::io::config_io;
use crate::io::store_io;

use super::Session;

/// Create the data directory with a config template and the seeded
/// categories. Existing data is left alone.
pub fn cmd_init(data_dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let wrote_config = config_io::write_default_config(data_dir)?;

    let mut session = Session::open(data_dir)?;
    let fresh = store_io::is_fresh(session.tracker.backend())?;
    if fresh {
        session.tracker.save()?;
    }

    if json {
        super::print_json(&serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "created": fresh,
            "config_written": wrote_config,
        }))
    } else {
        if fresh {
            println!("Initialized docket in {}", data_dir.display());
            for (name, meta) in session.tracker.categories().iter() {
                println!("  {}", crate::cli::output::format_category_line(name, meta));
            }
        } else {
            println!("docket already initialized in {}", data_dir.display());
        }
        Ok(())
    }
}
