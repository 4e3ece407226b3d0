use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{error, types::SummaryTableRow};

pub async fn store(artist_name: String) {
    let (_, pipeline) = super::build_pipeline().await;

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Exporting discography of {}...", artist_name));
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }

    let result = pipeline.run(&artist_name).await;
    pb.finish_and_clear();

    match result {
        Ok(result) => {
            let table = Table::new(vec![SummaryTableRow {
                artist: result.artist_name,
                id: result.artist_id,
                albums: result.albums_stored,
                tracks: result.tracks_stored,
                seconds: format!("{:.2}", result.elapsed_seconds),
            }]);
            println!("{}", table);
        }
        Err(e) => error!("{}: {}", e.label(), e),
    }
}
