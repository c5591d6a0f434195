use aim_telemetry::{load_history, HistoryReport};
use anyhow::Result;
use std::path::Path;

/// Print every logged round followed by the totals
pub fn show_report(path: &Path) -> Result<()> {
    let records = load_history(path)?;
    if records.is_empty() {
        println!("No rounds logged yet in {}", path.display());
        return Ok(());
    }

    for r in &records {
        println!(
            "{}  Round {:>3}  Avg {:>6.1}px  Max {:>5.1}px  SD {:>5.1}  Shots {:>3}  {}",
            r.timestamp, r.round, r.avg_offset, r.max_offset, r.std_dev, r.shots, r.tip
        );
    }
    println!();
    print!("{}", HistoryReport::from_records(&records));
    Ok(())
}

pub fn show_monitors() -> Result<()> {
    let monitors = aim_capture::list_monitors()?;
    if monitors.is_empty() {
        println!("No monitors found");
    }
    for m in monitors {
        println!(
            "{}: {} ({}x{}){}",
            m.index,
            m.name,
            m.width,
            m.height,
            if m.is_primary { " [primary]" } else { "" }
        );
    }
    Ok(())
}
