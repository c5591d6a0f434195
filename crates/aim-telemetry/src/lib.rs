use aim_advisor::{RoundSummary, Tip};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Column names of the round log, written once at the top of a new file
pub const HEADER: [&str; 7] = [
    "Timestamp",
    "Round",
    "AvgOffset",
    "MaxOffset",
    "StdDev",
    "Shots",
    "Tip",
];

/// Append-only destination for finished round summaries
pub trait TelemetrySink {
    fn append(&mut self, summary: &RoundSummary, at: SystemTime) -> Result<()>;
}

/// Round log as a CSV file. The header goes in only when the file is created.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for CsvSink {
    fn append(&mut self, summary: &RoundSummary, at: SystemTime) -> Result<()> {
        let exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut wtr = csv::Writer::from_writer(file);
        if !exists {
            wtr.write_record(HEADER)?;
        }
        wtr.write_record(format_row(summary, at))
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        wtr.flush()?;

        tracing::debug!("Round {} logged to {}", summary.round, self.path.display());
        Ok(())
    }
}

/// Keeps summaries in memory; used for dry runs
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub rows: Vec<RoundSummary>,
}

impl TelemetrySink for MemorySink {
    fn append(&mut self, summary: &RoundSummary, _at: SystemTime) -> Result<()> {
        self.rows.push(summary.clone());
        Ok(())
    }
}

fn format_row(summary: &RoundSummary, at: SystemTime) -> [String; 7] {
    let timestamp: DateTime<Local> = at.into();
    [
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        summary.round.to_string(),
        format!("{:.1}", summary.average),
        format!("{:?}", summary.max_abs),
        format!("{:.1}", summary.std_dev),
        summary.valid_shots.to_string(),
        summary.tip.label().to_string(),
    ]
}

/// One row read back from the round log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "AvgOffset")]
    pub avg_offset: f64,
    #[serde(rename = "MaxOffset")]
    pub max_offset: f64,
    #[serde(rename = "StdDev")]
    pub std_dev: f64,
    #[serde(rename = "Shots")]
    pub shots: usize,
    #[serde(rename = "Tip", with = "tip_label")]
    pub tip: Tip,
}

/// Tips are stored as their display text
mod tip_label {
    use aim_advisor::Tip;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tip: &Tip, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tip.label())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tip, D::Error> {
        let label = String::deserialize(deserializer)?;
        Tip::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown tip '{}'", label)))
    }
}

/// Load every round logged so far. A missing file is an empty history.
pub fn load_history(path: &Path) -> Result<Vec<RoundRecord>> {
    if !path.exists() {
        tracing::warn!("No round log found at {}", path.display());
        return Ok(Vec::new());
    }

    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<RoundRecord>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded {} round(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Totals across a round log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryReport {
    pub rounds: usize,
    pub shots: usize,
    /// Shot-weighted mean of the per-round averages, `None` without shots
    pub average_offset: Option<f64>,
    pub tips: BTreeMap<&'static str, usize>,
}

impl HistoryReport {
    pub fn from_records(records: &[RoundRecord]) -> Self {
        let shots: usize = records.iter().map(|r| r.shots).sum();
        let weighted: f64 = records.iter().map(|r| r.avg_offset * r.shots as f64).sum();
        let mut tips = BTreeMap::new();
        for r in records {
            *tips.entry(r.tip.label()).or_insert(0) += 1;
        }

        Self {
            rounds: records.len(),
            shots,
            average_offset: (shots > 0).then(|| weighted / shots as f64),
            tips,
        }
    }
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rounds: {}", self.rounds)?;
        writeln!(f, "Shots:  {}", self.shots)?;
        match self.average_offset {
            Some(avg) => writeln!(f, "Avg offset: {:.1}px", avg)?,
            None => writeln!(f, "Avg offset: N/A")?,
        }
        for (tip, count) in &self.tips {
            writeln!(f, "  {:>3} x {}", count, tip)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn summary(round: u32, average: f64, valid_shots: usize, tip: Tip) -> RoundSummary {
        RoundSummary {
            round,
            average,
            max_abs: average.abs() + 1.0,
            std_dev: 1.25,
            valid_shots,
            shots_fired: valid_shots,
            tip,
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("round_stats.csv");
        let mut sink = CsvSink::new(&path);

        sink.append(&summary(1, 2.0, 3, Tip::OnPoint), SystemTime::now()).unwrap();
        sink.append(&summary(2, 7.5, 4, Tip::Raise), SystemTime::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Timestamp,Round,AvgOffset,MaxOffset,StdDev,Shots,Tip");

        // A fresh sink on the same file keeps appending without a new header
        let mut sink = CsvSink::new(&path);
        sink.append(&summary(3, -6.0, 2, Tip::Lower), SystemTime::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert_eq!(content.matches("Timestamp").count(), 1);
    }

    #[test]
    fn test_row_format() {
        let s = RoundSummary {
            round: 4,
            average: 4.0 / 3.0,
            max_abs: 5.0,
            std_dev: 4.0414,
            valid_shots: 3,
            shots_fired: 5,
            tip: Tip::OnPoint,
        };
        let fields = format_row(&s, SystemTime::now());
        assert_eq!(fields[0].len(), "2026-01-01 00:00:00".len());
        assert_eq!(&fields[1..], ["4", "1.3", "5.0", "4.0", "3", "Crosshair height is on point!"]);
    }

    #[test]
    fn test_history_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut sink = CsvSink::new(&path);
        sink.append(&summary(1, 6.0, 2, Tip::Raise), SystemTime::now()).unwrap();
        sink.append(&summary(2, 0.0, 0, Tip::NoData), SystemTime::now()).unwrap();

        let records = load_history(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].round, 1);
        assert_eq!(records[0].avg_offset, 6.0);
        assert_eq!(records[0].max_offset, 7.0);
        assert_eq!(records[1].tip, Tip::NoData);
    }

    #[test]
    fn test_missing_history_is_empty() {
        let dir = tempdir().unwrap();
        let records = load_history(&dir.path().join("nope.csv")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_history_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, format!("{}\n2026-01-01 00:00:00,one,1.0\n", HEADER.join(","))).unwrap();
        assert!(load_history(&path).is_err());
    }

    #[test]
    fn test_history_reads_quoted_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quoted.csv");
        std::fs::write(
            &path,
            format!(
                "{}\n\"Sat, 1 Feb 2026 10:00:00\",1,-6.5,9.0,1.2,4,Lower your crosshair slightly next round\n",
                HEADER.join(",")
            ),
        )
        .unwrap();

        let records = load_history(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, "Sat, 1 Feb 2026 10:00:00");
        assert_eq!(records[0].avg_offset, -6.5);
        assert_eq!(records[0].tip, Tip::Lower);
    }

    #[test]
    fn test_unknown_tip_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tip.csv");
        std::fs::write(
            &path,
            format!("{}\n2026-01-01 00:00:00,1,0.0,0.0,0.0,0,aim better\n", HEADER.join(",")),
        )
        .unwrap();
        assert!(load_history(&path).is_err());
    }

    #[test]
    fn test_report_totals() {
        let records = vec![
            RoundRecord {
                timestamp: "t".into(),
                round: 1,
                avg_offset: 6.0,
                max_offset: 9.0,
                std_dev: 1.0,
                shots: 2,
                tip: Tip::Raise,
            },
            RoundRecord {
                timestamp: "t".into(),
                round: 2,
                avg_offset: 0.0,
                max_offset: 2.0,
                std_dev: 0.5,
                shots: 4,
                tip: Tip::OnPoint,
            },
        ];
        let report = HistoryReport::from_records(&records);
        assert_eq!(report.rounds, 2);
        assert_eq!(report.shots, 6);
        assert_eq!(report.average_offset, Some(2.0));
        assert_eq!(report.tips.get(Tip::Raise.label()), Some(&1));

        assert_eq!(HistoryReport::from_records(&[]).average_offset, None);
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::default();
        sink.append(&summary(1, 0.0, 0, Tip::NoData), SystemTime::now()).unwrap();
        assert_eq!(sink.rows.len(), 1);
    }
}
