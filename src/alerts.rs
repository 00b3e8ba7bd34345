use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;

use crate::engine::{PredictionResult, PredictionStatus};

/// Receives rendered alerts. Chat delivery lives outside this crate; it only
/// needs to implement this.
pub trait AlertSink {
    fn deliver(&self, text: &str, result: &PredictionResult) -> Result<()>;
}

/// Plain-text alert for a chat message or a terminal.
pub fn render_alert(result: &PredictionResult) -> String {
    let header = format!(
        "{} vs {} ({}) {}'",
        result.home_team, result.away_team, result.league, result.minute
    );
    let body = match result.status {
        PredictionStatus::NotLive(status) => format!("not live: {}", status.as_str()),
        PredictionStatus::OutOfRange => "minute outside the match window".to_string(),
        PredictionStatus::Ready | PredictionStatus::InsufficientHistory => {
            let mut lines = vec![
                format!(
                    "Interval {}: danger {:.2} [{}]",
                    result.current_interval.as_deref().unwrap_or("-"),
                    result.danger_score,
                    result.interpretation
                ),
                format!(
                    "P(goal) home {:.0}% / away {:.0}%",
                    result.home_goal_probability * 100.0,
                    result.away_goal_probability * 100.0
                ),
            ];
            if let Some(rec) = &result.recommendation {
                lines.push(format!("confidence {}: {}", rec.confidence.as_str(), rec.action));
            }
            lines.join("\n")
        }
    };
    let mut out = format!("{header}\n{body}");
    for note in &result.annotations {
        out.push_str("\n* ");
        out.push_str(note);
    }
    out
}

/// Appends one JSON line per alert to `<dir>/alerts-YYYY-MM-DD.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlAlertLog {
    dir: PathBuf,
}

impl JsonlAlertLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for_today(&self) -> PathBuf {
        self.dir
            .join(format!("alerts-{}.jsonl", Utc::now().format("%Y-%m-%d")))
    }
}

impl AlertSink for JsonlAlertLog {
    fn deliver(&self, text: &str, result: &PredictionResult) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create alert dir {}", self.dir.display()))?;
        let path = self.path_for_today();
        let line = json!({
            "ts": Utc::now().to_rfc3339(),
            "type": "prediction",
            "text": text,
            "result": result,
        });
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        writeln!(file, "{line}").with_context(|| format!("append {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Predictor;
    use crate::live_context::{LiveMatchContext, MatchStatus};
    use crate::match_log::MatchLog;

    fn result(status: MatchStatus) -> PredictionResult {
        let p = Predictor::new(EngineConfig::default()).unwrap();
        let snap = p.build_snapshot(MatchLog::new());
        let mut ctx = LiveMatchContext::new("Home", "Away", "Test League");
        ctx.status = status;
        ctx.current_minute = 33;
        p.evaluate(&snap, &ctx)
    }

    #[test]
    fn rendered_alert_carries_band_and_annotations() {
        let text = render_alert(&result(MatchStatus::Live));
        assert!(text.starts_with("Home vs Away (Test League) 33'"));
        assert!(text.contains("31-45+"));
        assert!(text.contains("[LOW]"));
        assert!(text.contains("* insufficient history"));
    }

    #[test]
    fn not_live_renders_status() {
        let text = render_alert(&result(MatchStatus::FullTime));
        assert!(text.contains("not live: FULL_TIME"));
    }

    #[test]
    fn jsonl_log_appends_lines() {
        let dir = std::env::temp_dir().join(format!("goalwatch-alerts-{}", std::process::id()));
        let sink = JsonlAlertLog::new(&dir);
        let r = result(MatchStatus::Live);
        sink.deliver("one", &r).unwrap();
        sink.deliver("two", &r).unwrap();
        let raw = fs::read_to_string(sink.path_for_today()).unwrap();
        let lines = raw.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(v["text"], "two");
        assert_eq!(v["result"]["status"], "insufficient_history");
        let _ = fs::remove_dir_all(&dir);
    }
}
