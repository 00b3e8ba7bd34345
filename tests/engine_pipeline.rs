use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use goalwatch::alerts::render_alert;
use goalwatch::danger::Interpretation;
use goalwatch::ingest::{RawMatchRow, ingest_rows};
use goalwatch::intervals::Half;
use goalwatch::recommend::LikelySide;
use goalwatch::{
    EngineConfig, LiveMatchContext, LiveSnapshot, MatchLog, MatchStatus, PredictionStatus,
    Predictor,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[derive(Deserialize)]
struct Case {
    history: Vec<RawMatchRow>,
    matches: Vec<CaseMatch>,
}

#[derive(Deserialize)]
struct CaseMatch {
    home_team: String,
    away_team: String,
    league: String,
    snapshots: Vec<LiveSnapshot>,
}

fn load_case() -> (Predictor, goalwatch::HistorySnapshot, Vec<LiveMatchContext>) {
    let case: Case = serde_json::from_str(&read_fixture("live_case.json")).expect("case parses");
    let predictor = Predictor::new(EngineConfig::default()).expect("default config is valid");
    let log = MatchLog::from_records(ingest_rows(&case.history).records);
    let snapshot = predictor.build_snapshot(log);
    let contexts = case
        .matches
        .iter()
        .map(|m| {
            let mut ctx = LiveMatchContext::new(&m.home_team, &m.away_team, &m.league);
            for snap in &m.snapshots {
                ctx.apply_snapshot(snap);
            }
            ctx
        })
        .collect();
    (predictor, snapshot, contexts)
}

#[test]
fn live_match_gets_a_full_breakdown() {
    let (predictor, snapshot, contexts) = load_case();
    let ctx = &contexts[0];
    assert_eq!(ctx.current_minute, 38);
    // the 37' poll reported 0 after 1; the regression is ignored
    assert_eq!(ctx.home_score, 1);

    let r = predictor.evaluate(&snapshot, ctx);
    assert_eq!(r.status, PredictionStatus::Ready);
    assert_eq!(r.current_interval.as_deref(), Some("31-45+"));
    assert!(r.danger_score.is_finite() && r.danger_score > 0.0);

    let d = r.details.as_ref().expect("ready results carry details");
    assert!((d.home.attack_rate - 0.25).abs() < 1e-12);
    assert!((d.away.attack_rate - 0.5).abs() < 1e-12);
    assert!((d.away.defense_weakness - 0.375).abs() < 1e-12);
    assert_eq!(d.away.events.red_cards, 1);
    assert_eq!(d.away.event_modifier.total, 0.7);
    assert_eq!(d.home.event_modifier.total, 1.0);
    assert!(d.home.momentum.is_some());
    assert!((0.0..=1.0).contains(&r.home_goal_probability));
    assert!((0.0..=1.0).contains(&r.away_goal_probability));

    let rec = r.recommendation.as_ref().expect("ready results carry a recommendation");
    assert_eq!(rec.minutes_left_in_interval, 7);
    assert_eq!(rec.home_goal_probability, r.home_goal_probability);
}

#[test]
fn unknown_teams_report_insufficient_history() {
    let (predictor, snapshot, contexts) = load_case();
    let r = predictor.evaluate(&snapshot, &contexts[1]);
    assert_eq!(r.status, PredictionStatus::InsufficientHistory);
    assert_eq!(r.danger_score, 0.0);
    assert_eq!(r.interpretation, Interpretation::Low);
    assert_eq!(r.home_goal_probability, 0.0);
    let rec = r.recommendation.as_ref().expect("still recommends");
    assert_eq!(rec.likely_side, LikelySide::Either);
    assert!(render_alert(&r).contains("insufficient history"));
}

#[test]
fn half_time_is_not_scored() {
    let (predictor, snapshot, contexts) = load_case();
    let r = predictor.evaluate(&snapshot, &contexts[2]);
    assert_eq!(r.status, PredictionStatus::NotLive(MatchStatus::HalfTime));
    assert!(r.details.is_none());
}

#[test]
fn evaluation_is_idempotent_and_parallel_safe() {
    let (predictor, snapshot, contexts) = load_case();
    let first = predictor.evaluate(&snapshot, &contexts[0]);
    let second = predictor.evaluate(&snapshot, &contexts[0]);
    assert_eq!(first, second);

    let many = predictor.evaluate_many(&snapshot, &contexts);
    let sequential = contexts
        .iter()
        .map(|c| predictor.evaluate(&snapshot, c))
        .collect::<Vec<_>>();
    assert_eq!(many, sequential);
}

#[test]
fn results_serialize_for_the_sink() {
    let (predictor, snapshot, contexts) = load_case();
    let results = predictor.evaluate_many(&snapshot, &contexts);
    let v = serde_json::to_value(&results).expect("results serialize");
    assert_eq!(v[0]["status"], "ready");
    assert_eq!(v[1]["status"], "insufficient_history");
    assert_eq!(v[2]["status"]["not_live"], "HALF_TIME");
    assert_eq!(v[0]["current_interval"], "31-45+");
}

#[test]
fn more_goals_so_far_never_raise_the_score() {
    let (predictor, snapshot, contexts) = load_case();
    let mut ctx = contexts[0].clone();
    let mut last = f64::INFINITY;
    for goals in 0..6 {
        ctx.home_score = goals;
        let r = predictor.evaluate(&snapshot, &ctx);
        assert!(r.danger_score <= last + 1e-12);
        last = r.danger_score;
    }
}

#[test]
fn first_half_stoppage_poll_scores_the_closing_interval() {
    let (predictor, snapshot, contexts) = load_case();
    let mut ctx = contexts[0].clone();
    let poll: LiveSnapshot =
        serde_json::from_str(r#"{"status":"1H","minute":"45+2"}"#).expect("stoppage poll parses");
    ctx.apply_snapshot(&poll);
    assert_eq!(ctx.current_minute, 47);

    let r = predictor.evaluate(&snapshot, &ctx);
    assert_eq!(r.status, PredictionStatus::Ready);
    assert_eq!(r.current_interval.as_deref(), Some("31-45+"));
    let d = r.details.as_ref().expect("ready results carry details");
    assert_eq!(d.half, Some(Half::First));
    assert!((d.home.attack_rate - 0.25).abs() < 1e-12);
    let rec = r.recommendation.as_ref().expect("ready results carry a recommendation");
    assert_eq!(rec.minutes_left_in_interval, 0);
    assert!(rec.closing_window);

    let mut second_half = contexts[0].clone();
    second_half.apply_snapshot(
        &serde_json::from_str(r#"{"status":"2H","minute":47}"#).expect("second half poll parses"),
    );
    let r = predictor.evaluate(&snapshot, &second_half);
    assert_eq!(r.current_interval.as_deref(), Some("46-60"));
}
