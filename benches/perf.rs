use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use goalwatch::ingest::{ingest_rows, parse_minutes, parse_rows_json};
use goalwatch::live_context::IntensitySnapshot;
use goalwatch::momentum::IntensitySample;
use goalwatch::{EngineConfig, LiveMatchContext, MatchLog, MatchStatus, Predictor};

fn history_log() -> MatchLog {
    let rows = parse_rows_json(BG_HISTORY_JSON).unwrap();
    let mut log = MatchLog::from_records(ingest_rows(&rows).records);
    // widen the log so snapshot building has real work: same shape, shifted teams
    let base = log.records().to_vec();
    for copy in 0..40 {
        log.extend(base.iter().cloned().map(|mut r| {
            r.team = format!("{} {copy}", r.team);
            r.opponent = format!("{} {copy}", r.opponent);
            r
        }));
    }
    log
}

fn live_context() -> LiveMatchContext {
    let mut ctx = LiveMatchContext::new("Ludogorets", "CSKA Sofia", "Bulgaria First League");
    ctx.status = MatchStatus::Live;
    ctx.current_minute = 38;
    ctx.home_score = 1;
    ctx.events.away.red_cards = 1;
    for i in 0..20 {
        let shots = f64::from(i % 4);
        ctx.intensity.push(IntensitySnapshot {
            home: IntensitySample {
                shots,
                attacks: 9.0,
                dangerous_attacks: 3.0,
                corners: 1.0,
            },
            away: IntensitySample::default(),
        });
    }
    ctx
}

fn bench_minutes_parse(c: &mut Criterion) {
    c.bench_function("minutes_parse", |b| {
        b.iter(|| {
            let minutes = parse_minutes(black_box("3, 17, 45+2, 61', 90'+4"));
            black_box(minutes.len());
        })
    });
}

fn bench_ingest(c: &mut Criterion) {
    c.bench_function("ingest_bg_history", |b| {
        b.iter(|| {
            let rows = parse_rows_json(black_box(BG_HISTORY_JSON)).unwrap();
            black_box(ingest_rows(&rows).accepted());
        })
    });
}

fn bench_snapshot_build(c: &mut Criterion) {
    let predictor = Predictor::new(EngineConfig::default()).unwrap();
    let log = history_log();
    c.bench_function("snapshot_build", |b| {
        b.iter(|| {
            let snap = predictor.build_snapshot(black_box(log.clone()));
            black_box(snap.team_count());
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let predictor = Predictor::new(EngineConfig::default()).unwrap();
    let snap = predictor.build_snapshot(history_log());
    let ctx = live_context();
    c.bench_function("evaluate_one", |b| {
        b.iter(|| {
            let r = predictor.evaluate(&snap, black_box(&ctx));
            black_box(r.danger_score);
        })
    });

    let many = vec![ctx; 256];
    c.bench_function("evaluate_many_256", |b| {
        b.iter(|| {
            let rs = predictor.evaluate_many(&snap, black_box(&many));
            black_box(rs.len());
        })
    });
}

criterion_group!(
    perf,
    bench_minutes_parse,
    bench_ingest,
    bench_snapshot_build,
    bench_evaluate
);
criterion_main!(perf);

static BG_HISTORY_JSON: &str = include_str!("../tests/fixtures/bg_history.json");
