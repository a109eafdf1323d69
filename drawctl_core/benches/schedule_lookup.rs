use criterion::{Criterion, black_box, criterion_group, criterion_main};
use drawctl_config::ScheduleEntry;
use drawctl_core::ScheduleTable;
use time::Time;

// A dense day: one entry every 15 s
fn synth_schedule() -> Vec<ScheduleEntry> {
    (0..86_400u32)
        .step_by(15)
        .filter_map(|s| {
            let t = Time::from_hms((s / 3600) as u8, ((s / 60) % 60) as u8, (s % 60) as u8).ok()?;
            Some(ScheduleEntry {
                time_of_day: t,
                target_volume: f64::from(s % 7) * 0.25,
            })
        })
        .collect()
}

fn bench_lookup(c: &mut Criterion) {
    let entries = synth_schedule();
    let table = ScheduleTable::new(entries.clone());
    let queries: Vec<Time> = (0..86_400u32)
        .step_by(7)
        .filter_map(|s| Time::from_hms((s / 3600) as u8, ((s / 60) % 60) as u8, (s % 60) as u8).ok())
        .collect();

    c.bench_function("indexed_lookup_day", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for t in &queries {
                sum += table.lookup(black_box(*t));
            }
            black_box(sum)
        })
    });

    // Reference: reverse linear scan, same answer
    c.bench_function("linear_scan_day", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for t in queries.iter().take(500) {
                sum += entries
                    .iter()
                    .rev()
                    .find(|e| e.time_of_day == *t)
                    .map_or(0.0, |e| e.target_volume);
            }
            black_box(sum)
        })
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
