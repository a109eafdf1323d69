use std::fs::{self, File};
use std::io::Write;

use drawctl_config::{
    ExpandCfg, GridMode, PeriodKind, ScheduleEntry, load_period_plan_csv, load_schedule_csv,
    write_schedule_csv,
};
use rstest::rstest;
use tempfile::tempdir;
use time::macros::time;

#[rstest]
fn loads_headerless_schedule_in_file_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("12H-WDP.csv");
    fs::write(&path, "06:00:00,1.25\n06:00:00,0.5\n18:30,2\n").unwrap();

    let rows = load_schedule_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            ScheduleEntry {
                time_of_day: time!(6:00:00),
                target_volume: 1.25
            },
            ScheduleEntry {
                time_of_day: time!(6:00:00),
                target_volume: 0.5
            },
            ScheduleEntry {
                time_of_day: time!(18:30:00),
                target_volume: 2.0
            },
        ]
    );
}

#[rstest]
fn empty_schedule_is_not_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    File::create(&path).unwrap();
    assert!(load_schedule_csv(&path).unwrap().is_empty());
}

#[rstest]
fn bad_row_reports_row_number_and_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "06:00:00,1.0").unwrap();
    writeln!(f, "06:00:01,lots").unwrap();
    drop(f);

    let err = load_schedule_csv(&path).expect_err("should fail on non-numeric volume");
    let msg = format!("{err}");
    assert!(msg.contains("row 2"), "{msg}");
    assert!(msg.contains("bad.csv"), "{msg}");
}

#[rstest]
fn missing_schedule_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = load_schedule_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(format!("{err}").contains("open schedule CSV"));
}

#[rstest]
fn written_schedule_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let entries = vec![
        ScheduleEntry {
            time_of_day: time!(5:00),
            target_volume: 0.5,
        },
        ScheduleEntry {
            time_of_day: time!(5:15),
            target_volume: 0.75,
        },
    ];
    write_schedule_csv(&path, &entries).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "05:00:00,0.5\n05:15:00,0.75\n"
    );
    assert_eq!(load_schedule_csv(&path).unwrap(), entries);
}

#[rstest]
fn plan_csv_with_blank_morning_periods() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Testing_schedule.csv");
    fs::write(
        &path,
        "M_LU_time,M_LU_duration,M_S_time,M_S_duration,E_LU_time,E_LU_duration,E_S_time,E_S_duration\n\
         ,,,,11:00,4.0,17:00,3.5\n",
    )
    .unwrap();

    let plan = load_period_plan_csv(&path).unwrap();
    assert_eq!(plan.periods().len(), 2);
    assert_eq!(plan.periods()[0].kind, PeriodKind::LoadUp);
    assert_eq!(plan.periods()[0].label, "Evening Load-up");
    assert_eq!(plan.periods()[1].duration_secs, 12_600);
    assert_eq!(plan.mode_at(time!(20:29:59)), GridMode::Shed);
    assert_eq!(plan.mode_at(time!(20:30)), GridMode::Baseline);

    let entries = plan
        .expand(&ExpandCfg {
            interval_min: 60,
            load_up_volume: 1.0,
            baseline_volume: 0.0,
        })
        .unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3].time_of_day, time!(14:00));
}

#[rstest]
#[case("06:00,0\n", "duration")]
#[case("25:00,1\n", "out of range")]
fn plan_rejects_bad_periods(#[case] morning: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    let body = format!(
        "M_LU_time,M_LU_duration,M_S_time,M_S_duration,E_LU_time,E_LU_duration,E_S_time,E_S_duration\n{},,,,,,\n",
        morning.trim_end()
    );
    fs::write(&path, body).unwrap();
    let err = load_period_plan_csv(&path).expect_err("plan should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains("row 2"), "{msg}");
    assert!(msg.contains(needle), "{msg}");
}
