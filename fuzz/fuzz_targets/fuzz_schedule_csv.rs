#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(entries) = drawctl_config::read_schedule(data) else {
        return;
    };
    for e in &entries {
        // Every accepted row must render back to a parseable time of day
        let s = drawctl_config::format_time_of_day(e.time_of_day);
        assert_eq!(drawctl_config::parse_time_of_day(&s).ok(), Some(e.time_of_day));
        assert!(e.target_volume.is_finite());
    }
});
