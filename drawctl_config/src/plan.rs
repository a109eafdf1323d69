//! Two-period load-up/shed plans and their expansion into draw schedules.
//!
//! Expected headers (one or more rows; blank cells mean the period is absent):
//! M_LU_time,M_LU_duration,M_S_time,M_S_duration,E_LU_time,E_LU_duration,E_S_time,E_S_duration
//!
//! Times are `HH:MM`, durations are hours.
use std::path::Path;

use serde::Deserialize;
use time::Time;

use crate::schedule::{ScheduleEntry, parse_time_of_day};

const SECS_PER_DAY: u32 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    LoadUp,
    Shed,
}

/// Operating mode the water heater should be in at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridMode {
    LoadUp,
    Shed,
    Baseline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub kind: PeriodKind,
    pub label: &'static str,
    pub start: Time,
    pub duration_secs: u32,
}

impl Period {
    fn start_secs(&self) -> u32 {
        let (h, m, s) = self.start.as_hms();
        u32::from(h) * 3600 + u32::from(m) * 60 + u32::from(s)
    }

    /// Whether `t` falls inside the period, wrapping past midnight.
    pub fn contains(&self, t: Time) -> bool {
        let offset = (secs_of_day(t) + SECS_PER_DAY - self.start_secs()) % SECS_PER_DAY;
        offset < self.duration_secs
    }
}

fn secs_of_day(t: Time) -> u32 {
    let (h, m, s) = t.as_hms();
    u32::from(h) * 3600 + u32::from(m) * 60 + u32::from(s)
}

fn time_from_secs(secs: u32) -> Time {
    let secs = secs % SECS_PER_DAY;
    // Components are in range by construction.
    Time::from_hms((secs / 3600) as u8, ((secs / 60) % 60) as u8, (secs % 60) as u8)
        .unwrap_or(Time::MIDNIGHT)
}

#[derive(Debug, Deserialize)]
struct PlanRow {
    #[serde(rename = "M_LU_time")]
    m_lu_time: Option<String>,
    #[serde(rename = "M_LU_duration")]
    m_lu_duration: Option<f64>,
    #[serde(rename = "M_S_time")]
    m_s_time: Option<String>,
    #[serde(rename = "M_S_duration")]
    m_s_duration: Option<f64>,
    #[serde(rename = "E_LU_time")]
    e_lu_time: Option<String>,
    #[serde(rename = "E_LU_duration")]
    e_lu_duration: Option<f64>,
    #[serde(rename = "E_S_time")]
    e_s_time: Option<String>,
    #[serde(rename = "E_S_duration")]
    e_s_duration: Option<f64>,
}

fn period(
    kind: PeriodKind,
    label: &'static str,
    time: Option<&str>,
    hours: Option<f64>,
) -> eyre::Result<Option<Period>> {
    let (Some(time), Some(hours)) = (time.filter(|t| !t.trim().is_empty()), hours) else {
        return Ok(None);
    };
    if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
        eyre::bail!("{label}: duration must be in (0, 24] hours, got {hours}");
    }
    let start = parse_time_of_day(time).map_err(|e| eyre::eyre!("{label}: {e}"))?;
    Ok(Some(Period {
        kind,
        label,
        start,
        duration_secs: (hours * 3600.0).round() as u32,
    }))
}

/// Parameters for turning a plan into discrete draws.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExpandCfg {
    /// Minutes between consecutive draws
    pub interval_min: u32,
    /// Volume of each draw inside a load-up period
    pub load_up_volume: f64,
    /// Volume of each draw outside any period (0 disables)
    pub baseline_volume: f64,
}

impl Default for ExpandCfg {
    fn default() -> Self {
        Self {
            interval_min: 15,
            load_up_volume: 0.5,
            baseline_volume: 0.0,
        }
    }
}

impl ExpandCfg {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.interval_min == 0 || self.interval_min > 24 * 60 {
            eyre::bail!("expand.interval_min must be in [1, 1440]");
        }
        if !self.load_up_volume.is_finite() || self.load_up_volume < 0.0 {
            eyre::bail!("expand.load_up_volume must be a finite value >= 0");
        }
        if !self.baseline_volume.is_finite() || self.baseline_volume < 0.0 {
            eyre::bail!("expand.baseline_volume must be a finite value >= 0");
        }
        Ok(())
    }
}

/// Load-up and shed periods for one day, sorted by start time.
#[derive(Debug, Clone, Default)]
pub struct PeriodPlan {
    periods: Vec<Period>,
}

impl PeriodPlan {
    pub fn new(mut periods: Vec<Period>) -> Self {
        periods.sort_by_key(|p| p.start);
        Self { periods }
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Mode at `t`. When periods overlap, the earliest-starting one wins.
    pub fn mode_at(&self, t: Time) -> GridMode {
        match self.periods.iter().find(|p| p.contains(t)) {
            Some(p) if p.kind == PeriodKind::LoadUp => GridMode::LoadUp,
            Some(_) => GridMode::Shed,
            None => GridMode::Baseline,
        }
    }

    /// Expand into schedule entries sorted by time of day.
    ///
    /// Load-up draws are spaced from each period's start; baseline draws sit on
    /// a grid anchored at midnight. Shed periods never draw.
    pub fn expand(&self, cfg: &ExpandCfg) -> eyre::Result<Vec<ScheduleEntry>> {
        cfg.validate()?;
        let step = cfg.interval_min * 60;
        let mut out = Vec::new();

        if cfg.load_up_volume > 0.0 {
            for p in self.periods.iter().filter(|p| p.kind == PeriodKind::LoadUp) {
                let mut offset = 0;
                while offset < p.duration_secs {
                    let t = time_from_secs(p.start_secs() + offset);
                    if self.mode_at(t) == GridMode::LoadUp {
                        out.push(ScheduleEntry {
                            time_of_day: t,
                            target_volume: cfg.load_up_volume,
                        });
                    }
                    offset += step;
                }
            }
        }

        if cfg.baseline_volume > 0.0 {
            for secs in (0..SECS_PER_DAY).step_by(step as usize) {
                let t = time_from_secs(secs);
                if self.mode_at(t) == GridMode::Baseline {
                    out.push(ScheduleEntry {
                        time_of_day: t,
                        target_volume: cfg.baseline_volume,
                    });
                }
            }
        }

        out.sort_by_key(|e| e.time_of_day);
        out.dedup_by_key(|e| e.time_of_day);
        Ok(out)
    }
}

pub fn load_period_plan_csv(path: &Path) -> eyre::Result<PeriodPlan> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open plan CSV {:?}: {}", path, e))?;

    let mut periods = Vec::new();
    for (idx, rec) in rdr.deserialize::<PlanRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid plan CSV row {}: {}", idx + 2, e))?;
        let candidates = [
            (PeriodKind::LoadUp, "Morning Load-up", row.m_lu_time.as_deref(), row.m_lu_duration),
            (PeriodKind::Shed, "Morning Shed", row.m_s_time.as_deref(), row.m_s_duration),
            (PeriodKind::LoadUp, "Evening Load-up", row.e_lu_time.as_deref(), row.e_lu_duration),
            (PeriodKind::Shed, "Evening Shed", row.e_s_time.as_deref(), row.e_s_duration),
        ];
        for (kind, label, time, hours) in candidates {
            if let Some(p) = period(kind, label, time, hours)
                .map_err(|e| eyre::eyre!("invalid plan CSV row {}: {}", idx + 2, e))?
            {
                periods.push(p);
            }
        }
    }

    let plan = PeriodPlan::new(periods);
    for p in plan.periods() {
        tracing::debug!(
            period = p.label,
            start = %crate::format_time_of_day(p.start),
            hours = f64::from(p.duration_secs) / 3600.0,
            "plan period"
        );
    }
    Ok(plan)
}
