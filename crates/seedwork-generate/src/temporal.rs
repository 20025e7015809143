//! Timestamp sampling within legal bounds.
//!
//! Every function here is pure apart from the generator passed in; all
//! results are whole seconds.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use rand::Rng;

use crate::errors::GenerationError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Shaping strategy applied when sampling inside an interval.
#[derive(Debug, Clone, PartialEq)]
pub enum Bias {
    Uniform,
    /// Monday-first weights; a draw on a low-weight day is nudged toward
    /// Monday..Wednesday of the same week.
    DayOfWeek([f64; 7]),
    /// Offset from the lower bound drawn from a log-normal distribution (days).
    LogNormal {
        location: f64,
        scale: f64,
        min_span: Duration,
        max_span: Duration,
    },
}

impl Bias {
    /// Completion latency: median around three days, capped at two weeks.
    pub fn completion_latency() -> Self {
        Bias::LogNormal {
            location: 1.1,
            scale: 0.8,
            min_span: Duration::seconds(8_640),
            max_span: Duration::days(14),
        }
    }
}

/// Sample `t` with `lower <= t <= upper` following `bias`.
///
/// Bounds that share one second yield that second, truncated.
pub fn pick_timestamp<R: Rng + ?Sized>(
    lower: NaiveDateTime,
    upper: NaiveDateTime,
    bias: &Bias,
    rng: &mut R,
) -> Result<NaiveDateTime, GenerationError> {
    if lower > upper {
        return Err(GenerationError::Range { lower, upper });
    }

    let lo = ceil_seconds(lower);
    let hi = upper.and_utc().timestamp();
    if lo > hi {
        // Both bounds fall inside the same second.
        return Ok(from_seconds(hi));
    }

    let secs = match bias {
        Bias::Uniform => rng.random_range(lo..=hi),
        Bias::DayOfWeek(weights) => day_of_week_seconds(lo, hi, weights, rng),
        Bias::LogNormal {
            location,
            scale,
            min_span,
            max_span,
        } => log_normal_seconds(lo, hi, *location, *scale, *min_span, *max_span, rng),
    };

    Ok(from_seconds(secs.clamp(lo, hi)))
}

/// Uniform sample in `[anchor + min_offset, min(anchor + max_offset, ceiling)]`.
///
/// A window that collapses below its lower edge is reported as
/// [`GenerationError::Range`] so the caller can retry with a clamped interval.
pub fn pick_after<R: Rng + ?Sized>(
    anchor: NaiveDateTime,
    min_offset: Duration,
    max_offset: Duration,
    ceiling: NaiveDateTime,
    rng: &mut R,
) -> Result<NaiveDateTime, GenerationError> {
    let lower = anchor + min_offset;
    let upper = (anchor + max_offset).min(ceiling);
    pick_timestamp(lower, upper, &Bias::Uniform, rng)
}

/// Uniform date in `[start, end]`; returns `start` when the range is inverted.
pub fn pick_date<R: Rng + ?Sized>(start: NaiveDate, end: NaiveDate, rng: &mut R) -> NaiveDate {
    let span = (end - start).num_days();
    if span <= 0 {
        return start;
    }
    start + Duration::days(rng.random_range(0..=span))
}

/// Move a Saturday or Sunday to the following Monday with `probability`.
pub fn avoid_weekend<R: Rng + ?Sized>(date: NaiveDate, probability: f64, rng: &mut R) -> NaiveDate {
    if !rng.random_bool(probability) {
        return date;
    }
    match date.weekday().num_days_from_monday() {
        5 => date + Duration::days(2),
        6 => date + Duration::days(1),
        _ => date,
    }
}

/// End of the sprint containing `date`, for sprints starting on Mondays.
pub fn sprint_end(date: NaiveDate, sprint_days: i64) -> NaiveDate {
    let since_start = i64::from(date.weekday().num_days_from_monday());
    let mut until_end = sprint_days - since_start;
    if until_end <= 0 {
        until_end += sprint_days;
    }
    date + Duration::days(until_end)
}

/// Midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn day_of_week_seconds<R: Rng + ?Sized>(lo: i64, hi: i64, weights: &[f64; 7], rng: &mut R) -> i64 {
    let secs = rng.random_range(lo..=hi);
    let weekday = from_seconds(secs).weekday().num_days_from_monday() as i64;
    let weight = weights[weekday as usize].clamp(0.0, 1.0);
    if rng.random::<f64>() <= weight {
        return secs;
    }
    let target = rng.random_range(0..=2_i64);
    (secs + (target - weekday) * SECONDS_PER_DAY as i64).clamp(lo, hi)
}

fn log_normal_seconds<R: Rng + ?Sized>(
    lo: i64,
    hi: i64,
    location: f64,
    scale: f64,
    min_span: Duration,
    max_span: Duration,
    rng: &mut R,
) -> i64 {
    let span = hi - lo;
    if span <= 1 {
        return hi;
    }

    let days = (location + scale * standard_normal(rng)).exp();
    let min_secs = min_span.num_seconds().max(1) as f64;
    let max_secs = max_span.num_seconds().max(1) as f64;
    let offset = (days * SECONDS_PER_DAY).clamp(min_secs, max_secs.max(min_secs)) as i64;

    let candidate = lo + offset;
    if candidate <= hi {
        return candidate;
    }

    // Past the upper bound: back off by up to two days, never onto `lo`.
    let jitter = rng.random_range(3_600..=172_800_i64).min(span - 1);
    hi - jitter
}

/// Box-Muller transform over two uniform draws.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn ceil_seconds(value: NaiveDateTime) -> i64 {
    let utc = value.and_utc();
    let secs = utc.timestamp();
    if utc.timestamp_subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

fn from_seconds(secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(secs, 0)
        .map(|value| value.naive_utc())
        .unwrap_or(NaiveDateTime::MIN)
}
