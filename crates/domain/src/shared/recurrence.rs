use chrono::{prelude::*, Days, Duration, LocalResult, Months, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// The unit a `RepeatRule` steps by.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    None,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

/// How long a `RepeatRule` keeps producing occurrences
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepeatDuration {
    Forever,
    /// Total number of occurrences, including the first one
    Count { count: u32 },
    /// Occurrences must be strictly before this instant
    Until { until: DateTime<Utc> },
}

impl Default for RepeatDuration {
    fn default() -> Self {
        Self::Forever
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepeatRule {
    #[serde(rename = "type")]
    pub repeat_type: RepeatType,
    pub interval: u32,
    /// Weekdays with 0 = Sunday .. 6 = Saturday. Only used for `RepeatType::Weeks`.
    #[serde(default)]
    pub week_days: BTreeSet<u8>,
    #[serde(default)]
    pub duration: RepeatDuration,
}

impl Default for RepeatRule {
    fn default() -> Self {
        Self::once()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidRuleError {
    #[error("Repeat interval must be at least 1")]
    ZeroInterval,
    #[error("Repeat count must be at least 1")]
    ZeroCount,
    #[error("Invalid weekday specified: {0}")]
    InvalidWeekDay(u8),
}

impl RepeatRule {
    /// A rule that produces the anchor and nothing else
    pub fn once() -> Self {
        Self {
            repeat_type: RepeatType::None,
            interval: 1,
            week_days: BTreeSet::new(),
            duration: RepeatDuration::Forever,
        }
    }

    pub fn every(repeat_type: RepeatType, interval: u32, duration: RepeatDuration) -> Self {
        Self {
            repeat_type,
            interval,
            week_days: BTreeSet::new(),
            duration,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidRuleError> {
        if self.interval == 0 {
            return Err(InvalidRuleError::ZeroInterval);
        }
        if let RepeatDuration::Count { count: 0 } = self.duration {
            return Err(InvalidRuleError::ZeroCount);
        }
        if let Some(day) = self.week_days.iter().find(|d| **d > 6) {
            return Err(InvalidRuleError::InvalidWeekDay(*day));
        }
        Ok(())
    }

    /// Upper bound of occurrences this rule can produce, `None` when unbounded
    /// by count.
    pub fn max_count(&self) -> Option<u32> {
        match (&self.repeat_type, &self.duration) {
            (RepeatType::None, _) => Some(1),
            (_, RepeatDuration::Count { count }) => Some(*count),
            _ => None,
        }
    }

    fn walks_week_days(&self) -> bool {
        self.repeat_type == RepeatType::Weeks && !self.week_days.is_empty()
    }
}

/// Produces the occurrences of `rule` anchored at `anchor`, skipping the first
/// `already_emitted` of them.
///
/// The returned iterator is lazy and may be infinite for `RepeatDuration::Forever`,
/// so callers must bound consumption.
pub fn next_occurrences(
    anchor: DateTime<Tz>,
    rule: &RepeatRule,
    already_emitted: u32,
) -> Result<Occurrences, InvalidRuleError> {
    rule.validate()?;

    let mut occurrences = Occurrences {
        anchor,
        rule: rule.clone(),
        emitted: 0,
        day_offset: 0,
        done: false,
    };
    if rule.walks_week_days() {
        // The weekday walk has no closed form, so step over the
        // already emitted matches
        for _ in 0..already_emitted {
            if occurrences.next_week_day().is_none() {
                occurrences.done = true;
                break;
            }
        }
    }
    occurrences.emitted = already_emitted;

    Ok(occurrences)
}

#[derive(Debug, Clone)]
pub struct Occurrences {
    anchor: DateTime<Tz>,
    rule: RepeatRule,
    /// Index of the next occurrence to produce
    emitted: u32,
    /// Days walked from the anchor date, only used by the weekday walk
    day_offset: u64,
    done: bool,
}

impl Occurrences {
    /// Index the next produced occurrence will have
    pub fn next_index(&self) -> u32 {
        self.emitted
    }

    fn flat_at(&self, index: u32) -> Option<DateTime<Tz>> {
        let steps = i64::from(index).checked_mul(i64::from(self.rule.interval))?;
        let tz = self.anchor.timezone();
        match self.rule.repeat_type {
            RepeatType::None => (index == 0).then(|| self.anchor),
            RepeatType::Minutes => self
                .anchor
                .checked_add_signed(Duration::try_minutes(steps)?),
            RepeatType::Hours => self.anchor.checked_add_signed(Duration::try_hours(steps)?),
            RepeatType::Days => add_local_days(&self.anchor, &tz, steps),
            RepeatType::Weeks => add_local_days(&self.anchor, &tz, steps.checked_mul(7)?),
            RepeatType::Months => add_local_months(&self.anchor, &tz, steps),
            RepeatType::Years => add_local_months(&self.anchor, &tz, steps.checked_mul(12)?),
        }
    }

    fn next_week_day(&mut self) -> Option<DateTime<Tz>> {
        let tz = self.anchor.timezone();
        let local_anchor = self.anchor.naive_local();
        let anchor_weekday = u64::from(local_anchor.weekday().num_days_from_sunday());
        let interval = u64::from(self.rule.interval);

        loop {
            let offset = self.day_offset;
            self.day_offset += 1;

            let week = (offset + anchor_weekday) / 7;
            if week % interval != 0 {
                continue;
            }
            let date = local_anchor.date().checked_add_days(Days::new(offset))?;
            let weekday = date.weekday().num_days_from_sunday() as u8;
            if !self.rule.week_days.contains(&weekday) {
                continue;
            }
            let candidate = localize(&tz, date.and_time(local_anchor.time()))?;
            if candidate < self.anchor {
                continue;
            }
            return Some(candidate);
        }
    }
}

impl Iterator for Occurrences {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(max) = self.rule.max_count() {
            if self.emitted >= max {
                self.done = true;
                return None;
            }
        }

        let candidate = if self.rule.walks_week_days() {
            self.next_week_day()
        } else {
            self.flat_at(self.emitted)
        };
        let candidate = match candidate {
            Some(c) => c,
            None => {
                self.done = true;
                return None;
            }
        };

        if let RepeatDuration::Until { until } = &self.rule.duration {
            if candidate.with_timezone(&Utc) >= *until {
                self.done = true;
                return None;
            }
        }

        self.emitted += 1;
        Some(candidate)
    }
}

fn add_local_days(anchor: &DateTime<Tz>, tz: &Tz, days: i64) -> Option<DateTime<Tz>> {
    let days = u64::try_from(days).ok()?;
    let naive = anchor.naive_local().checked_add_days(Days::new(days))?;
    localize(tz, naive)
}

fn add_local_months(anchor: &DateTime<Tz>, tz: &Tz, months: i64) -> Option<DateTime<Tz>> {
    let months = u32::try_from(months).ok()?;
    let naive = anchor.naive_local().checked_add_months(Months::new(months))?;
    localize(tz, naive)
}

/// Resolves a wall clock time in `tz`. Times skipped by a DST transition are
/// moved forward by an hour and ambiguous times resolve to the earliest instant.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono_tz::{America::Sao_Paulo, Europe::Oslo, UTC};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        UTC.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn week_days(days: &[u8]) -> BTreeSet<u8> {
        days.iter().copied().collect()
    }

    #[test]
    fn daily_rule_with_count_of_three() {
        let rule = RepeatRule::every(RepeatType::Days, 1, RepeatDuration::Count { count: 3 });
        let occurrences = next_occurrences(utc(2024, 1, 1, 9, 0), &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();

        assert_eq!(
            occurrences,
            vec![
                utc(2024, 1, 1, 9, 0),
                utc(2024, 1, 2, 9, 0),
                utc(2024, 1, 3, 9, 0)
            ]
        );
    }

    #[test]
    fn count_yields_exactly_n_elements() {
        for repeat_type in [
            RepeatType::Minutes,
            RepeatType::Hours,
            RepeatType::Days,
            RepeatType::Weeks,
            RepeatType::Months,
            RepeatType::Years,
        ] {
            for count in 1..8 {
                let rule = RepeatRule::every(repeat_type, 2, RepeatDuration::Count { count });
                let n = next_occurrences(utc(2024, 1, 31, 12, 0), &rule, 0)
                    .unwrap()
                    .count();
                assert_eq!(n as u32, count, "{:?} with count {}", repeat_type, count);
            }
        }
    }

    #[test]
    fn count_is_tracked_through_already_emitted() {
        let rule = RepeatRule::every(RepeatType::Hours, 1, RepeatDuration::Count { count: 5 });
        let anchor = utc(2024, 1, 1, 0, 0);
        let rest = next_occurrences(anchor, &rule, 3)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(rest, vec![utc(2024, 1, 1, 3, 0), utc(2024, 1, 1, 4, 0)]);

        assert_eq!(next_occurrences(anchor, &rule, 5).unwrap().count(), 0);
        assert_eq!(next_occurrences(anchor, &rule, 9).unwrap().count(), 0);
    }

    #[test]
    fn until_stops_before_the_bound() {
        let until = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let rule = RepeatRule::every(RepeatType::Days, 1, RepeatDuration::Until { until });
        let anchor = utc(2024, 1, 1, 9, 0);
        let occurrences = next_occurrences(anchor, &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();

        assert_eq!(occurrences.len(), 4);
        assert!(occurrences.iter().all(|o| o.with_timezone(&Utc) < until));
        // The next step would not have been before the bound either
        let next = *occurrences.last().unwrap() + Duration::days(1);
        assert!(next.with_timezone(&Utc) >= until);
    }

    #[test]
    fn until_before_anchor_is_empty() {
        let until = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
        let rule = RepeatRule::every(RepeatType::Weeks, 1, RepeatDuration::Until { until });
        assert_eq!(
            next_occurrences(utc(2024, 1, 1, 9, 0), &rule, 0)
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn none_yields_only_the_anchor() {
        let rule = RepeatRule::once();
        let anchor = utc(2024, 6, 1, 8, 30);
        let occurrences = next_occurrences(anchor, &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(occurrences, vec![anchor]);

        assert_eq!(next_occurrences(anchor, &rule, 1).unwrap().count(), 0);
    }

    #[test]
    fn forever_is_unbounded_and_strictly_increasing() {
        let rule = RepeatRule::every(RepeatType::Minutes, 15, RepeatDuration::Forever);
        let occurrences = next_occurrences(utc(2024, 1, 1, 0, 0), &rule, 0)
            .unwrap()
            .take(500)
            .collect::<Vec<_>>();
        assert_eq!(occurrences.len(), 500);
        assert!(occurrences.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(occurrences[4], utc(2024, 1, 1, 1, 0));
    }

    #[test]
    fn zero_interval_fails_fast() {
        let rule = RepeatRule::every(RepeatType::Days, 0, RepeatDuration::Forever);
        assert_eq!(
            next_occurrences(utc(2024, 1, 1, 0, 0), &rule, 0).unwrap_err(),
            InvalidRuleError::ZeroInterval
        );
    }

    #[test]
    fn rejects_malformed_rules() {
        let rule = RepeatRule::every(RepeatType::Days, 1, RepeatDuration::Count { count: 0 });
        assert_eq!(rule.validate(), Err(InvalidRuleError::ZeroCount));

        let mut rule = RepeatRule::every(RepeatType::Weeks, 1, RepeatDuration::Forever);
        rule.week_days = week_days(&[1, 7]);
        assert_eq!(rule.validate(), Err(InvalidRuleError::InvalidWeekDay(7)));
    }

    #[test]
    fn monthly_rule_clamps_to_end_of_month() {
        let rule = RepeatRule::every(RepeatType::Months, 1, RepeatDuration::Count { count: 3 });
        let occurrences = next_occurrences(utc(2024, 1, 31, 10, 0), &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(
            occurrences,
            vec![
                utc(2024, 1, 31, 10, 0),
                utc(2024, 2, 29, 10, 0),
                utc(2024, 3, 31, 10, 0)
            ]
        );
    }

    #[test]
    fn yearly_rule() {
        let rule = RepeatRule::every(RepeatType::Years, 2, RepeatDuration::Count { count: 2 });
        let occurrences = next_occurrences(utc(2024, 3, 1, 10, 0), &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(
            occurrences,
            vec![utc(2024, 3, 1, 10, 0), utc(2026, 3, 1, 10, 0)]
        );
    }

    #[test]
    fn weekly_rule_walks_selected_weekdays() {
        // 2024-01-01 is a Monday
        let mut rule = RepeatRule::every(RepeatType::Weeks, 1, RepeatDuration::Count { count: 4 });
        rule.week_days = week_days(&[1, 3]);
        let occurrences = next_occurrences(utc(2024, 1, 1, 9, 0), &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(
            occurrences,
            vec![
                utc(2024, 1, 1, 9, 0),
                utc(2024, 1, 3, 9, 0),
                utc(2024, 1, 8, 9, 0),
                utc(2024, 1, 10, 9, 0)
            ]
        );
    }

    #[test]
    fn weekday_walk_honors_interval_and_already_emitted() {
        // Every other week on Fridays, starting Monday 2024-01-01
        let mut rule = RepeatRule::every(RepeatType::Weeks, 2, RepeatDuration::Forever);
        rule.week_days = week_days(&[5]);
        let anchor = utc(2024, 1, 1, 9, 0);
        let occurrences = next_occurrences(anchor, &rule, 0)
            .unwrap()
            .take(3)
            .collect::<Vec<_>>();
        assert_eq!(
            occurrences,
            vec![
                utc(2024, 1, 5, 9, 0),
                utc(2024, 1, 19, 9, 0),
                utc(2024, 2, 2, 9, 0)
            ]
        );

        let mut skipped = next_occurrences(anchor, &rule, 2).unwrap();
        assert_eq!(skipped.next_index(), 2);
        assert_eq!(skipped.next(), Some(utc(2024, 2, 2, 9, 0)));
    }

    #[test]
    fn weekday_walk_includes_matching_anchor_day() {
        // Wednesday 2024-01-03 at 18:00
        let mut rule = RepeatRule::every(RepeatType::Weeks, 1, RepeatDuration::Count { count: 1 });
        rule.week_days = week_days(&[3]);
        let anchor = utc(2024, 1, 3, 18, 0);
        let first = next_occurrences(anchor, &rule, 0).unwrap().next();
        assert_eq!(first, Some(anchor));
    }

    #[test]
    fn day_steps_keep_local_wall_clock_across_dst() {
        // Oslo switches to summer time on 2024-03-31
        let anchor = Oslo.with_ymd_and_hms(2024, 3, 30, 9, 0, 0).unwrap();
        let rule = RepeatRule::every(RepeatType::Days, 1, RepeatDuration::Count { count: 2 });
        let occurrences = next_occurrences(anchor, &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(occurrences[1].hour(), 9);
        assert_eq!(
            (occurrences[1] - occurrences[0]).num_hours(),
            23,
            "A local day across the transition is 23 hours long"
        );
    }

    #[test]
    fn localizes_in_other_timezones() {
        let anchor = Sao_Paulo.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap();
        let rule = RepeatRule::every(RepeatType::Weeks, 1, RepeatDuration::Count { count: 2 });
        let occurrences = next_occurrences(anchor, &rule, 0)
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(
            occurrences[1],
            Sao_Paulo.with_ymd_and_hms(2024, 5, 17, 20, 0, 0).unwrap()
        );
    }

    #[test]
    fn deserializes_tagged_rule() {
        let rule: RepeatRule = serde_json::from_str(
            r#"{"type":"weeks","interval":1,"weekDays":[0,6],"duration":{"type":"count","count":3}}"#,
        )
        .unwrap();
        assert_eq!(rule.repeat_type, RepeatType::Weeks);
        assert_eq!(rule.week_days, week_days(&[0, 6]));
        assert_eq!(rule.duration, RepeatDuration::Count { count: 3 });

        let rule: RepeatRule =
            serde_json::from_str(r#"{"type":"none","interval":1}"#).unwrap();
        assert_eq!(rule, RepeatRule::once());
    }
}
