// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//! Timezone rules for timestamp rebasing.
//!
//! Timestamp columns store seconds from the format epoch (2015-01-01
//! 00:00:00) read as a wall-clock time in the writer's timezone. Every
//! instant in this module is expressed relative to the UTC format epoch:
//! `epoch_offset` shifts a stored value into that frame, and `variant_at`
//! looks up the rules in force at such an instant, including which side of
//! a DST transition it falls on.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

use crate::error::{OrcError, Result};

/// Unix seconds of 2015-01-01 00:00:00 UTC.
const FORMAT_EPOCH_UTC: i64 = 1_420_070_400;

/// Instants (relative to the format epoch) outside this range are clamped
/// before rule lookup; no timezone database has transitions beyond it.
const MAX_RULE_INSTANT: i64 = 8_000_000_000_000;

/// Offset rules of one timezone at one instant.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimezoneVariant {
    /// Total offset from UTC in seconds, DST included.
    pub gmt_offset: i64,
    pub is_dst: bool,
}

impl TimezoneVariant {
    /// Whether two variants apply the same rule (same offset, same DST
    /// state). Differing rules force a wall-clock rebase.
    pub fn has_same_rule(&self, other: &TimezoneVariant) -> bool {
        self.gmt_offset == other.gmt_offset && self.is_dst == other.is_dst
    }
}

/// Timezone rules as consumed by the timestamp reader.
pub trait Timezone: Send + Sync {
    /// IANA name, also the identity used to detect writer == reader.
    fn name(&self) -> &str;

    /// Seconds between the UTC format epoch and the zone's wall-clock
    /// format epoch. Zero for GMT.
    fn epoch_offset(&self) -> i64;

    /// The rule in force at `epoch_seconds`, seconds relative to the
    /// format epoch.
    fn variant_at(&self, epoch_seconds: i64) -> TimezoneVariant;
}

/// [`Timezone`] backed by the bundled IANA database.
#[derive(Debug)]
pub struct TzRules {
    tz: Tz,
    name: String,
    epoch_offset: i64,
}

impl TzRules {
    pub fn new(tz: Tz) -> Self {
        let epoch_offset = local_format_epoch(tz) - FORMAT_EPOCH_UTC;
        TzRules {
            name: tz.name().to_string(),
            tz,
            epoch_offset,
        }
    }

    pub fn gmt() -> Self {
        TzRules::new(Tz::GMT)
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name.parse().map_err(|_| {
            OrcError::parse(format!("unknown timezone name: timezone={}", name))
        })?;
        Ok(TzRules::new(tz))
    }
}

impl Timezone for TzRules {
    fn name(&self) -> &str {
        &self.name
    }

    fn epoch_offset(&self) -> i64 {
        self.epoch_offset
    }

    fn variant_at(&self, epoch_seconds: i64) -> TimezoneVariant {
        let unix = epoch_seconds
            .clamp(-MAX_RULE_INSTANT, MAX_RULE_INSTANT)
            .saturating_add(FORMAT_EPOCH_UTC);
        match DateTime::<Utc>::from_timestamp(unix, 0) {
            Some(instant) => {
                let offset = self.tz.offset_from_utc_datetime(&instant.naive_utc());
                let dst = offset.dst_offset();
                TimezoneVariant {
                    gmt_offset: (offset.base_utc_offset() + dst).num_seconds(),
                    is_dst: !dst.is_zero(),
                }
            }
            None => TimezoneVariant {
                gmt_offset: 0,
                is_dst: false,
            },
        }
    }
}

/// Unix seconds of the format epoch read as a wall-clock time in `tz`.
fn local_format_epoch(tz: Tz) -> i64 {
    let Some(naive) = NaiveDate::from_ymd_opt(2015, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return FORMAT_EPOCH_UTC;
    };
    match tz.from_local_datetime(&naive).earliest() {
        Some(instant) => instant.timestamp(),
        None => FORMAT_EPOCH_UTC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gmt_epoch_offset_is_zero() {
        let gmt = TzRules::gmt();
        assert_eq!(gmt.epoch_offset(), 0);
        let variant = gmt.variant_at(0);
        assert_eq!(variant.gmt_offset, 0);
        assert!(!variant.is_dst);
    }

    #[test]
    fn los_angeles_epoch_is_shifted() {
        let la = TzRules::from_name("America/Los_Angeles").expect("zone");
        // Midnight 2015-01-01 in Los Angeles is 08:00 UTC.
        assert_eq!(la.epoch_offset(), 8 * 3600);
    }

    #[test]
    fn dst_variant_differs_across_transition() {
        let la = TzRules::from_name("America/Los_Angeles").expect("zone");
        // Mid-January 2015 (standard time) vs mid-July 2015 (daylight).
        let winter = la.variant_at(14 * 86_400);
        let summer = la.variant_at(195 * 86_400);
        assert_eq!(winter.gmt_offset, -8 * 3600);
        assert!(!winter.is_dst);
        assert_eq!(summer.gmt_offset, -7 * 3600);
        assert!(summer.is_dst);
        assert!(!winter.has_same_rule(&summer));
    }

    #[test]
    fn unknown_zone_name_is_rejected() {
        let err = TzRules::from_name("Not/AZone").expect_err("bad name");
        assert!(err.to_string().contains("unknown timezone"), "err={}", err);
    }
}
