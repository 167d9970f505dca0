// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::nhk_api::{Episode, Tag, join_path};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Documentary 360 episodes are grouped by tag rather than by show.
pub const DOCUMENTARY_360: &str = "Documentary 360";

/// One line of the digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpiringProgramme {
    pub prog_name: String,
    pub ep_name: String,
    pub expired_at: String,
    pub prog_url: String,
    pub ep_url: String,
}

pub fn deadline(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(window).ok_or_else(|| {
        anyhow::anyhow!(
            "Expiry window of {} hours reaches past the last representable date",
            window.num_hours()
        )
    })
}

pub fn parse_expiry(expired_at: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(expired_at)
        .with_context(|| format!("Invalid expiry timestamp '{}'", expired_at))
}

/// Compared at whole-second precision; an expiry equal to the deadline is not "soon".
pub fn expires_before(expiry: &DateTime<FixedOffset>, deadline: &DateTime<Utc>) -> bool {
    deadline.timestamp() > expiry.timestamp()
}

fn is_documentary_360(tags: &[Tag]) -> bool {
    tags.iter().any(|t| t.name == DOCUMENTARY_360)
}

/// Maps an API episode to its digest entry, resolving links against `site_root`.
pub fn project(episode: &Episode, site_root: &Url) -> Result<ExpiringProgramme> {
    let prog_url = join_path(site_root, &episode.video_program.url)?;
    let ep_url = join_path(site_root, &episode.url)?;

    let (prog_name, ep_name) = if is_documentary_360(&episode.tags) {
        (
            DOCUMENTARY_360.to_string(),
            episode.video_program.title.clone(),
        )
    } else if episode.title.is_empty() {
        // One-off programmes without a registered show
        (
            episode.video_program.title.clone(),
            episode.video_program.title.clone(),
        )
    } else {
        (episode.video_program.title.clone(), episode.title.clone())
    };

    Ok(ExpiringProgramme {
        prog_name,
        ep_name,
        expired_at: episode.video.expired_at.clone(),
        prog_url: prog_url.to_string(),
        ep_url: ep_url.to_string(),
    })
}

/// Projects the episode if it expires before `deadline`.
pub fn select(
    episode: &Episode,
    deadline: &DateTime<Utc>,
    site_root: &Url,
) -> Result<Option<ExpiringProgramme>> {
    let expiry = parse_expiry(&episode.video.expired_at)
        .with_context(|| format!("Episode {} has no usable expiry", episode.id))?;

    if !expires_before(&expiry, deadline) {
        return Ok(None);
    }

    project(episode, site_root).map(Some)
}

/// Insertion-ordered set of digest entries; equal entries are kept once.
#[derive(Debug, Default)]
pub struct ProgrammeSet {
    seen: HashSet<ExpiringProgramme>,
    items: Vec<ExpiringProgramme>,
}

impl ProgrammeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if an equal entry was already present.
    pub fn insert(&mut self, programme: ExpiringProgramme) -> bool {
        if self.seen.contains(&programme) {
            return false;
        }
        self.seen.insert(programme.clone());
        self.items.push(programme);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<ExpiringProgramme> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nhk_api::{Video, VideoProgram};
    use chrono::TimeZone;

    fn site() -> Url {
        Url::parse("https://www3.nhk.or.jp/").unwrap()
    }

    fn episode(title: &str, prog: &str, expired_at: &str, tags: &[&str]) -> Episode {
        Episode {
            id: "ep1".to_string(),
            url: "/nhkworld/en/ondemand/video/2058123/".to_string(),
            title: title.to_string(),
            video: Video {
                expired_at: expired_at.to_string(),
            },
            video_program: VideoProgram {
                title: prog.to_string(),
                url: "/nhkworld/en/shows/2058/".to_string(),
            },
            tags: tags
                .iter()
                .map(|name| Tag {
                    id: "0".to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn deadline_is_now_plus_window() {
        assert_eq!(
            deadline(now(), Duration::hours(120)).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 22, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn deadline_past_calendar_end_is_an_error() {
        let window = Duration::try_hours(10_000_000_000).unwrap();
        let err = deadline(now(), window).unwrap_err();
        assert!(err.to_string().contains("10000000000 hours"));
    }

    #[test]
    fn padded_expiry_is_rejected() {
        assert!(parse_expiry(" 2026-10-22T11:59:59Z ").is_err());
        assert!(parse_expiry("2026-10-22T11:59:59Z\n").is_err());
        assert!(parse_expiry("2026-10-22T11:59:59Z").is_ok());
    }

    #[test]
    fn threshold_is_strict_at_second_precision() {
        let limit = deadline(now(), Duration::hours(120)).unwrap();

        let before = parse_expiry("2026-10-22T11:59:59Z").unwrap();
        let equal = parse_expiry("2026-10-22T21:00:00+09:00").unwrap();
        let after = parse_expiry("2026-10-22T12:00:01Z").unwrap();
        let expired = parse_expiry("2020-01-01T00:00:00Z").unwrap();

        assert!(expires_before(&before, &limit));
        assert!(!expires_before(&equal, &limit));
        assert!(!expires_before(&after, &limit));
        assert!(expires_before(&expired, &limit));

        // Sub-second parts are ignored on both sides
        let fractional = parse_expiry("2026-10-22T11:59:59.999Z").unwrap();
        assert!(expires_before(&fractional, &limit));
        let limit_with_nanos = limit + Duration::milliseconds(500);
        assert!(!expires_before(&equal, &limit_with_nanos));
    }

    #[test]
    fn unparseable_expiry_is_an_error() {
        let limit = deadline(now(), Duration::hours(120)).unwrap();
        let ep = episode("Title", "Show", "next tuesday", &[]);
        let err = select(&ep, &limit, &site()).unwrap_err();
        assert!(format!("{:#}", err).contains("ep1"));

        let empty = episode("Title", "Show", "", &[]);
        assert!(select(&empty, &limit, &site()).is_err());
    }

    #[test]
    fn projects_regular_episode() {
        let ep = episode("Ep 5", "Direct Talk", "2026-10-18T00:00:00Z", &["Interview"]);
        let out = project(&ep, &site()).unwrap();
        assert_eq!(
            out,
            ExpiringProgramme {
                prog_name: "Direct Talk".to_string(),
                ep_name: "Ep 5".to_string(),
                expired_at: "2026-10-18T00:00:00Z".to_string(),
                prog_url: "https://www3.nhk.or.jp/nhkworld/en/shows/2058/".to_string(),
                ep_url: "https://www3.nhk.or.jp/nhkworld/en/ondemand/video/2058123/".to_string(),
            }
        );
    }

    #[test]
    fn untitled_episode_takes_programme_name() {
        let ep = episode("", "Special Feature", "2026-10-18T00:00:00Z", &[]);
        let out = project(&ep, &site()).unwrap();
        assert_eq!(out.prog_name, "Special Feature");
        assert_eq!(out.ep_name, "Special Feature");
    }

    #[test]
    fn documentary_360_groups_by_tag() {
        let ep = episode(
            "Part 1",
            "Life on the Ice",
            "2026-10-18T00:00:00Z",
            &["Nature", DOCUMENTARY_360],
        );
        let out = project(&ep, &site()).unwrap();
        assert_eq!(out.prog_name, DOCUMENTARY_360);
        assert_eq!(out.ep_name, "Life on the Ice");
    }

    #[test]
    fn select_skips_late_expiry() {
        let limit = deadline(now(), Duration::hours(120)).unwrap();
        let late = episode("Ep", "Show", "2027-01-01T00:00:00Z", &[]);
        assert!(select(&late, &limit, &site()).unwrap().is_none());

        let soon = episode("Ep", "Show", "2026-10-19T00:00:00+09:00", &[]);
        assert!(select(&soon, &limit, &site()).unwrap().is_some());
    }

    #[test]
    fn set_dedupes_and_keeps_first_order() {
        let a = project(&episode("A", "Show", "2026-10-18T00:00:00Z", &[]), &site()).unwrap();
        let b = project(&episode("B", "Show", "2026-10-18T00:00:00Z", &[]), &site()).unwrap();
        let mut a_other_expiry = a.clone();
        a_other_expiry.expired_at = "2026-10-19T00:00:00Z".to_string();

        let mut set = ProgrammeSet::new();
        assert!(set.insert(b.clone()));
        assert!(set.insert(a.clone()));
        assert!(!set.insert(b.clone()));
        assert!(set.insert(a_other_expiry.clone()));
        assert!(!set.insert(a.clone()));

        assert_eq!(set.len(), 3);
        assert_eq!(set.into_vec(), vec![b, a, a_other_expiry]);
    }
}
