// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::config::Config;
use crate::digest::Digest;
use crate::expiry::{self, ProgrammeSet};
use crate::nhk_api::{Category, Episode, NhkApi};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub window: Duration,
    pub max_pages: usize,
    pub site_root: Url,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let site_root = Url::parse(&config.api.site_root)
            .with_context(|| format!("Invalid site root URL: {}", config.api.site_root))?;
        let hours = i64::try_from(config.scan.window_hours)
            .with_context(|| "Expiry window is too large")?;
        let window = Duration::try_hours(hours)
            .ok_or_else(|| anyhow::anyhow!("Expiry window of {} hours is too large", hours))?;

        // Reject windows that run off the end of the calendar up front
        if Utc::now().checked_add_signed(window).is_none() {
            anyhow::bail!("Expiry window of {} hours is too large", hours);
        }

        if config.scan.max_pages == 0 {
            anyhow::bail!("max_pages must be at least 1");
        }

        Ok(Self {
            window,
            max_pages: config.scan.max_pages,
            site_root,
        })
    }
}

/// Where categories and their episodes come from.
pub(crate) trait Catalogue {
    async fn categories(&self) -> Result<Vec<Category>>;
    async fn episodes(&self, category_id: &str, max_pages: usize) -> Result<Vec<Episode>>;
}

impl Catalogue for NhkApi {
    async fn categories(&self) -> Result<Vec<Category>> {
        self.get_categories().await
    }

    async fn episodes(&self, category_id: &str, max_pages: usize) -> Result<Vec<Episode>> {
        self.get_category_episodes(category_id, max_pages).await
    }
}

/// Walks every category and collects the episodes expiring before `now + window`.
/// The digest is stamped with `now`, the instant the deadline was measured from.
pub async fn scan(api: &NhkApi, options: &ScanOptions, now: DateTime<Utc>) -> Result<Digest> {
    run_scan(api, options, now).await
}

pub(crate) async fn run_scan<C: Catalogue>(
    catalogue: &C,
    options: &ScanOptions,
    now: DateTime<Utc>,
) -> Result<Digest> {
    let categories = catalogue.categories().await?;
    info!("Loaded {} categories", categories.len());

    let deadline = expiry::deadline(now, options.window)?;
    info!("Max expiry date set to '{}'", deadline);

    let mut found = ProgrammeSet::new();

    for category in &categories {
        info!("Scanning category '{}'", category);

        let episodes = catalogue
            .episodes(&category.id, options.max_pages)
            .await?;
        debug!("Category '{}' has {} episodes", category, episodes.len());

        for episode in &episodes {
            if let Some(programme) = expiry::select(episode, &deadline, &options.site_root)? {
                debug!(
                    "{} / {} expires {}",
                    programme.prog_name, programme.ep_name, programme.expired_at
                );
                found.insert(programme);
            }
        }
    }

    info!("Found {} matching VODs", found.len());
    Ok(Digest::new(found.into_vec(), now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nhk_api::{Tag, Video, VideoProgram};
    use chrono::TimeZone;
    use std::collections::HashMap;

    struct FakeCatalogue {
        categories: Vec<Category>,
        episodes: HashMap<String, Vec<Episode>>,
    }

    impl Catalogue for FakeCatalogue {
        async fn categories(&self) -> Result<Vec<Category>> {
            Ok(self.categories.clone())
        }

        async fn episodes(&self, category_id: &str, _max_pages: usize) -> Result<Vec<Episode>> {
            self.episodes
                .get(category_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("HTTP request failed with status: 500"))
        }
    }

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn episode(id: &str, prog: &str, title: &str, expired_at: &str) -> Episode {
        Episode {
            id: id.to_string(),
            url: format!("/nhkworld/en/ondemand/video/{}/", id),
            title: title.to_string(),
            video: Video {
                expired_at: expired_at.to_string(),
            },
            video_program: VideoProgram {
                title: prog.to_string(),
                url: "/nhkworld/en/shows/prog/".to_string(),
            },
            tags: vec![Tag {
                id: "1".to_string(),
                name: "Culture".to_string(),
            }],
        }
    }

    fn options() -> ScanOptions {
        ScanOptions::from_config(&Config::default()).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn collects_soon_expiring_episodes_once() {
        let shared = episode("100", "Japanology", "Tea", "2026-10-18T00:00:00Z");
        let catalogue = FakeCatalogue {
            categories: vec![category("1", "Culture"), category("2", "Food")],
            episodes: HashMap::from([
                (
                    "1".to_string(),
                    vec![
                        shared.clone(),
                        episode("101", "Japanology", "Silk", "2027-03-01T00:00:00Z"),
                    ],
                ),
                (
                    "2".to_string(),
                    vec![
                        episode("200", "Dining", "", "2026-10-21T09:00:00+09:00"),
                        shared,
                    ],
                ),
            ]),
        };

        let digest = run_scan(&catalogue, &options(), now()).await.unwrap();

        let names: Vec<(&str, &str)> = digest
            .progs
            .iter()
            .map(|p| (p.prog_name.as_str(), p.ep_name.as_str()))
            .collect();
        assert_eq!(names, [("Japanology", "Tea"), ("Dining", "Dining")]);
        assert_eq!(
            digest.progs[0].ep_url,
            "https://www3.nhk.or.jp/nhkworld/en/ondemand/video/100/"
        );
    }

    #[tokio::test]
    async fn no_categories_gives_empty_digest() {
        let catalogue = FakeCatalogue {
            categories: Vec::new(),
            episodes: HashMap::new(),
        };
        let digest = run_scan(&catalogue, &options(), now()).await.unwrap();
        assert!(digest.progs.is_empty());
        assert_eq!(digest.last_updated, "Sat Oct 17 12:00:00 UTC 2026");
    }

    #[tokio::test]
    async fn oversized_window_is_an_error() {
        let mut config = Config::default();
        config.scan.window_hours = 10_000_000_000;
        assert!(ScanOptions::from_config(&config).is_err());

        let catalogue = FakeCatalogue {
            categories: Vec::new(),
            episodes: HashMap::new(),
        };
        let options = ScanOptions {
            window: Duration::try_hours(10_000_000_000).unwrap(),
            ..options()
        };
        assert!(run_scan(&catalogue, &options, now()).await.is_err());
    }

    #[tokio::test]
    async fn any_failure_aborts_the_scan() {
        let catalogue = FakeCatalogue {
            categories: vec![category("1", "Culture"), category("9", "Broken")],
            episodes: HashMap::from([(
                "1".to_string(),
                vec![episode("100", "Japanology", "Tea", "2026-10-18T00:00:00Z")],
            )]),
        };
        assert!(run_scan(&catalogue, &options(), now()).await.is_err());

        let bad_date = FakeCatalogue {
            categories: vec![category("1", "Culture")],
            episodes: HashMap::from([(
                "1".to_string(),
                vec![episode("100", "Japanology", "Tea", "soon")],
            )]),
        };
        assert!(run_scan(&bad_date, &options(), now()).await.is_err());
    }

    #[test]
    fn options_follow_config() {
        let mut config = Config::default();
        config.scan.window_hours = 24;
        config.scan.max_pages = 7;
        let opts = ScanOptions::from_config(&config).unwrap();
        assert_eq!(opts.window, Duration::hours(24));
        assert_eq!(opts.max_pages, 7);

        config.scan.max_pages = 0;
        assert!(ScanOptions::from_config(&config).is_err());

        config.scan.max_pages = 1;
        config.api.site_root = "not a url".to_string();
        assert!(ScanOptions::from_config(&config).is_err());
    }
}
