//!
//! src/track_check.rs  Oct 19th, 2026
//!
//! Composite per-track filter. Checks run in a fixed order and the
//! first rejection wins; a disabled check never rejects.
//!

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::cache::RereleaseCache;
use crate::catalog::CatalogClient;
use crate::config::{FilterConfig, GeneralConfig};
use crate::denylist::Denylist;
use crate::errors::ReleaseError;
use crate::persistent::SnapshotStore;
use crate::types::{Album, ArtistRef, Track};

/// Duplicate key: sorted set of credited artist names plus the track name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    artists: Vec<String>,
    name: String
}

impl Fingerprint {
    pub fn of(track: &Track) -> Self {
        let mut artists: Vec<String> = track.artist_names().map(str::to_string).collect();
        artists.sort();
        artists.dedup();
        Self { artists, name: track.name.clone() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackVerdict {
    Accepted,
    NotSeedArtist,
    ExtendedMix,
    Duplicate,
    AlreadyLiked,
    FollowedArtist,
    Rerelease
}

impl TrackVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackVerdict::Accepted       => "accepted",
            TrackVerdict::NotSeedArtist  => "not_seed_artist",
            TrackVerdict::ExtendedMix    => "extended_mix",
            TrackVerdict::Duplicate      => "duplicate",
            TrackVerdict::AlreadyLiked   => "already_liked",
            TrackVerdict::FollowedArtist => "followed_artist",
            TrackVerdict::Rerelease      => "rerelease"
        }
    }
}

/// Per-track inputs that vary with the discovery mode
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackContext<'a> {
    pub seed_artist: Option<&'a ArtistRef>,
    pub siblings: &'a [Album],
    pub require_unfollowed: bool
}

pub struct TrackEligibility {
    today: NaiveDate,
    window_days: u32,
    extended_mixes: Denylist,
    ignore_duplicates: bool,
    ignore_liked: bool,
    ignore_rereleases: bool,
    seen: HashSet<Fingerprint>,
    liked: HashSet<String>,
    followed: HashSet<String>
}

impl TrackEligibility {
    pub fn new(general: &GeneralConfig, filters: &FilterConfig, today: NaiveDate) -> Self {
        Self {
            today,
            window_days: general.days,
            extended_mixes: filters.extended_mixes.clone(),
            ignore_duplicates: filters.ignore_duplicates,
            ignore_liked: filters.ignore_liked,
            ignore_rereleases: filters.ignore_rereleases,
            seen: HashSet::new(),
            liked: HashSet::new(),
            followed: HashSet::new()
        }
    }

    pub fn set_liked(&mut self, ids: impl IntoIterator<Item = String>) {
        self.liked = ids.into_iter().collect();
    }

    pub fn set_followed(&mut self, ids: impl IntoIterator<Item = String>) {
        self.followed = ids.into_iter().collect();
    }

    /// Every check that needs no network access. Registers the track's
    /// fingerprint when it gets past the duplicate check.
    pub fn screen(&mut self, track: &Track, ctx: &TrackContext<'_>) -> TrackVerdict {
        if let Some(seed) = ctx.seed_artist {
            let credited = track.artists.iter()
                .any(|a| a.name == seed.name || (!a.id.is_empty() && a.id == seed.id));
            if !credited {
                return TrackVerdict::NotSeedArtist;
            }
        }

        if self.extended_mixes.matches(&track.name) {
            return TrackVerdict::ExtendedMix;
        }

        if self.ignore_duplicates && !self.seen.insert(Fingerprint::of(track)) {
            return TrackVerdict::Duplicate;
        }

        if self.ignore_liked && self.liked.contains(&track.id) {
            return TrackVerdict::AlreadyLiked;
        }

        if ctx.require_unfollowed && track.artists.iter().any(|a| self.followed.contains(&a.id)) {
            return TrackVerdict::FollowedArtist;
        }

        TrackVerdict::Accepted
    }

    /// `screen` followed by the rerelease lookup over `ctx.siblings`
    pub async fn check<C, S>(
        &mut self,
        client: &C,
        cache: &mut RereleaseCache<S>,
        track: &Track,
        ctx: &TrackContext<'_>
    ) -> Result<TrackVerdict, ReleaseError>
    where
        C: CatalogClient,
        S: SnapshotStore
    {
        let verdict = self.screen(track, ctx);
        if verdict != TrackVerdict::Accepted {
            return Ok(verdict);
        }

        if self.ignore_rereleases && !ctx.siblings.is_empty()
            && cache.is_rerelease(client, track, ctx.siblings, self.today, self.window_days).await? {
            return Ok(TrackVerdict::Rerelease);
        }
        debug!(track = %track.id, name = %track.name, "track.accepted");
        Ok(TrackVerdict::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::Persistent;
    use crate::testing::{album, day, track, FakeCatalog};

    fn today() -> NaiveDate {
        day(2026, 10, 19)
    }

    fn general() -> GeneralConfig {
        GeneralConfig {
            region: "US".into(),
            days: 7,
            album_types: vec!["single".into()],
            playlist_uri_artists: None,
            playlist_uri_labels: None,
            playlist_name: "New releases: {mode}".into(),
            playlist_description: String::new(),
            use_artists_file: false,
            artists_file: "artists.txt".into(),
            labels_file: "labels.txt".into(),
            modes: vec![]
        }
    }

    fn eligibility(filters: FilterConfig) -> TrackEligibility {
        TrackEligibility::new(&general(), &filters, today())
    }

    #[test]
    fn fingerprint_ignores_credit_order() {
        let a = track("t1", "Midnight", &["A", "B"]);
        let b = track("t2", "Midnight", &["B", "A", "A"]);
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&track("t3", "Midnight", &["A"])));
    }

    #[test]
    fn same_track_on_second_album_is_a_duplicate() {
        let mut check = eligibility(FilterConfig::default());
        let ctx = TrackContext::default();

        let from_single = track("t1", "Midnight", &["A", "B"]);
        let from_album = track("t2", "Midnight", &["B", "A"]);

        assert_eq!(check.screen(&from_single, &ctx), TrackVerdict::Accepted);
        assert_eq!(check.screen(&from_album, &ctx), TrackVerdict::Duplicate);
        assert_eq!(check.screen(&from_album, &ctx), TrackVerdict::Duplicate);
    }

    #[test]
    fn disabled_checks_never_reject() {
        let mut check = eligibility(FilterConfig {
            ignore_duplicates: false,
            ignore_liked: false,
            ..FilterConfig::default()
        });
        check.set_liked(["t1".to_string()]);
        let ctx = TrackContext::default();
        let liked = track("t1", "Midnight", &["A"]);

        assert_eq!(check.screen(&liked, &ctx), TrackVerdict::Accepted);
        assert_eq!(check.screen(&liked, &ctx), TrackVerdict::Accepted);
    }

    #[test]
    fn seed_artist_must_be_credited() {
        let mut check = eligibility(FilterConfig::default());
        let seed = ArtistRef::new("id-A", "A");
        let by_id_only = ArtistRef::new("id-A", "id-A");

        let feature = track("t1", "Guest Spot", &["C", "A"]);
        let unrelated = track("t2", "Other", &["C"]);

        let ctx = TrackContext { seed_artist: Some(&seed), ..TrackContext::default() };
        assert_eq!(check.screen(&feature, &ctx), TrackVerdict::Accepted);
        assert_eq!(check.screen(&unrelated, &ctx), TrackVerdict::NotSeedArtist);

        // seeds loaded from a file only know the id
        let ctx = TrackContext { seed_artist: Some(&by_id_only), ..TrackContext::default() };
        assert_eq!(check.screen(&track("t3", "Solo", &["A"]), &ctx), TrackVerdict::Accepted);
    }

    #[test]
    fn liked_extended_and_followed_are_rejected() {
        let mut check = eligibility(FilterConfig {
            extended_mixes: Denylist::new(true, vec!["Extended Mix".into()]),
            ..FilterConfig::default()
        });
        check.set_liked(["liked".to_string()]);
        check.set_followed(["id-F".to_string()]);

        let plain = TrackContext::default();
        let label = TrackContext { require_unfollowed: true, ..TrackContext::default() };

        assert_eq!(check.screen(&track("x1", "Sun (Extended Mix)", &["A"]), &plain),
            TrackVerdict::ExtendedMix);
        assert_eq!(check.screen(&track("liked", "Moon", &["A"]), &plain),
            TrackVerdict::AlreadyLiked);
        assert_eq!(check.screen(&track("x2", "Stars", &["F", "G"]), &label),
            TrackVerdict::FollowedArtist);
        assert_eq!(check.screen(&track("x3", "Comets", &["F"]), &plain),
            TrackVerdict::Accepted);
    }

    #[tokio::test]
    async fn track_seen_on_old_sibling_is_a_rerelease() -> Result<(), ReleaseError> {
        let mut catalog = FakeCatalog::new();
        let old = album("old", "Anthology", today() - chrono::Duration::days(400));
        catalog.add_album(old.clone(), &["US"], "L", vec![track("t0", "Midnight", &["A"])]);
        let siblings = vec![album("new", "Midnight", today()), old];

        let mut cache = RereleaseCache::new(Persistent::open_in_memory().await?);
        let mut check = eligibility(FilterConfig::default());
        let ctx = TrackContext { siblings: &siblings, ..TrackContext::default() };

        let verdict = check.check(&catalog, &mut cache, &track("t1", "Midnight", &["A"]), &ctx)
            .await?;
        assert_eq!(verdict, TrackVerdict::Rerelease);

        let verdict = check.check(&catalog, &mut cache, &track("t2", "Dawn", &["A"]), &ctx)
            .await?;
        assert_eq!(verdict, TrackVerdict::Accepted);
        cache.close().await
    }

    #[tokio::test]
    async fn rerelease_check_can_be_switched_off() -> Result<(), ReleaseError> {
        let catalog = FakeCatalog::new();
        let mut old = album("old", "Anthology", day(2024, 1, 1));
        old.tracks = Some(crate::types::WirePage {
            items: vec![track("t0", "Midnight", &["A"])],
            next: None
        });
        let siblings = vec![old];

        let mut cache = RereleaseCache::new(Persistent::open_in_memory().await?);
        let mut check = eligibility(FilterConfig {
            ignore_rereleases: false,
            ..FilterConfig::default()
        });
        let ctx = TrackContext { siblings: &siblings, ..TrackContext::default() };

        let verdict = check.check(&catalog, &mut cache, &track("t1", "Midnight", &["A"]), &ctx)
            .await?;
        assert_eq!(verdict, TrackVerdict::Accepted);
        cache.close().await
    }
}
