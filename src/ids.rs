//!
//! src/ids.rs  Oct 19th, 2026
//!
//! Converts catalog ids, URIs and open.spotify.com URLs into bare ids,
//! and reads the seed list files.
//!

use std::path::Path;

use url::Url;

use crate::errors::ReleaseError;
use crate::types::ArtistRef;

const ID_LEN: usize = 22;

fn is_bare_id(value: &str) -> bool {
    value.len() == ID_LEN && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Accepts `<id>`, `spotify:<kind>:<id>` or `https://open.spotify.com/<kind>/<id>?...`
pub fn to_id(value: &str, kind: &str) -> Result<String, ReleaseError> {
    let value = value.trim();
    if is_bare_id(value) {
        return Ok(value.to_string());
    }

    if let Some(rest) = value.strip_prefix("spotify:") {
        if let Some((found, id)) = rest.split_once(':') {
            if found == kind && is_bare_id(id) {
                return Ok(id.to_string());
            }
        }
    }

    if let Ok(url) = Url::parse(value) {
        if url.host_str() == Some("open.spotify.com") {
            let segments: Vec<&str> = url.path_segments()
                .map(|s| s.filter(|p| !p.is_empty()).collect())
                .unwrap_or_default();
            if let [found, id] = segments.as_slice() {
                if *found == kind && is_bare_id(id) {
                    return Ok(id.to_string());
                }
            }
        }
    }

    Err(ReleaseError::Parse(format!("not a {kind} id, uri or url: {value}")))
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{track_id}")
}

fn seed_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

/// Artist seeds from a file of ids/URIs/URLs. The name is unknown at
/// this point, so the id stands in for it.
pub fn load_artist_seeds(path: &Path) -> Result<Vec<ArtistRef>, ReleaseError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReleaseError::Config(format!("artists file {}: {e}", path.display())))?;
    seed_lines(&text)
        .map(|line| to_id(line, "artist").map(|id| ArtistRef::new(id.clone(), id)))
        .collect()
}

/// Label names, one per line, used verbatim as search terms
pub fn load_label_seeds(path: &Path) -> Result<Vec<String>, ReleaseError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReleaseError::Config(format!("labels file {}: {e}", path.display())))?;
    Ok(seed_lines(&text).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "4Z8W4fKeB5YxbusRsdQVPb";

    #[test]
    fn accepts_ids_uris_and_urls() -> Result<(), ReleaseError> {
        assert_eq!(to_id(ID, "artist")?, ID);
        assert_eq!(to_id(&format!("spotify:artist:{ID}"), "artist")?, ID);
        assert_eq!(to_id(&format!("https://open.spotify.com/artist/{ID}?si=abc"), "artist")?, ID);
        assert_eq!(to_id(&format!("spotify:playlist:{ID}"), "playlist")?, ID);
        Ok(())
    }

    #[test]
    fn rejects_wrong_kind_and_names() {
        assert!(to_id(&format!("spotify:album:{ID}"), "artist").is_err());
        assert!(to_id(&format!("https://open.spotify.com/track/{ID}"), "artist").is_err());
        assert!(to_id("Radiohead", "artist").is_err());
    }

    #[test]
    fn seed_files_skip_blanks_and_comments() -> Result<(), ReleaseError> {
        let dir = tempfile::tempdir()?;
        let artists = dir.path().join("artists.txt");
        let labels = dir.path().join("labels.txt");
        std::fs::write(&artists, format!("# favourites\n{ID}\n\nspotify:artist:{ID}\n"))?;
        std::fs::write(&labels, "Warp Records\n  \nNinja Tune\n")?;

        let seeds = load_artist_seeds(&artists)?;
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0], ArtistRef::new(ID, ID));
        assert_eq!(load_label_seeds(&labels)?, vec!["Warp Records", "Ninja Tune"]);

        assert!(matches!(load_label_seeds(&dir.path().join("none.txt")),
            Err(ReleaseError::Config(_))));
        Ok(())
    }
}
