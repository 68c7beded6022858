use dvrflow_common::paths::{basename, strip_container_extension};
use dvrflow_common::Recording;
use regex::Regex;
use std::sync::LazyLock;

/// `Season 2.Episode 13`, `Season 2 - Episode 13` and similar.
static SEASON_EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Season\s+(\d+)[\s.\-_]+Episode\s+(\d+)\s*$").expect("valid regex")
});

/// Years before this are treated as missing.
const MIN_COPYRIGHT_YEAR: i64 = 1900;

/// Target file name for the transcoded recording.
///
/// Episodes become `<title>.s<N>e<M>.mkv`, everything else
/// `<basename>[.<year>].mkv`. The result is sanitized and lower-cased.
pub fn derive_output_filename(recording: &Recording) -> String {
    let season_episode = recording
        .episode_disp
        .as_deref()
        .and_then(|disp| SEASON_EPISODE_RE.captures(disp));

    let name = match season_episode {
        Some(caps) => format!("{}.s{}e{}.mkv", recording.title, &caps[1], &caps[2]),
        None => {
            let stem = strip_container_extension(basename(&recording.filename));
            match recording.copyright_year {
                Some(year) if year >= MIN_COPYRIGHT_YEAR => format!("{stem}.{year}.mkv"),
                _ => format!("{stem}.mkv"),
            }
        }
    };

    sanitize_filename(&name)
}

/// Replace every character outside `[A-Za-z0-9_.,-]` with `_` and lower-case.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ',' | '-') {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(filename: &str, episode: Option<&str>, year: Option<i64>) -> Recording {
        Recording {
            uuid: "0123456789abcdef0123".to_string(),
            status: "Completed OK".to_string(),
            filename: filename.to_string(),
            title: "Death in Paradise".to_string(),
            channel_name: "abc1".to_string(),
            episode_disp: episode.map(str::to_string),
            copyright_year: year,
        }
    }

    #[test]
    fn test_episode_naming() {
        let r = recording("/data/x.ts", Some("Season 2.Episode 13"), Some(2015));
        assert_eq!(derive_output_filename(&r), "death_in_paradise.s2e13.mkv");

        let r = recording("/data/x.ts", Some("Season 10 - Episode 1 "), None);
        assert_eq!(derive_output_filename(&r), "death_in_paradise.s10e1.mkv");
    }

    #[test]
    fn test_year_naming() {
        let r = recording("/data/The Third Man.ts", None, Some(1949));
        assert_eq!(derive_output_filename(&r), "the_third_man.1949.mkv");

        let r = recording("/data/The Third Man.ts", Some("Episode 4"), Some(1899));
        assert_eq!(derive_output_filename(&r), "the_third_man.mkv");

        let r = recording("/data/Some Film.mpeg", None, None);
        assert_eq!(derive_output_filename(&r), "some_film.mkv");
    }

    #[test]
    fn test_unknown_extension_kept() {
        let r = recording("/data/clip.avi", None, None);
        assert_eq!(derive_output_filename(&r), "clip.avi.mkv");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_filename("Vera: Blind Spot (2).mkv"), "vera__blind_spot__2_.mkv");
        assert_eq!(sanitize_filename("Café,1-2"), "caf_,1-2");
    }

    #[test]
    fn test_sanitize_idempotent() {
        for name in ["Vera: Blind Spot.mkv", "ÉÎ ½ x/y", "plain.mkv"] {
            let once = sanitize_filename(name);
            assert_eq!(sanitize_filename(&once), once);
            assert!(once
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.,-".contains(c)));
        }
    }
}
