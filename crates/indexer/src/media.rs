use crate::IndexerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extensions accepted by the movie scanner, compared as they appear on disk.
pub const MOVIE_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// Classification of an index: selects the accepted extensions and the
/// index file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaIndexType {
    Movie,
    Tv,
    Picture,
    Music,
}

impl MediaIndexType {
    pub const ALL: [MediaIndexType; 4] = [
        MediaIndexType::Movie,
        MediaIndexType::Tv,
        MediaIndexType::Picture,
        MediaIndexType::Music,
    ];

    /// One-character tag used as the index file name prefix.
    pub const fn tag(self) -> char {
        match self {
            MediaIndexType::Movie => 'm',
            MediaIndexType::Tv => 't',
            MediaIndexType::Picture => 'p',
            MediaIndexType::Music => 'a',
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MediaIndexType::Movie => "movie",
            MediaIndexType::Tv => "tv",
            MediaIndexType::Picture => "picture",
            MediaIndexType::Music => "music",
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Extensions the registered scanner accepts, or `None` when no scanner
    /// exists for this type yet.
    pub const fn accepted_extensions(self) -> Option<&'static [&'static str]> {
        match self {
            MediaIndexType::Movie => Some(MOVIE_EXTENSIONS),
            MediaIndexType::Tv | MediaIndexType::Picture | MediaIndexType::Music => None,
        }
    }
}

impl fmt::Display for MediaIndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaIndexType {
    type Err = IndexerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "m" | "movie" | "movies" => Ok(MediaIndexType::Movie),
            "t" | "tv" => Ok(MediaIndexType::Tv),
            "p" | "picture" | "pictures" => Ok(MediaIndexType::Picture),
            "a" | "music" => Ok(MediaIndexType::Music),
            _ => Err(IndexerError::UnsupportedType(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_tag() {
        for kind in MediaIndexType::ALL {
            assert_eq!(MediaIndexType::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(MediaIndexType::from_tag('x'), None);
    }

    #[test]
    fn parses_names_and_tags() {
        assert_eq!("movies".parse::<MediaIndexType>().unwrap(), MediaIndexType::Movie);
        assert_eq!(" TV ".parse::<MediaIndexType>().unwrap(), MediaIndexType::Tv);
        assert_eq!("a".parse::<MediaIndexType>().unwrap(), MediaIndexType::Music);
        assert!(matches!(
            "podcast".parse::<MediaIndexType>(),
            Err(IndexerError::UnsupportedType(name)) if name == "podcast"
        ));
    }

    #[test]
    fn only_movies_have_a_scanner() {
        assert_eq!(
            MediaIndexType::Movie.accepted_extensions(),
            Some(&["mp4", "webm"][..])
        );
        assert!(MediaIndexType::Tv.accepted_extensions().is_none());
        assert!(MediaIndexType::Picture.accepted_extensions().is_none());
        assert!(MediaIndexType::Music.accepted_extensions().is_none());
    }
}
