//! # Metadata Module
//!
//! Traduce un `EpisodeDetails` (sidecar) nel record normalizzato `Metadata`
//! e lo appiattisce nel set chiave/valore passato a ffmpeg con `-metadata`.
//!
//! ## Regole:
//! - Campi vuoti (stringhe vuote, numeri a 0, liste vuote) non vengono mai scritti
//! - Le liste (generi, registi, attori) diventano stringhe separate da `", "`
//! - Il confronto con i tag esistenti ignora il case delle chiavi

use crate::error::TranslationError;
use crate::nfo::EpisodeDetails;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Normalized metadata record written into the container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub plot: String,
    pub runtime: u32,
    pub show_title: String,
    pub season: u32,
    pub episode: u32,
    pub genres: Vec<String>,
    pub imdb_id: String,
    pub tvdb_id: String,
    pub year: u32,
    pub writer: String,
    pub credits: String,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
}

impl Metadata {
    /// Flatten into the ffmpeg tag set, omitting absent fields.
    pub fn to_tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();

        let mut text = |key: &str, value: &str| {
            if !value.is_empty() {
                tags.insert(key.to_string(), value.to_string());
            }
        };
        text("title", &self.title);
        text("plot", &self.plot);
        text("showtitle", &self.show_title);
        text("genre", &self.genres.join(", "));
        text("imdb_id", &self.imdb_id);
        text("tvdb_id", &self.tvdb_id);
        text("writer", &self.writer);
        text("credits", &self.credits);
        text("director", &self.directors.join(", "));
        text("actor", &self.actors.join(", "));

        for (key, value) in [
            ("runtime", self.runtime),
            ("season", self.season),
            ("episode", self.episode),
            ("year", self.year),
        ] {
            if value != 0 {
                tags.insert(key.to_string(), value.to_string());
            }
        }

        tags
    }
}

/// Translate a parsed sidecar into [`Metadata`].
///
/// Fallisce solo se il record manca del tutto: dati parziali producono
/// semplicemente un record sparso.
pub fn translate(details: Option<&EpisodeDetails>) -> Result<Metadata, TranslationError> {
    let details = details.ok_or(TranslationError)?;

    let metadata = Metadata {
        title: details.title.trim().to_string(),
        plot: details.plot.trim().to_string(),
        runtime: details.runtime,
        show_title: details.show_title.trim().to_string(),
        season: details.season,
        episode: details.episode,
        genres: non_empty(details.genres.iter().map(String::as_str)),
        imdb_id: details.imdb_id.trim().to_string(),
        tvdb_id: details.tvdb_id.trim().to_string(),
        year: details.year,
        writer: details.writer.trim().to_string(),
        credits: details.credits.trim().to_string(),
        directors: non_empty(details.directors.iter().map(String::as_str)),
        actors: non_empty(details.actors.iter().map(|actor| actor.name.as_str())),
    };

    debug!("Translated metadata: {:?}", metadata);
    Ok(metadata)
}

fn non_empty<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if every new tag already has the same value among the existing tags.
///
/// Le chiavi vengono confrontate case-insensitive (i container spesso le
/// salvano in maiuscolo).
pub fn tags_match(existing: &HashMap<String, String>, new_tags: &BTreeMap<String, String>) -> bool {
    let normalized: HashMap<String, &str> = existing
        .iter()
        .map(|(k, v)| (k.to_uppercase(), v.as_str()))
        .collect();

    for (key, value) in new_tags {
        let current = normalized.get(&key.to_uppercase()).copied();
        if current != Some(value.as_str()) {
            info!(
                "Inconsistency found: {} - Old:{} New:{}",
                key,
                current.unwrap_or("<missing>"),
                value
            );
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfo::Actor;

    fn details() -> EpisodeDetails {
        EpisodeDetails {
            title: "The Hidden Hand".to_string(),
            show_title: "Dune: Prophecy".to_string(),
            season: 1,
            episode: 1,
            runtime: 66,
            year: 2024,
            genres: vec!["Action".to_string(), "Drama".to_string()],
            directors: vec!["John Cameron".to_string()],
            actors: vec![
                Actor {
                    name: "Emily Watson".to_string(),
                    ..Default::default()
                },
                Actor {
                    name: "Olivia Williams".to_string(),
                    ..Default::default()
                },
            ],
            imdb_id: "tt10467954".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_translate_absent_record() {
        assert!(translate(None).is_err());
    }

    #[test]
    fn test_translate_and_flatten() {
        let metadata = translate(Some(&details())).unwrap();
        let tags = metadata.to_tags();

        assert_eq!(tags["title"], "The Hidden Hand");
        assert_eq!(tags["showtitle"], "Dune: Prophecy");
        assert_eq!(tags["genre"], "Action, Drama");
        assert_eq!(tags["actor"], "Emily Watson, Olivia Williams");
        assert_eq!(tags["director"], "John Cameron");
        assert_eq!(tags["season"], "1");
        assert_eq!(tags["runtime"], "66");
        assert_eq!(tags["year"], "2024");

        // campi assenti non vengono scritti
        assert!(!tags.contains_key("plot"));
        assert!(!tags.contains_key("tvdb_id"));
        assert!(!tags.contains_key("writer"));
        assert!(tags.values().all(|v| !v.is_empty()));
    }

    #[test]
    fn test_translate_empty_record_is_sparse() {
        let metadata = translate(Some(&EpisodeDetails::default())).unwrap();
        assert!(metadata.to_tags().is_empty());
    }

    #[test]
    fn test_tags_match_is_case_insensitive() {
        let new_tags = translate(Some(&details())).unwrap().to_tags();
        let existing: HashMap<String, String> = new_tags
            .iter()
            .map(|(k, v)| (k.to_uppercase(), v.clone()))
            .chain([("ENCODER".to_string(), "Lavf61.7.100".to_string())])
            .collect();

        assert!(tags_match(&existing, &new_tags));
    }

    #[test]
    fn test_tags_mismatch() {
        let new_tags = translate(Some(&details())).unwrap().to_tags();

        let mut existing: HashMap<String, String> = new_tags.clone().into_iter().collect();
        existing.insert("title".to_string(), "Old Title".to_string());
        assert!(!tags_match(&existing, &new_tags));

        existing.remove("title");
        assert!(!tags_match(&existing, &new_tags));

        assert!(!tags_match(&HashMap::new(), &new_tags));
    }
}
