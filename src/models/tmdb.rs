use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// TMDB API Types
// ============================================================================

/// TMDB sends `null` for some fields it documents as always present
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of a paginated TMDB listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct TmdbPage<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<T>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_results: u32,
}

impl<T> TmdbPage<T> {
    pub fn new(page: u32, total_pages: u32, results: Vec<T>) -> Self {
        let total_results = results.len() as u32;
        Self {
            page,
            results,
            total_pages,
            total_results,
        }
    }
}

/// Movie entry as returned by the listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_title: String,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_count: i64,
    /// TMDB sends an empty string for unknown dates
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre_ids: Vec<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub adult: bool,
}

impl TmdbMovie {
    pub fn parsed_release_date(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

/// Popular-listing entry annotated with whether the catalog already holds it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PopularMovie {
    #[serde(flatten)]
    pub movie: TmdbMovie,
    pub exists_in_db: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [
                {
                    "id": 533535,
                    "title": "데드풀과 울버린",
                    "original_title": "Deadpool & Wolverine",
                    "overview": "...",
                    "poster_path": "/8cdWjvZQUExUUTzyp4t6EDMubfO.jpg",
                    "backdrop_path": null,
                    "popularity": 4828.8,
                    "vote_average": 7.7,
                    "vote_count": 2514,
                    "release_date": "2024-07-24",
                    "genre_ids": [28, 35, 878],
                    "adult": false,
                    "video": false
                }
            ],
            "total_pages": 3,
            "total_results": 58,
            "dates": {"maximum": "2024-08-14", "minimum": "2024-07-03"}
        }"#;

        let page: TmdbPage<TmdbMovie> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.results.len(), 1);

        let movie = &page.results[0];
        assert_eq!(movie.id, 533535);
        assert_eq!(movie.genre_ids, vec![28, 35, 878]);
        assert_eq!(movie.parsed_release_date(), NaiveDate::from_ymd_opt(2024, 7, 24));
    }

    #[test]
    fn test_missing_results_is_empty_page() {
        let page: TmdbPage<TmdbMovie> = serde_json::from_str(r#"{"page": 9}"#).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_null_fields_decode_as_defaults() {
        let json = r#"{
            "page": 2,
            "total_pages": 4,
            "results": [
                {
                    "id": 1,
                    "title": null,
                    "original_title": null,
                    "overview": null,
                    "poster_path": null,
                    "popularity": null,
                    "vote_count": null,
                    "genre_ids": null,
                    "adult": null
                },
                {"id": 2, "title": "Kept", "overview": "Plot"}
            ]
        }"#;

        let page: TmdbPage<TmdbMovie> = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 2);

        let movie = &page.results[0];
        assert_eq!(movie.title, "");
        assert_eq!(movie.overview, "");
        assert_eq!(movie.popularity, 0.0);
        assert!(movie.genre_ids.is_empty());
        assert!(!movie.adult);
        assert_eq!(page.results[1].title, "Kept");
    }

    #[test]
    fn test_null_results_is_empty_page() {
        let page: TmdbPage<TmdbMovie> =
            serde_json::from_str(r#"{"page": 1, "results": null, "total_pages": null}"#).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_empty_release_date() {
        let movie: TmdbMovie =
            serde_json::from_str(r#"{"id": 1, "title": "x", "release_date": ""}"#).unwrap();
        assert_eq!(movie.parsed_release_date(), None);
    }

    #[test]
    fn test_popular_movie_flattens_flag() {
        let movie: TmdbMovie = serde_json::from_str(r#"{"id": 42, "title": "x"}"#).unwrap();
        let json = serde_json::to_value(PopularMovie {
            movie,
            exists_in_db: true,
        })
        .unwrap();

        assert_eq!(json["id"], 42);
        assert_eq!(json["exists_in_db"], true);
    }
}
