use serde::{Deserialize, Serialize};

pub mod movie;
pub mod tmdb;
pub mod user;

pub use movie::{Movie, MovieDraft};
pub use tmdb::{PopularMovie, TmdbMovie, TmdbPage};
pub use user::{
    EmailCheckResponse, LoginRequest, LoginResponse, NewUser, PasswordResetRequest, ProfileDto,
    ProfileUpdate, SignupRequest, SocialLoginRequest, User, UserNumResponse,
};

/// Genre reference data, keyed by the TMDB genre id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub genre_id: i32,
    pub genre_name: String,
}

impl Genre {
    pub fn new(genre_id: i32, genre_name: impl Into<String>) -> Self {
        Self {
            genre_id,
            genre_name: genre_name.into(),
        }
    }
}
