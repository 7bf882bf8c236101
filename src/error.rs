use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Engine-wide error taxonomy. Every rejection carries a stable reason code
/// that clients render as a message; none of these are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    IllegalAction(String),
    #[error("room is full")]
    RoomFull,
    #[error("room is not accepting players")]
    RoomInGame,
    #[error("wrong room password")]
    BadPassword,
    #[error("at least {0} players are required")]
    NotEnoughPlayers(usize),
    #[error("session has already ended")]
    SessionEnded,
    #[error("room not found")]
    RoomNotFound,
    #[error("game session not found")]
    SessionNotFound,
    #[error("delivery failed: {0}")]
    TransientIo(String),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::IllegalAction(_) => "illegal_action",
            EngineError::RoomFull => "room_full",
            EngineError::RoomInGame => "room_in_game",
            EngineError::BadPassword => "bad_password",
            EngineError::NotEnoughPlayers(_) => "not_enough_players",
            EngineError::SessionEnded => "session_ended",
            EngineError::RoomNotFound => "room_not_found",
            EngineError::SessionNotFound => "session_not_found",
            EngineError::TransientIo(_) => "transient_io",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) | EngineError::IllegalAction(_) => StatusCode::BAD_REQUEST,
            EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EngineError::RoomFull
            | EngineError::RoomInGame
            | EngineError::BadPassword
            | EngineError::NotEnoughPlayers(_)
            | EngineError::SessionEnded => StatusCode::CONFLICT,
            EngineError::RoomNotFound | EngineError::SessionNotFound => StatusCode::NOT_FOUND,
            EngineError::TransientIo(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_family_maps_to_409() {
        assert_eq!(EngineError::RoomFull.status(), StatusCode::CONFLICT);
        assert_eq!(EngineError::SessionEnded.status(), StatusCode::CONFLICT);
        assert_eq!(EngineError::BadPassword.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::IllegalAction("x".into()).code(), "illegal_action");
        assert_eq!(EngineError::NotEnoughPlayers(4).code(), "not_enough_players");
    }
}
