pub mod game_service;
pub mod room_service;
pub mod scheduler;
pub mod settlement;
