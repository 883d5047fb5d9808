pub mod api;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod entry;
pub mod errors;
pub mod handlers;
pub mod meal_list;
pub mod models;
pub mod notices;
pub mod session;
pub mod state;
pub mod stats;
pub mod ui;

#[cfg(test)]
mod testing;

pub use api::{HttpMealApi, MealApi};
pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
