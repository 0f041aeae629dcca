mod app;
mod render;
mod state;
mod table;

pub use app::App;
pub use table::GridTable;
