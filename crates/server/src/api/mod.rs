mod handlers;
mod routes;
mod tasks;

pub use routes::create_router;
