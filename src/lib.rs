pub mod auth;
pub mod db;
pub mod error;
pub mod middleware;
pub mod notification;
pub mod push;
pub mod realtime;
pub mod routes;
pub mod routing;
pub mod state;
pub mod storage;
