pub mod guard;
pub mod identity;
pub mod middleware;
