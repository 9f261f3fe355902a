pub mod event;
pub mod level;
pub mod machine;
pub mod session;
