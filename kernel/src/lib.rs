pub mod model;
pub mod repository;
pub mod service;
pub mod time;
pub mod validator;
