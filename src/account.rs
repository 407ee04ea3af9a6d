pub mod broadcast;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod selection;
pub mod view;
