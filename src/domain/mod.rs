// Domain layer: core models, recipe rules and ports (interfaces).

pub mod categories;
pub mod model;
pub mod ports;
pub mod recipe;
