pub mod unit_loader;

pub use unit_loader::{write_units, UnitTemplateLoader};
