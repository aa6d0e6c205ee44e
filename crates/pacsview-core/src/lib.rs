pub mod clipboard;
pub mod error;
pub mod events;
pub mod model;

pub use clipboard::Clipboard;
pub use error::{CoreError, ErrorCategory, Result};
pub use model::{
    Instance, ItemKind, Patient, Person, Project, ProjectAssociation, Series, Study,
};
