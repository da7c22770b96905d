mod handler;
mod model;

pub use handler::{delete_alumni, get_alumni, graduate_student, list_alumni, update_alumni};
