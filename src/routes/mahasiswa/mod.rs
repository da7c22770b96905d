mod handler;

pub use handler::{create_student, delete_student, get_student, list_students, update_student};
