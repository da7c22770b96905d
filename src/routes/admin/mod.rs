mod handler;

pub use handler::{create_admin, delete_admin, get_admin, list_admins, update_admin};
