mod handler;
mod model;

pub use handler::{
    login_admin, login_alumni, login_student, profile, register_alumni, register_student,
};
