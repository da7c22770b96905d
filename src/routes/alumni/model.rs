use serde::Deserialize;

use crate::models::Graduation;

#[derive(Debug, Deserialize)]
pub struct GraduateStudentRequest {
    pub student_id: i64,
    #[serde(flatten)]
    pub graduation: Graduation,
}
