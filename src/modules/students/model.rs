pub use siges_models::students::{
    CreateStudentDto, Gender, Student, StudentFilter, StudentFilterParams, StudentStatus,
    UpdateStudentDto,
};
