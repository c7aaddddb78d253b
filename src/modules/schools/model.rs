pub use siges_models::schools::{CreateSchoolDto, School, UpdateSchoolDto};
