pub use siges_models::classes::{CreateClassDto, SchoolClass, UpdateClassDto};
