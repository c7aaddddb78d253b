pub use siges_models::levels::{CreateLevelDto, Cycle, Level, UpdateLevelDto};
