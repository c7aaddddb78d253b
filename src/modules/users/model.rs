pub use siges_models::users::{
    CreateUserDto, RegisterUserDto, ReplaceUserDto, Role, UpdateUserDto, User,
};
