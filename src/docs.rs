use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use siges_models::{
    AccessToken, ClassId, CreateClassDto, CreateLevelDto, CreateSchoolDto, CreateStudentDto,
    CreateUserDto, Cycle, Gender, Level, LevelId, RegisterUserDto, ReplaceUserDto, Role, School,
    SchoolClass, SchoolId, Student, StudentId, StudentStatus, TokenObtainRequest, TokenPair,
    TokenRefreshRequest, UpdateClassDto, UpdateLevelDto, UpdateSchoolDto, UpdateStudentDto,
    UpdateUserDto, User, UserId,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::obtain_token_pair,
        crate::modules::auth::controller::refresh_access_token,
        crate::modules::users::controller::register_user,
        crate::modules::users::controller::get_current_user,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::replace_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::schools::controller::list_schools,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::get_school,
        crate::modules::schools::controller::replace_school,
        crate::modules::schools::controller::update_school,
        crate::modules::schools::controller::delete_school,
        crate::modules::levels::controller::list_levels,
        crate::modules::levels::controller::create_level,
        crate::modules::levels::controller::get_level,
        crate::modules::levels::controller::replace_level,
        crate::modules::levels::controller::update_level,
        crate::modules::levels::controller::delete_level,
        crate::modules::levels::controller::list_school_levels,
        crate::modules::levels::controller::create_school_level,
        crate::modules::classes::controller::list_classes,
        crate::modules::classes::controller::create_class,
        crate::modules::classes::controller::get_class,
        crate::modules::classes::controller::replace_class,
        crate::modules::classes::controller::update_class,
        crate::modules::classes::controller::delete_class,
        crate::modules::classes::controller::list_level_classes,
        crate::modules::classes::controller::create_level_class,
        crate::modules::students::controller::list_students,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::replace_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
    ),
    components(
        schemas(
            TokenObtainRequest,
            TokenPair,
            TokenRefreshRequest,
            AccessToken,
            User,
            Role,
            UserId,
            RegisterUserDto,
            CreateUserDto,
            ReplaceUserDto,
            UpdateUserDto,
            School,
            SchoolId,
            CreateSchoolDto,
            UpdateSchoolDto,
            Level,
            LevelId,
            Cycle,
            CreateLevelDto,
            UpdateLevelDto,
            SchoolClass,
            ClassId,
            CreateClassDto,
            UpdateClassDto,
            Student,
            StudentId,
            Gender,
            StudentStatus,
            CreateStudentDto,
            UpdateStudentDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Token issuance and refresh"),
        (name = "Users", description = "Registration and account management"),
        (name = "Schools", description = "Schools, the root of every tenant"),
        (name = "Levels", description = "Grade levels within a school"),
        (name = "Classes", description = "Classes within a level"),
        (name = "Students", description = "Enrolled students and their parents")
    ),
    info(
        title = "SIGES API",
        version = "0.1.0",
        description = "School management REST API with row-level access control for directors, parents and super-admins.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/token/",
            "/api/users/register/",
            "/api/schools/{id}/",
            "/api/schools/{id}/levels/",
            "/api/levels/{id}/classes/",
            "/api/students/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
