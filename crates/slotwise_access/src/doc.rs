// File: crates/slotwise_access/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::gate::NewUser;
use crate::handlers::{
    CreateUserRequest, FlagsResponse, SetFlagRequest, SuccessResponse, UpdateRoleRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::create_user_handler,
        crate::handlers::update_user_role_handler,
        crate::handlers::deactivate_user_handler,
        crate::handlers::get_feature_flags_handler,
        crate::handlers::set_feature_flag_handler
    ),
    components(
        schemas(
            NewUser,
            CreateUserRequest,
            UpdateRoleRequest,
            SuccessResponse,
            SetFlagRequest,
            FlagsResponse
        )
    ),
    tags(
        (name = "Users", description = "User management"),
        (name = "Admin", description = "Tenant feature flags")
    ),
    servers(
        (url = "/api", description = "Slotwise API server")
    )
)]
pub struct AccessApiDoc;
