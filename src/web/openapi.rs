//! OpenAPI document for the web API.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::*;
use super::handlers::{activity, auth, bulk, execute, file, folder, recycle, search, share, star, storage};

/// Registers the `bearer_auth` JWT scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
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
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "driveshelf", description = "Personal file drive API"),
    servers((url = "/api")),
    paths(
        auth::register,
        auth::login,
        auth::me,
        auth::change_password,
        folder::create_folder,
        folder::get_folder,
        folder::list_children,
        folder::rename_folder,
        folder::move_folder,
        folder::delete_folder,
        file::upload_file,
        file::get_file,
        file::download_file,
        file::rename_file,
        file::move_file,
        file::delete_file,
        execute::run_file,
        bulk::bulk_delete,
        bulk::bulk_move,
        recycle::list_recycle_bin,
        recycle::restore,
        recycle::permanent_delete,
        recycle::empty_recycle_bin,
        share::create_share,
        share::share_details,
        share::update_share,
        share::delete_share,
        share::resolve_token,
        share::shared_with_me,
        activity::list_activity,
        activity::export_activity,
        activity::security_highlights,
        storage::storage_summary,
        storage::folder_breakdown,
        search::search_items,
        star::list_starred,
        star::star,
        star::unstar,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        ChangePasswordRequest,
        CreateFolderRequest,
        RenameRequest,
        MoveFolderRequest,
        BulkDeleteRequest,
        BulkMoveRequest,
        FileIdsRequest,
        CreateShareRequest,
        UpdateShareRequest,
        TargetRequest,
        RunRequest,
        CountResponse,
        UserResponse,
        LoginResponse,
        FolderResponse,
        FileResponse,
        FolderDetailResponse,
        FolderListingResponse,
        DeleteSummaryResponse,
        FileDeleteResponse,
        DeletedFileResponse,
        RestoreResponse,
        ShareUserResponse,
        ShareResponse,
        ResolvedShareResponse,
        SharedItemResponse,
        ActivityLogResponse,
        ActivityListResponse,
        ItemsResponse,
        StarResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "folders", description = "Folder hierarchy"),
        (name = "files", description = "File upload and download"),
        (name = "bulk", description = "Multi-item operations"),
        (name = "recycle", description = "Recycle bin"),
        (name = "shares", description = "Sharing"),
        (name = "activity", description = "Activity log"),
        (name = "storage", description = "Storage accounting"),
        (name = "search", description = "Name search"),
        (name = "stars", description = "Starred items"),
        (name = "execute", description = "Code execution")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/folders/{id}/children"));
        assert!(doc.paths.paths.contains_key("/shares/token/{token}"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("ShareResponse"));
    }
}
