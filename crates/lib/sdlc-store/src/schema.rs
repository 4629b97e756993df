pub const TABLE_PROJECTS: &str = "projects";
pub const TABLE_PROJECT_SCREENS: &str = "project_screens";
pub const TABLE_PROJECT_FILES: &str = "project_files";

pub const COL_ID: &str = "id";
pub const COL_NAME: &str = "name";
pub const COL_STATUS: &str = "status";
pub const COL_CREATED_AT: &str = "created_at";
pub const COL_UPDATED_AT: &str = "updated_at";
pub const COL_PROJECT_ID: &str = "project_id";
pub const COL_DISPLAY_ORDER: &str = "display_order";
pub const COL_TECH_PREFERENCES: &str = "tech_preferences";
pub const COL_TECH_PREFERENCES_SAVED_AT: &str = "tech_preferences_saved_at";
pub const COL_PROTOTYPE_CONTENT: &str = "prototype_content";

/// Screen columns shown in the screen inventory.
pub const SCREEN_INVENTORY_COLUMNS: &str = "id,name,description,screen_type,epic_name,\
complexity,user_role,notes,display_order,prototype_generated_at";

/// Screen columns sent to the estimation model.
pub const SCREEN_CONTEXT_COLUMNS: &str =
    "id,name,description,screen_type,epic_name,complexity,user_role,notes";

pub const FILE_LISTING_COLUMNS: &str = "id,original_filename";

/// Builds a comma separated select list from fixed columns followed by extra columns.
pub fn select_columns<'a>(
    fixed: &[&'a str],
    extra: impl IntoIterator<Item = &'a str>,
) -> String {
    fixed
        .iter()
        .copied()
        .chain(extra)
        .collect::<Vec<_>>()
        .join(",")
}
