use crate::model::{ColumnDecl, ColumnDefault, EntityDecl};

/// Shared base: integer id plus creation/update stamps.
pub static ENTITY: EntityDecl = EntityDecl {
    entity_name: "Entity",
    doc: None,
    columns: &[
        ColumnDecl::new("id", "INTEGER").primary(),
        ColumnDecl::new("utc_created", "DATETIME").default(ColumnDefault::CurrentTimestamp),
        ColumnDecl::new("utc_updated", "DATETIME")
            .default(ColumnDefault::CurrentTimestamp)
            .touch_on_update(),
    ],
    relations: &[],
    bases: &[],
};
