//! Static entity declarations. Each entity module exposes one `EntityDecl`; nothing is
//! discovered by inspecting types at runtime.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnDefault {
    CurrentDate,
    CurrentTimestamp,
    Literal(&'static str),
}

impl ColumnDefault {
    pub fn sql(&self) -> String {
        match self {
            ColumnDefault::CurrentDate => "CURRENT_DATE".into(),
            ColumnDefault::CurrentTimestamp => "CURRENT_TIMESTAMP".into(),
            ColumnDefault::Literal(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnDecl {
    pub name: &'static str,
    pub declared_type: &'static str,
    pub primary: bool,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<ColumnDefault>,
    /// SQL expression for a read-only derived column.
    pub computed: Option<&'static str>,
    /// Refreshed to CURRENT_TIMESTAMP on every update.
    pub touch_on_update: bool,
    pub doc: Option<&'static str>,
}

impl ColumnDecl {
    pub const fn new(name: &'static str, declared_type: &'static str) -> Self {
        ColumnDecl {
            name,
            declared_type,
            primary: false,
            nullable: false,
            unique: false,
            default: None,
            computed: None,
            touch_on_update: false,
            doc: None,
        }
    }

    pub const fn primary(self) -> Self {
        ColumnDecl { primary: true, ..self }
    }

    pub const fn nullable(self) -> Self {
        ColumnDecl { nullable: true, ..self }
    }

    pub const fn unique(self) -> Self {
        ColumnDecl { unique: true, ..self }
    }

    pub const fn default(self, default: ColumnDefault) -> Self {
        ColumnDecl {
            default: Some(default),
            ..self
        }
    }

    pub const fn computed(self, expression: &'static str) -> Self {
        ColumnDecl {
            computed: Some(expression),
            ..self
        }
    }

    pub const fn touch_on_update(self) -> Self {
        ColumnDecl {
            touch_on_update: true,
            ..self
        }
    }

    pub const fn doc(self, doc: &'static str) -> Self {
        ColumnDecl {
            doc: Some(doc),
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RelationDecl {
    pub name: &'static str,
    /// Entity name of the related declaration.
    pub target: &'static str,
    /// FK column on the target pointing back at us (to-many only).
    pub remote_key: Option<&'static str>,
    pub doc: Option<&'static str>,
}

impl RelationDecl {
    /// Relation resolved through a sibling `<name>_id` column.
    pub const fn to_one(name: &'static str, target: &'static str) -> Self {
        RelationDecl {
            name,
            target,
            remote_key: None,
            doc: None,
        }
    }

    pub const fn to_many(name: &'static str, target: &'static str, remote_key: &'static str) -> Self {
        RelationDecl {
            name,
            target,
            remote_key: Some(remote_key),
            doc: None,
        }
    }

    pub const fn doc(self, doc: &'static str) -> Self {
        RelationDecl {
            doc: Some(doc),
            ..self
        }
    }
}

/// One entity (or abstract base) declaration. Bases contribute their columns and relations
/// after the entity's own, depth first.
#[derive(Debug)]
pub struct EntityDecl {
    pub entity_name: &'static str,
    pub doc: Option<&'static str>,
    pub columns: &'static [ColumnDecl],
    pub relations: &'static [RelationDecl],
    pub bases: &'static [&'static EntityDecl],
}
